use axum::Json;

use vidhub_types::api::Joke;

const JOKES: [&str; 5] = [
    "Why don't scientists trust atoms? Because they make up everything!",
    "Why did the scarecrow win an award? Because he was outstanding in his field!",
    "Why don’t skeletons fight each other? They don’t have the guts.",
    "What do you call fake spaghetti? An impasta!",
    "Why couldn’t the bicycle stand up by itself? It was two tired.",
];

/// Served as a bare array; the joke client predates the envelope.
pub async fn list_jokes() -> Json<Vec<Joke>> {
    let jokes = JOKES
        .iter()
        .zip(1..)
        .map(|(joke, id)| Joke {
            id,
            joke: (*joke).to_string(),
        })
        .collect();
    Json(jokes)
}
