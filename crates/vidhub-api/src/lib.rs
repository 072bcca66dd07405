pub mod auth;
pub mod comments;
pub mod convert;
pub mod error;
pub mod extract;
pub mod jokes;
pub mod likes;
pub mod middleware;
pub mod playlists;
pub mod response;
pub mod state;
pub mod tweets;
pub mod users;
pub mod videos;

use std::any::Any;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::error::ApiError;
use crate::middleware::require_auth;
use crate::state::AppState;

const JSON_BODY_LIMIT: usize = 20 * 1024;

/// The full HTTP surface. The server binary adds CORS and request tracing
/// on top; tests drive this router directly.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/users/register", post(auth::register))
        .route("/users/login", post(auth::login))
        .route("/users/refresh-token", post(auth::refresh_token));

    let protected = Router::new()
        .route("/users/logout", post(auth::logout))
        .route("/users/change-password", post(auth::change_password))
        .route("/users/current-user", get(users::current_user))
        .route("/users/account", patch(users::update_account))
        .route("/users/avatar", patch(users::update_avatar))
        .route("/users/cover-image", patch(users::update_cover_image))
        .route("/users/channel/{username}", get(users::channel_profile))
        .route("/users/history", get(users::watch_history))
        .route("/videos", post(videos::publish_video).get(videos::list_videos))
        .route("/videos/{video_id}", get(videos::get_video).patch(videos::update_video))
        .route("/videos/{video_id}/publish", patch(videos::set_publish_status))
        .route(
            "/comments/video/{video_id}",
            post(comments::add_comment).get(comments::list_comments),
        )
        .route(
            "/comments/{comment_id}",
            patch(comments::edit_comment).delete(comments::delete_comment),
        )
        .route("/tweets", post(tweets::create_tweet))
        .route("/tweets/{tweet_id}", get(tweets::get_tweet))
        .route("/reactions/{kind}/{target_id}", post(likes::toggle_like).get(likes::get_likes))
        .route("/playlists", post(playlists::create_playlist))
        .route("/playlists/user/{user_id}", get(playlists::user_playlists))
        .route(
            "/playlists/{playlist_id}",
            get(playlists::get_playlist)
                .patch(playlists::update_playlist)
                .delete(playlists::delete_playlist),
        )
        .route(
            "/playlists/{playlist_id}/videos/{video_id}",
            post(playlists::add_video).delete(playlists::remove_video),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/api/v1", public.merge(protected))
        .route("/api/jokes", get(jokes::list_jokes))
        .fallback(route_not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}
