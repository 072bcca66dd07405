use axum::{Extension, extract::State};
use uuid::Uuid;

use vidhub_types::api::{Claims, ContentRequest};
use vidhub_types::models::Tweet;

use crate::convert;
use crate::error::{ApiError, required};
use crate::extract::{ApiJson, ApiPath};
use crate::response::ApiResponse;
use crate::state::{AppState, with_db};

pub async fn create_tweet(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<ContentRequest>,
) -> Result<ApiResponse<Tweet>, ApiError> {
    let content = required(&req.content, "Content is a required field")?.to_string();
    let tweet_id = Uuid::new_v4().to_string();
    let owner_id = claims.sub.to_string();

    let row = with_db(&state, move |db| db.insert_tweet(&tweet_id, &owner_id, &content))
        .await?
        .ok_or_else(|| ApiError::Internal("tweet missing after insert".into()))?;
    Ok(ApiResponse::created(convert::tweet(row), "Tweet created successfully"))
}

pub async fn get_tweet(
    State(state): State<AppState>,
    ApiPath(tweet_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Tweet>, ApiError> {
    let tweet_id = tweet_id.to_string();
    let row = with_db(&state, move |db| db.get_tweet(&tweet_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Tweet"))?;
    Ok(ApiResponse::ok(convert::tweet(row), "Tweet retrieved"))
}
