use axum::{Extension, extract::State};

use vidhub_db::AccountUpdate;
use vidhub_types::api::{Claims, UpdateAccountRequest, UpdateImageRequest};
use vidhub_types::models::{ChannelProfile, User, VideoListing};

use crate::convert;
use crate::error::{ApiError, required};
use crate::extract::{ApiJson, ApiPath};
use crate::response::ApiResponse;
use crate::state::{AppState, with_db};

pub async fn current_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<ApiResponse<User>, ApiError> {
    let id = claims.sub.to_string();
    let user = with_db(&state, move |db| db.get_user_by_id(&id))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid access token".into()))?;
    Ok(ApiResponse::ok(convert::user(user), "Current user fetched successfully"))
}

pub async fn update_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateAccountRequest>,
) -> Result<ApiResponse<User>, ApiError> {
    let full_name = req
        .full_name
        .as_deref()
        .map(|s| required(s, "Full name cannot be empty").map(str::to_string))
        .transpose()?;
    let email = req
        .email
        .as_deref()
        .map(|s| required(s, "Email cannot be empty").map(str::to_lowercase))
        .transpose()?;

    if full_name.is_none() && email.is_none() {
        return Err(ApiError::Validation("Nothing to update".into()));
    }
    if email.as_deref().is_some_and(|e| !e.contains('@')) {
        return Err(ApiError::Validation("Enter a valid email address".into()));
    }

    let id = claims.sub.to_string();
    let outcome = with_db(&state, move |db| {
        db.update_account(&id, full_name.as_deref(), email.as_deref())
    })
    .await?;

    let updated = match outcome {
        AccountUpdate::UserMissing => {
            return Err(ApiError::Unauthorized("Invalid access token".into()));
        }
        AccountUpdate::EmailTaken => {
            return Err(ApiError::AlreadyExists("Email is already in use".into()));
        }
        AccountUpdate::Updated(row) => row,
    };

    Ok(ApiResponse::ok(convert::user(updated), "Account details updated successfully"))
}

pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateImageRequest>,
) -> Result<ApiResponse<User>, ApiError> {
    let url = required(&req.url, "Avatar is required")?.to_string();
    let id = claims.sub.to_string();
    let user = with_db(&state, move |db| db.update_avatar(&id, &url))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid access token".into()))?;
    Ok(ApiResponse::ok(convert::user(user), "Avatar changed successfully"))
}

pub async fn update_cover_image(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateImageRequest>,
) -> Result<ApiResponse<User>, ApiError> {
    let url = required(&req.url, "Cover image is required")?.to_string();
    let id = claims.sub.to_string();
    let user = with_db(&state, move |db| db.update_cover_image(&id, &url))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid access token".into()))?;
    Ok(ApiResponse::ok(convert::user(user), "Cover image changed successfully"))
}

pub async fn channel_profile(
    State(state): State<AppState>,
    ApiPath(username): ApiPath<String>,
) -> Result<ApiResponse<ChannelProfile>, ApiError> {
    let username = required(&username, "Username is missing")?.to_lowercase();
    let channel = with_db(&state, move |db| db.get_channel(&username))
        .await?
        .ok_or_else(|| ApiError::not_found("Channel"))?;
    Ok(ApiResponse::ok(convert::channel(channel), "User channel fetched successfully"))
}

pub async fn watch_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<ApiResponse<Vec<VideoListing>>, ApiError> {
    let id = claims.sub.to_string();
    let rows = with_db(&state, move |db| db.get_watch_history(&id)).await?;
    let history = rows.into_iter().map(convert::video_listing).collect();
    Ok(ApiResponse::ok(history, "Watch history fetched successfully"))
}
