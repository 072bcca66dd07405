use axum::{Extension, extract::State};
use uuid::Uuid;

use vidhub_db::OwnedMutation;
use vidhub_types::api::{Claims, ContentRequest};
use vidhub_types::models::{Comment, CommentView};

use crate::convert;
use crate::error::{ApiError, required};
use crate::extract::{ApiJson, ApiPath};
use crate::response::{ApiResponse, Empty};
use crate::state::{AppState, with_db};

const CONTENT_REQUIRED: &str = "Content is a required field";

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(video_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<ContentRequest>,
) -> Result<ApiResponse<Comment>, ApiError> {
    let content = required(&req.content, CONTENT_REQUIRED)?.to_string();

    let comment_id = Uuid::new_v4().to_string();
    let video_id = video_id.to_string();
    let owner_id = claims.sub.to_string();
    let row = with_db(&state, move |db| {
        db.insert_comment(&comment_id, &video_id, &owner_id, &content)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Video"))?;

    Ok(ApiResponse::ok(convert::comment(row), "Comment uploaded successfully"))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(video_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Vec<CommentView>>, ApiError> {
    let video_id = video_id.to_string();
    let viewer_id = claims.sub.to_string();
    let rows = with_db(&state, move |db| {
        if db.get_visible_video(&video_id, &viewer_id)?.is_none() {
            return Ok(None);
        }
        db.list_comments_for_video(&video_id).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Video"))?;

    let comments = rows.into_iter().map(convert::comment_view).collect();
    Ok(ApiResponse::ok(comments, "Comments successfully retrieved"))
}

pub async fn edit_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(comment_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<ContentRequest>,
) -> Result<ApiResponse<Comment>, ApiError> {
    let content = required(&req.content, CONTENT_REQUIRED)?.to_string();

    let comment_id = comment_id.to_string();
    let actor = claims.sub.to_string();
    let outcome = with_db(&state, move |db| db.update_comment(&comment_id, &actor, &content)).await?;

    match outcome {
        OwnedMutation::Missing => Err(ApiError::not_found("Comment")),
        OwnedMutation::NotOwner => Err(not_comment_owner()),
        OwnedMutation::Done(row) => Ok(ApiResponse::ok(convert::comment(row), "Successfully updated comment")),
    }
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(comment_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Empty>, ApiError> {
    let comment_id = comment_id.to_string();
    let actor = claims.sub.to_string();
    let outcome = with_db(&state, move |db| db.delete_comment(&comment_id, &actor)).await?;

    match outcome {
        OwnedMutation::Missing => Err(ApiError::not_found("Comment")),
        OwnedMutation::NotOwner => Err(not_comment_owner()),
        OwnedMutation::Done(()) => Ok(ApiResponse::ok(Empty {}, "Comment has been deleted successfully")),
    }
}

fn not_comment_owner() -> ApiError {
    ApiError::Unauthorized("The comment is not created by the user".into())
}
