use axum::{Extension, extract::State};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use vidhub_db::ToggleOutcome;
use vidhub_types::api::{Claims, LikesResponse};
use vidhub_types::models::TargetKind;

use crate::convert;
use crate::error::ApiError;
use crate::extract::ApiPath;
use crate::response::ApiResponse;
use crate::state::{AppState, with_db};

/// Likes the target if the caller has not yet, unlikes it otherwise.
/// Data is the new like on add and `{}` on remove.
pub async fn toggle_like(
    State(state): State<AppState>,
    ApiPath((kind, target_id)): ApiPath<(TargetKind, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<ApiResponse<Value>, ApiError> {
    let like_id = Uuid::new_v4().to_string();
    let target = target_id.to_string();
    let user_id = claims.sub.to_string();

    let outcome = with_db(&state, move |db| db.toggle_like(&like_id, kind, &target, &user_id)).await?;

    match outcome {
        ToggleOutcome::TargetMissing => Err(ApiError::not_found(kind.label())),
        ToggleOutcome::Added(row) => {
            debug!("{} liked {} {}", claims.username, kind, target_id);
            let like = serde_json::to_value(convert::like(row))
                .map_err(|e| ApiError::Internal(format!("like serialization failed: {e}")))?;
            Ok(ApiResponse::ok(
                like,
                format!("{} liked successfully, like toggled", kind.label()),
            ))
        }
        ToggleOutcome::Removed => {
            debug!("{} unliked {} {}", claims.username, kind, target_id);
            Ok(ApiResponse::ok(
                Value::Object(Default::default()),
                format!("{} unliked successfully, like toggled", kind.label()),
            ))
        }
    }
}

/// Lists the likes on a target. A target with no likes reports zero.
pub async fn get_likes(
    State(state): State<AppState>,
    ApiPath((kind, target_id)): ApiPath<(TargetKind, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<ApiResponse<LikesResponse>, ApiError> {
    let target = target_id.to_string();
    let viewer_id = claims.sub.to_string();
    let rows = with_db(&state, move |db| {
        if !db.target_visible(kind, &target, &viewer_id)? {
            return Ok(None);
        }
        db.get_likes(kind, &target).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found(kind.label()))?;

    let likes: Vec<_> = rows.into_iter().map(convert::like).collect();
    let like_amount = likes.len() as u64;
    let message = if like_amount == 0 {
        format!("{} has 0 likes", kind.label())
    } else {
        "Likes successfully retrieved".to_string()
    };
    Ok(ApiResponse::ok(LikesResponse { likes, like_amount }, message))
}
