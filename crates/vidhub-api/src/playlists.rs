use axum::{Extension, extract::State};
use tracing::info;
use uuid::Uuid;

use vidhub_db::{MembershipOutcome, OwnedMutation};
use vidhub_types::api::{Claims, CreatePlaylistRequest, UpdatePlaylistRequest};
use vidhub_types::models::{Playlist, PlaylistDetail, PlaylistSummary};

use crate::convert;
use crate::error::{ApiError, required};
use crate::extract::{ApiJson, ApiPath};
use crate::response::{ApiResponse, Empty};
use crate::state::{AppState, with_db};

const NAME_REQUIRED: &str = "Playlist name is required";

pub async fn create_playlist(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreatePlaylistRequest>,
) -> Result<ApiResponse<Playlist>, ApiError> {
    let name = required(&req.name, NAME_REQUIRED)?.to_string();
    let description = req.description.trim().to_string();
    let playlist_id = Uuid::new_v4().to_string();
    let owner_id = claims.sub.to_string();

    let row = with_db(&state, move |db| {
        db.insert_playlist(&playlist_id, &owner_id, &name, &description)
    })
    .await?;

    info!("User {} created playlist {}", claims.username, row.id);
    Ok(ApiResponse::ok(convert::playlist(row), "New playlist successfully created"))
}

pub async fn user_playlists(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Vec<PlaylistSummary>>, ApiError> {
    let user_id = user_id.to_string();
    let rows = with_db(&state, move |db| {
        if db.get_user_by_id(&user_id)?.is_none() {
            return Ok(None);
        }
        db.list_user_playlists(&user_id).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("User"))?;

    let playlists = rows.into_iter().map(convert::playlist_summary).collect();
    Ok(ApiResponse::ok(playlists, "Playlist successfully retrieved"))
}

/// The playlist with its owner and member videos resolved, in order.
/// Unpublished members only show up for their owner.
pub async fn get_playlist(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(playlist_id): ApiPath<Uuid>,
) -> Result<ApiResponse<PlaylistDetail>, ApiError> {
    let playlist_id = playlist_id.to_string();
    let viewer_id = claims.sub.to_string();
    let resolved = with_db(&state, move |db| {
        let Some(playlist) = db.get_playlist(&playlist_id)? else {
            return Ok(None);
        };
        let owner = db
            .get_user_by_id(&playlist.owner_id)?
            .ok_or_else(|| anyhow::anyhow!("owner of playlist {} missing", playlist.id))?;
        let videos = db.get_playlist_videos(&playlist_id, &viewer_id)?;
        Ok(Some((playlist, owner, videos)))
    })
    .await?;

    let (playlist, owner, videos) = resolved.ok_or_else(|| ApiError::not_found("Playlist"))?;
    Ok(ApiResponse::ok(
        convert::playlist_detail(playlist, owner, videos),
        "Playlist successfully retrieved",
    ))
}

pub async fn update_playlist(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(playlist_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdatePlaylistRequest>,
) -> Result<ApiResponse<Playlist>, ApiError> {
    let name = req
        .name
        .as_deref()
        .map(|n| required(n, NAME_REQUIRED).map(str::to_string))
        .transpose()?;
    let description = req.description.map(|d| d.trim().to_string());
    if name.is_none() && description.is_none() {
        return Err(ApiError::Validation("Nothing to update".into()));
    }

    let playlist_id = playlist_id.to_string();
    let actor = claims.sub.to_string();
    let outcome = with_db(&state, move |db| {
        db.update_playlist(&playlist_id, &actor, name.as_deref(), description.as_deref())
    })
    .await?;

    match outcome {
        OwnedMutation::Missing => Err(ApiError::not_found("Playlist")),
        OwnedMutation::NotOwner => Err(ApiError::unauthorized_access()),
        OwnedMutation::Done(row) => Ok(ApiResponse::ok(convert::playlist(row), "Playlist updated successfully")),
    }
}

pub async fn delete_playlist(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(playlist_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Empty>, ApiError> {
    let playlist_id = playlist_id.to_string();
    let actor = claims.sub.to_string();
    let outcome = with_db(&state, move |db| db.delete_playlist(&playlist_id, &actor)).await?;

    match outcome {
        OwnedMutation::Missing => Err(ApiError::not_found("Playlist")),
        OwnedMutation::NotOwner => Err(ApiError::unauthorized_access()),
        OwnedMutation::Done(()) => Ok(ApiResponse::ok(Empty {}, "Playlist deleted successfully")),
    }
}

pub async fn add_video(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath((playlist_id, video_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<ApiResponse<Playlist>, ApiError> {
    let playlist_id = playlist_id.to_string();
    let video_id = video_id.to_string();
    let actor = claims.sub.to_string();
    let outcome = with_db(&state, move |db| {
        db.add_playlist_video(&playlist_id, &video_id, &actor)
    })
    .await?;

    membership_response(outcome, "Video added successfully")
}

pub async fn remove_video(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath((playlist_id, video_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<ApiResponse<Playlist>, ApiError> {
    let playlist_id = playlist_id.to_string();
    let video_id = video_id.to_string();
    let actor = claims.sub.to_string();
    let outcome = with_db(&state, move |db| {
        db.remove_playlist_video(&playlist_id, &video_id, &actor)
    })
    .await?;

    membership_response(outcome, "Video deleted successfully")
}

fn membership_response(
    outcome: MembershipOutcome,
    message: &str,
) -> Result<ApiResponse<Playlist>, ApiError> {
    match outcome {
        MembershipOutcome::PlaylistMissing => Err(ApiError::not_found("Playlist")),
        MembershipOutcome::VideoMissing => Err(ApiError::not_found("Video")),
        MembershipOutcome::NotOwner => Err(ApiError::unauthorized_access()),
        MembershipOutcome::AlreadyMember => {
            Err(ApiError::Conflict("Video already exists in playlist".into()))
        }
        MembershipOutcome::NotMember => {
            Err(ApiError::NotFound("Video does not exist in playlist".into()))
        }
        MembershipOutcome::Updated(row) => Ok(ApiResponse::ok(convert::playlist(row), message)),
    }
}
