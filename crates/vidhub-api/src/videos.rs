use axum::{Extension, extract::State};
use tracing::info;
use uuid::Uuid;

use vidhub_db::OwnedMutation;
use vidhub_db::queries::VideoFilter;
use vidhub_types::api::{
    Claims, Page, PublishStatusRequest, PublishStatusResponse, PublishVideoRequest, SortType,
    UpdateVideoRequest, VideoListQuery, VideoPage,
};
use vidhub_types::models::Video;

use crate::convert;
use crate::error::{ApiError, required};
use crate::extract::{ApiJson, ApiPath, ApiQuery, OptionalJson};
use crate::response::ApiResponse;
use crate::state::{AppState, with_db};

const MAX_PAGE_SIZE: u32 = 100;

pub async fn publish_video(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<PublishVideoRequest>,
) -> Result<ApiResponse<Video>, ApiError> {
    const TEXT_REQUIRED: &str = "Title and description are required fields";
    const MEDIA_REQUIRED: &str = "Thumbnail and video are required fields";
    let title = required(&req.title, TEXT_REQUIRED)?.to_string();
    let description = required(&req.description, TEXT_REQUIRED)?.to_string();
    let video_file = required(&req.video_file, MEDIA_REQUIRED)?.to_string();
    let thumbnail = required(&req.thumbnail, MEDIA_REQUIRED)?.to_string();
    if !req.duration.is_finite() || req.duration < 0.0 {
        return Err(ApiError::Validation("Duration must be a non-negative number".into()));
    }

    let video_id = Uuid::new_v4().to_string();
    let owner_id = claims.sub.to_string();
    let duration = req.duration;
    let row = with_db(&state, move |db| {
        db.insert_video(&video_id, &owner_id, &title, &description, &video_file, &thumbnail, duration)?;
        db.get_video(&video_id)
    })
    .await?
    .ok_or_else(|| ApiError::Internal("video missing after insert".into()))?;

    info!("User {} published video {}", claims.username, row.id);
    Ok(ApiResponse::created(convert::video(row), "Video published successfully"))
}

pub async fn list_videos(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<VideoListQuery>,
) -> Result<ApiResponse<VideoPage>, ApiError> {
    if query.page == 0 {
        return Err(ApiError::Validation("Page numbers start at 1".into()));
    }
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);

    let filter = VideoFilter {
        search: query.query.map(|q| q.trim().to_string()),
        owner_id: query.user_id.map(|id| id.to_string()),
        sort_by: query.sort_by,
        ascending: query.sort_type == SortType::Asc,
        limit,
        offset: (query.page - 1).saturating_mul(limit),
    };

    let (rows, total) = with_db(&state, move |db| db.list_videos(&filter)).await?;
    let total_docs = u64::try_from(total).unwrap_or_default();

    let page = Page {
        docs: rows.into_iter().map(convert::video_listing).collect(),
        total_docs,
        page: query.page,
        limit,
        total_pages: total_docs.div_ceil(u64::from(limit)) as u32,
    };
    Ok(ApiResponse::ok(page, "Videos successfully retrieved"))
}

/// Fetching a video counts as watching it.
pub async fn get_video(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(video_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Video>, ApiError> {
    let video_id = video_id.to_string();
    let viewer_id = claims.sub.to_string();

    // Unpublished videos are visible to their owner only.
    let row = with_db(&state, move |db| db.record_view(&video_id, &viewer_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Video"))?;

    Ok(ApiResponse::ok(convert::video(row), "Video with given id was found"))
}

pub async fn update_video(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(video_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateVideoRequest>,
) -> Result<ApiResponse<Video>, ApiError> {
    const TEXT_REQUIRED: &str = "Title and description are required fields";
    let title = required(&req.title, TEXT_REQUIRED)?.to_string();
    let description = required(&req.description, TEXT_REQUIRED)?.to_string();
    let thumbnail = required(&req.thumbnail, "Thumbnail is a required field")?.to_string();

    let video_id = video_id.to_string();
    let actor = claims.sub.to_string();
    let outcome = with_db(&state, move |db| {
        db.update_video(&video_id, &actor, &title, &description, &thumbnail)
    })
    .await?;

    match outcome {
        OwnedMutation::Missing => Err(ApiError::NotFound("Video id is invalid".into())),
        OwnedMutation::NotOwner => Err(ApiError::unauthorized_access()),
        OwnedMutation::Done(row) => Ok(ApiResponse::ok(convert::video(row), "Video details updated")),
    }
}

/// Sets `isPublished` from the body, or flips it when the body omits it.
pub async fn set_publish_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(video_id): ApiPath<Uuid>,
    OptionalJson(req): OptionalJson<PublishStatusRequest>,
) -> Result<ApiResponse<PublishStatusResponse>, ApiError> {
    let video_id = video_id.to_string();
    let actor = claims.sub.to_string();
    let outcome = with_db(&state, move |db| {
        db.set_publish_status(&video_id, &actor, req.is_published)
    })
    .await?;

    match outcome {
        OwnedMutation::Missing => Err(ApiError::NotFound("Video id is invalid".into())),
        OwnedMutation::NotOwner => Err(ApiError::unauthorized_access()),
        OwnedMutation::Done(is_published) => Ok(ApiResponse::ok(
            PublishStatusResponse { is_published },
            "Publish status updated",
        )),
    }
}
