//! Row → API model conversion. Corrupt ids or timestamps are logged and
//! replaced with defaults rather than failing the whole response.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use vidhub_db::models::{
    ChannelRow, CommentRow, CommentWithOwnerRow, LikeRow, OwnerRow, PlaylistRow,
    PlaylistSummaryRow, TweetRow, UserRow, VideoListRow, VideoRow,
};
use vidhub_types::models::{
    ChannelProfile, Comment, CommentView, Like, OwnerSummary, Playlist, PlaylistDetail,
    PlaylistSummary, TargetKind, Tweet, User, Video, VideoListing,
};

fn id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} id '{}': {}", what, raw, e);
        Uuid::default()
    })
}

fn timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
            // Parse as naive UTC and convert.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

fn count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or_default()
}

pub fn user(row: UserRow) -> User {
    User {
        id: id(&row.id, "user"),
        username: row.username,
        email: row.email,
        full_name: row.full_name,
        avatar: row.avatar,
        cover_image: row.cover_image,
        created_at: timestamp(&row.created_at),
        updated_at: timestamp(&row.updated_at),
    }
}

pub fn owner(row: OwnerRow) -> OwnerSummary {
    OwnerSummary {
        id: id(&row.id, "user"),
        username: row.username,
        full_name: row.full_name,
        avatar: row.avatar,
    }
}

pub fn video(row: VideoRow) -> Video {
    Video {
        id: id(&row.id, "video"),
        owner: id(&row.owner_id, "user"),
        title: row.title,
        description: row.description,
        video_file: row.video_file,
        thumbnail: row.thumbnail,
        duration: row.duration,
        views: count(row.views),
        is_published: row.is_published,
        created_at: timestamp(&row.created_at),
        updated_at: timestamp(&row.updated_at),
    }
}

pub fn video_listing(row: VideoListRow) -> VideoListing {
    VideoListing {
        video: video(row.video),
        created_by: owner(row.owner),
        likes: count(row.likes),
    }
}

pub fn tweet(row: TweetRow) -> Tweet {
    Tweet {
        id: id(&row.id, "tweet"),
        owner: id(&row.owner_id, "user"),
        content: row.content,
        created_at: timestamp(&row.created_at),
    }
}

pub fn comment(row: CommentRow) -> Comment {
    Comment {
        id: id(&row.id, "comment"),
        video: id(&row.video_id, "video"),
        owner: id(&row.owner_id, "user"),
        content: row.content,
        created_at: timestamp(&row.created_at),
        updated_at: timestamp(&row.updated_at),
    }
}

pub fn comment_view(row: CommentWithOwnerRow) -> CommentView {
    CommentView {
        id: id(&row.comment.id, "comment"),
        content: row.comment.content,
        username: row.owner.username,
        full_name: row.owner.full_name,
        avatar: row.owner.avatar,
        created_at: timestamp(&row.comment.created_at),
    }
}

pub fn like(row: LikeRow) -> Like {
    let target_kind = row.target_kind.parse().unwrap_or_else(|e| {
        warn!("Corrupt target kind on like '{}': {}", row.id, e);
        TargetKind::Video
    });
    Like {
        id: id(&row.id, "like"),
        target_kind,
        target_id: id(&row.target_id, "target"),
        liked_by: id(&row.user_id, "user"),
        created_at: timestamp(&row.created_at),
    }
}

pub fn playlist(row: PlaylistRow) -> Playlist {
    Playlist {
        id: id(&row.id, "playlist"),
        owner: id(&row.owner_id, "user"),
        name: row.name,
        description: row.description,
        videos: row.video_ids.iter().map(|v| id(v, "video")).collect(),
        created_at: timestamp(&row.created_at),
        updated_at: timestamp(&row.updated_at),
    }
}

/// A playlist with its owner and resolved member videos.
pub fn playlist_detail(row: PlaylistRow, owner: UserRow, videos: Vec<VideoRow>) -> PlaylistDetail {
    PlaylistDetail {
        id: id(&row.id, "playlist"),
        name: row.name,
        description: row.description,
        owner: OwnerSummary {
            id: id(&owner.id, "user"),
            username: owner.username,
            full_name: owner.full_name,
            avatar: owner.avatar,
        },
        videos: videos.into_iter().map(video).collect(),
        created_at: timestamp(&row.created_at),
        updated_at: timestamp(&row.updated_at),
    }
}

pub fn playlist_summary(row: PlaylistSummaryRow) -> PlaylistSummary {
    PlaylistSummary {
        id: id(&row.id, "playlist"),
        name: row.name,
        description: row.description,
        username: row.owner.username,
        full_name: row.owner.full_name,
        avatar: row.owner.avatar,
        video_count: count(row.video_count),
    }
}

pub fn channel(row: ChannelRow) -> ChannelProfile {
    ChannelProfile {
        id: id(&row.user.id, "user"),
        username: row.user.username,
        full_name: row.user.full_name,
        avatar: row.user.avatar,
        cover_image: row.user.cover_image,
        video_count: count(row.video_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sqlite_timestamps() {
        let ts = timestamp("2024-03-01 12:30:00");
        assert_eq!(ts.to_rfc3339(), "2024-03-01T12:30:00+00:00");
    }

    #[test]
    fn corrupt_values_fall_back_to_defaults() {
        assert_eq!(id("not-a-uuid", "video"), Uuid::default());
        assert_eq!(timestamp("yesterday"), DateTime::<Utc>::default());
        assert_eq!(count(-3), 0);
    }

    #[test]
    fn playlist_detail_summarizes_the_owner() {
        let owner_id = Uuid::new_v4();
        let owner = UserRow {
            id: owner_id.to_string(),
            username: "ivy".into(),
            email: "ivy@example.com".into(),
            full_name: "Ivy Example".into(),
            avatar: "https://cdn.example.com/ivy.png".into(),
            cover_image: String::new(),
            password: "hash".into(),
            refresh_token: None,
            created_at: "2024-03-01 12:30:00".into(),
            updated_at: "2024-03-01 12:30:00".into(),
        };
        let row = PlaylistRow {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: "favs".into(),
            description: String::new(),
            video_ids: Vec::new(),
            created_at: "2024-03-02 08:00:00".into(),
            updated_at: "2024-03-02 08:00:00".into(),
        };

        let detail = playlist_detail(row, owner, Vec::new());
        assert_eq!(detail.owner.id, owner_id);
        assert_eq!(detail.owner.username, "ivy");
        assert_eq!(detail.owner.avatar, "https://cdn.example.com/ivy.png");
        assert_eq!(detail.created_at.to_rfc3339(), "2024-03-02T08:00:00+00:00");
    }
}
