/// Database row types — these map directly to SQLite rows.
/// Distinct from vidhub-types API models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub password: String,
    pub refresh_token: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// The public slice of a user joined onto other rows.
#[derive(Debug, Clone)]
pub struct OwnerRow {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub avatar: String,
}

#[derive(Debug, Clone)]
pub struct VideoRow {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub video_file: String,
    pub thumbnail: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct VideoListRow {
    pub video: VideoRow,
    pub owner: OwnerRow,
    pub likes: i64,
}

#[derive(Debug, Clone)]
pub struct TweetRow {
    pub id: String,
    pub owner_id: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: String,
    pub video_id: String,
    pub owner_id: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct CommentWithOwnerRow {
    pub comment: CommentRow,
    pub owner: OwnerRow,
}

#[derive(Debug, Clone)]
pub struct LikeRow {
    pub id: String,
    pub user_id: String,
    pub target_kind: String,
    pub target_id: String,
    pub created_at: String,
}

/// A playlist plus its member video ids in playlist order.
#[derive(Debug, Clone)]
pub struct PlaylistRow {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: String,
    pub video_ids: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct PlaylistSummaryRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner: OwnerRow,
    pub video_count: i64,
}

#[derive(Debug, Clone)]
pub struct ChannelRow {
    pub user: UserRow,
    pub video_count: i64,
}

// -- Outcomes of check-then-act operations --
//
// Each of these is decided inside one write transaction; the caller maps
// them to API errors.

#[derive(Debug)]
pub enum ToggleOutcome {
    TargetMissing,
    Added(LikeRow),
    Removed,
}

#[derive(Debug)]
pub enum MembershipOutcome {
    PlaylistMissing,
    VideoMissing,
    NotOwner,
    AlreadyMember,
    NotMember,
    Updated(PlaylistRow),
}

#[derive(Debug)]
pub enum AccountUpdate {
    UserMissing,
    EmailTaken,
    Updated(UserRow),
}

/// Result of a mutation restricted to the owner of a row. Existence is
/// checked before ownership.
#[derive(Debug)]
pub enum OwnedMutation<T> {
    Missing,
    NotOwner,
    Done(T),
}
