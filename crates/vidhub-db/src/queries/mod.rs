mod comments;
mod likes;
mod playlists;
mod tweets;
mod users;
mod videos;

pub use videos::VideoFilter;

use anyhow::Result;
use rusqlite::{Connection, Row, Transaction, TransactionBehavior};

use crate::models::{OwnerRow, VideoRow};

/// Column list matching [`map_video`], qualified with the `v` alias.
pub(crate) const VIDEO_COLUMNS: &str = "v.id, v.owner_id, v.title, v.description, v.video_file, \
     v.thumbnail, v.duration, v.views, v.is_published, v.created_at, v.updated_at";

/// Column list matching [`map_owner`], qualified with the `u` alias.
pub(crate) const OWNER_COLUMNS: &str = "u.id, u.username, u.full_name, u.avatar";

pub(crate) fn map_video(row: &Row<'_>, base: usize) -> rusqlite::Result<VideoRow> {
    Ok(VideoRow {
        id: row.get(base)?,
        owner_id: row.get(base + 1)?,
        title: row.get(base + 2)?,
        description: row.get(base + 3)?,
        video_file: row.get(base + 4)?,
        thumbnail: row.get(base + 5)?,
        duration: row.get(base + 6)?,
        views: row.get(base + 7)?,
        is_published: row.get(base + 8)?,
        created_at: row.get(base + 9)?,
        updated_at: row.get(base + 10)?,
    })
}

pub(crate) fn map_owner(row: &Row<'_>, base: usize) -> rusqlite::Result<OwnerRow> {
    Ok(OwnerRow {
        id: row.get(base)?,
        username: row.get(base + 1)?,
        full_name: row.get(base + 2)?,
        avatar: row.get(base + 3)?,
    })
}

/// Opens a write transaction that takes the database write lock up front,
/// so reads inside it cannot be invalidated by another writer before commit.
pub(crate) fn begin_write(conn: &mut Connection) -> Result<Transaction<'_>> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}

/// Looks up the `owner_id` of a row. `table` is always a literal from this crate.
pub(crate) fn owner_of(conn: &Connection, table: &str, id: &str) -> Result<Option<String>> {
    let sql = format!("SELECT owner_id FROM {table} WHERE id = ?1");
    conn.query_row(&sql, [id], |row| row.get(0)).optional()
}

pub(crate) fn exists(conn: &Connection, table: &str, id: &str) -> Result<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)");
    Ok(conn.query_row(&sql, [id], |row| row.get(0))?)
}

/// Published videos are visible to everyone, unpublished ones to their owner only.
pub(crate) fn video_visible(conn: &Connection, video_id: &str, viewer_id: &str) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM videos WHERE id = ?1 AND (is_published = 1 OR owner_id = ?2))",
        [video_id, viewer_id],
        |row| row.get(0),
    )?)
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
