use anyhow::Result;
use rusqlite::{Connection, ToSql};

use vidhub_types::api::SortBy;

use super::{OWNER_COLUMNS, OptionalExt, VIDEO_COLUMNS, begin_write, map_owner, map_video};
use crate::Database;
use crate::models::{OwnedMutation, VideoListRow, VideoRow};

/// Filters and ordering for the published-video listing.
#[derive(Debug, Clone, Default)]
pub struct VideoFilter {
    /// Case-insensitive substring matched against title and description.
    pub search: Option<String>,
    pub owner_id: Option<String>,
    pub sort_by: SortBy,
    pub ascending: bool,
    pub limit: u32,
    pub offset: u32,
}

impl Database {
    #[allow(clippy::too_many_arguments)]
    pub fn insert_video(
        &self,
        id: &str,
        owner_id: &str,
        title: &str,
        description: &str,
        video_file: &str,
        thumbnail: &str,
        duration: f64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO videos (id, owner_id, title, description, video_file, thumbnail, duration)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![id, owner_id, title, description, video_file, thumbnail, duration],
            )?;
            Ok(())
        })
    }

    pub fn get_video(&self, id: &str) -> Result<Option<VideoRow>> {
        self.with_conn(|conn| query_video(conn, id))
    }

    /// The video if `viewer_id` may see it: published, or their own.
    pub fn get_visible_video(&self, id: &str, viewer_id: &str) -> Result<Option<VideoRow>> {
        self.with_conn(|conn| {
            if !super::video_visible(conn, id, viewer_id)? {
                return Ok(None);
            }
            query_video(conn, id)
        })
    }

    /// Returns one page of published videos and the total number matching.
    pub fn list_videos(&self, filter: &VideoFilter) -> Result<(Vec<VideoListRow>, i64)> {
        self.with_conn(|conn| {
            let mut clauses = vec!["v.is_published = 1".to_string()];
            let mut params: Vec<Box<dyn ToSql>> = Vec::new();

            if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
                params.push(Box::new(like_pattern(search)));
                let idx = params.len();
                clauses.push(format!(
                    "(v.title LIKE ?{idx} ESCAPE '\\' OR v.description LIKE ?{idx} ESCAPE '\\')"
                ));
            }
            if let Some(owner_id) = &filter.owner_id {
                params.push(Box::new(owner_id.clone()));
                clauses.push(format!("v.owner_id = ?{}", params.len()));
            }
            let where_sql = clauses.join(" AND ");

            let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM videos v WHERE {where_sql}"),
                param_refs.as_slice(),
                |row| row.get(0),
            )?;

            let direction = if filter.ascending { "ASC" } else { "DESC" };
            let order_column = match filter.sort_by {
                SortBy::CreatedAt => "v.created_at",
                SortBy::Views => "v.views",
                SortBy::Duration => "v.duration",
                SortBy::Title => "v.title",
                SortBy::Likes => "like_count",
            };

            let sql = format!(
                "SELECT {VIDEO_COLUMNS}, {OWNER_COLUMNS},
                        (SELECT COUNT(*) FROM likes l
                          WHERE l.target_kind = 'video' AND l.target_id = v.id) AS like_count
                 FROM videos v
                 JOIN users u ON u.id = v.owner_id
                 WHERE {where_sql}
                 ORDER BY {order_column} {direction}, v.created_at DESC, v.id
                 LIMIT {} OFFSET {}",
                filter.limit, filter.offset
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(param_refs.as_slice(), |row| {
                    Ok(VideoListRow {
                        video: map_video(row, 0)?,
                        owner: map_owner(row, 11)?,
                        likes: row.get(15)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((rows, total))
        })
    }

    /// Changes title, description and thumbnail if `actor_id` owns the video.
    pub fn update_video(
        &self,
        id: &str,
        actor_id: &str,
        title: &str,
        description: &str,
        thumbnail: &str,
    ) -> Result<OwnedMutation<VideoRow>> {
        self.with_conn_mut(|conn| {
            let tx = begin_write(conn)?;
            match super::owner_of(&tx, "videos", id)? {
                None => return Ok(OwnedMutation::Missing),
                Some(owner) if owner != actor_id => return Ok(OwnedMutation::NotOwner),
                Some(_) => {}
            }

            tx.execute(
                "UPDATE videos
                 SET title = ?2, description = ?3, thumbnail = ?4, updated_at = datetime('now')
                 WHERE id = ?1",
                [id, title, description, thumbnail],
            )?;
            let video = query_video(&tx, id)?
                .ok_or_else(|| anyhow::anyhow!("video {} vanished inside transaction", id))?;
            tx.commit()?;
            Ok(OwnedMutation::Done(video))
        })
    }

    /// Sets the publish flag to `status`, or flips it when `status` is `None`.
    /// Returns the resulting flag.
    pub fn set_publish_status(
        &self,
        id: &str,
        actor_id: &str,
        status: Option<bool>,
    ) -> Result<OwnedMutation<bool>> {
        self.with_conn_mut(|conn| {
            let tx = begin_write(conn)?;
            let current: Option<(String, bool)> = tx
                .query_row(
                    "SELECT owner_id, is_published FROM videos WHERE id = ?1",
                    [id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let published = match current {
                None => return Ok(OwnedMutation::Missing),
                Some((owner, _)) if owner != actor_id => return Ok(OwnedMutation::NotOwner),
                Some((_, published)) => published,
            };
            let next = status.unwrap_or(!published);

            tx.execute(
                "UPDATE videos SET is_published = ?2, updated_at = datetime('now') WHERE id = ?1",
                rusqlite::params![id, next],
            )?;
            tx.commit()?;
            Ok(OwnedMutation::Done(next))
        })
    }

    /// Counts a view and records it in the viewer's watch history.
    /// Returns `None` if the video does not exist or is hidden from the viewer.
    pub fn record_view(&self, video_id: &str, viewer_id: &str) -> Result<Option<VideoRow>> {
        self.with_conn_mut(|conn| {
            let tx = begin_write(conn)?;
            let changed = tx.execute(
                "UPDATE videos SET views = views + 1
                 WHERE id = ?1 AND (is_published = 1 OR owner_id = ?2)",
                [video_id, viewer_id],
            )?;
            if changed == 0 {
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO watch_history (user_id, video_id) VALUES (?1, ?2)
                 ON CONFLICT(user_id, video_id) DO UPDATE SET watched_at = datetime('now')",
                [viewer_id, video_id],
            )?;
            let video = query_video(&tx, video_id)?;
            tx.commit()?;
            Ok(video)
        })
    }

    /// Videos the user has watched and can still see, most recent first.
    pub fn get_watch_history(&self, user_id: &str) -> Result<Vec<VideoListRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {VIDEO_COLUMNS}, {OWNER_COLUMNS},
                        (SELECT COUNT(*) FROM likes l
                          WHERE l.target_kind = 'video' AND l.target_id = v.id)
                 FROM watch_history h
                 JOIN videos v ON v.id = h.video_id
                 JOIN users u ON u.id = v.owner_id
                 WHERE h.user_id = ?1 AND (v.is_published = 1 OR v.owner_id = ?1)
                 ORDER BY h.watched_at DESC, h.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(VideoListRow {
                        video: map_video(row, 0)?,
                        owner: map_owner(row, 11)?,
                        likes: row.get(15)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

pub(crate) fn query_video(conn: &Connection, id: &str) -> Result<Option<VideoRow>> {
    let sql = format!("SELECT {VIDEO_COLUMNS} FROM videos v WHERE v.id = ?1");
    conn.query_row(&sql, [id], |row| map_video(row, 0)).optional()
}

/// Builds a LIKE pattern matching `needle` anywhere, with `\` as escape.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
