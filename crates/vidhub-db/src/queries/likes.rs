use anyhow::Result;
use rusqlite::{Connection, Row};

use vidhub_types::models::TargetKind;

use super::{OptionalExt, begin_write};
use crate::Database;
use crate::models::{LikeRow, ToggleOutcome};

const LIKE_COLUMNS: &str = "id, user_id, target_kind, target_id, created_at";

/// Whether `viewer_id` can see the target. A comment inherits the
/// visibility of the video it was left on.
fn target_visible(
    conn: &Connection,
    kind: TargetKind,
    target_id: &str,
    viewer_id: &str,
) -> Result<bool> {
    match kind {
        TargetKind::Video => super::video_visible(conn, target_id, viewer_id),
        TargetKind::Tweet => super::exists(conn, "tweets", target_id),
        TargetKind::Comment => Ok(conn.query_row(
            "SELECT EXISTS(
                 SELECT 1 FROM comments c JOIN videos v ON v.id = c.video_id
                 WHERE c.id = ?1 AND (v.is_published = 1 OR v.owner_id = ?2))",
            [target_id, viewer_id],
            |row| row.get(0),
        )?),
    }
}

impl Database {
    pub fn target_visible(&self, kind: TargetKind, target_id: &str, viewer_id: &str) -> Result<bool> {
        self.with_conn(|conn| target_visible(conn, kind, target_id, viewer_id))
    }

    /// Toggle a like: inserts one if the user has none on the target,
    /// removes it otherwise.
    ///
    /// The visibility check, the conditional insert and the fallback delete
    /// all run in one immediate transaction, and `(user_id, target_kind,
    /// target_id)` is unique, so concurrent toggles cannot leave two likes.
    pub fn toggle_like(
        &self,
        id: &str,
        kind: TargetKind,
        target_id: &str,
        user_id: &str,
    ) -> Result<ToggleOutcome> {
        self.with_conn_mut(|conn| {
            let tx = begin_write(conn)?;
            if !target_visible(&tx, kind, target_id, user_id)? {
                return Ok(ToggleOutcome::TargetMissing);
            }

            let inserted = tx.execute(
                "INSERT INTO likes (id, user_id, target_kind, target_id) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, target_kind, target_id) DO NOTHING",
                [id, user_id, kind.as_str(), target_id],
            )?;

            let outcome = if inserted == 1 {
                let like = query_like(&tx, id)?
                    .ok_or_else(|| anyhow::anyhow!("like {} vanished inside transaction", id))?;
                ToggleOutcome::Added(like)
            } else {
                tx.execute(
                    "DELETE FROM likes WHERE user_id = ?1 AND target_kind = ?2 AND target_id = ?3",
                    [user_id, kind.as_str(), target_id],
                )?;
                ToggleOutcome::Removed
            };

            tx.commit()?;
            Ok(outcome)
        })
    }

    /// All likes on a target, oldest first. Does not check that the target exists.
    pub fn get_likes(&self, kind: TargetKind, target_id: &str) -> Result<Vec<LikeRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {LIKE_COLUMNS} FROM likes
                 WHERE target_kind = ?1 AND target_id = ?2
                 ORDER BY created_at ASC, rowid ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([kind.as_str(), target_id], map_like)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    #[cfg(test)]
    pub fn count_likes(&self, kind: TargetKind, target_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE target_kind = ?1 AND target_id = ?2",
                [kind.as_str(), target_id],
                |row| row.get(0),
            )?)
        })
    }
}

fn query_like(conn: &Connection, id: &str) -> Result<Option<LikeRow>> {
    let sql = format!("SELECT {LIKE_COLUMNS} FROM likes WHERE id = ?1");
    conn.query_row(&sql, [id], map_like).optional()
}

fn map_like(row: &Row<'_>) -> rusqlite::Result<LikeRow> {
    Ok(LikeRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        target_kind: row.get(2)?,
        target_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}
