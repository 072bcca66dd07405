use anyhow::Result;
use rusqlite::{Connection, Row};

use super::{OWNER_COLUMNS, OptionalExt, begin_write, map_owner};
use crate::Database;
use crate::models::{CommentRow, CommentWithOwnerRow, OwnedMutation};

const COMMENT_COLUMNS: &str = "c.id, c.video_id, c.owner_id, c.content, c.created_at, c.updated_at";

impl Database {
    /// Inserts a comment if the video exists and is visible to the author.
    /// Returns `None` otherwise.
    pub fn insert_comment(
        &self,
        id: &str,
        video_id: &str,
        owner_id: &str,
        content: &str,
    ) -> Result<Option<CommentRow>> {
        self.with_conn_mut(|conn| {
            let tx = begin_write(conn)?;
            if !super::video_visible(&tx, video_id, owner_id)? {
                return Ok(None);
            }
            tx.execute(
                "INSERT INTO comments (id, video_id, owner_id, content) VALUES (?1, ?2, ?3, ?4)",
                [id, video_id, owner_id, content],
            )?;
            let comment = query_comment(&tx, id)?;
            tx.commit()?;
            Ok(comment)
        })
    }

    #[cfg(test)]
    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| query_comment(conn, id))
    }

    /// Comments on a video joined with their authors, oldest first.
    pub fn list_comments_for_video(&self, video_id: &str) -> Result<Vec<CommentWithOwnerRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {COMMENT_COLUMNS}, {OWNER_COLUMNS}
                 FROM comments c
                 JOIN users u ON u.id = c.owner_id
                 WHERE c.video_id = ?1
                 ORDER BY c.created_at ASC, c.rowid ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([video_id], |row| {
                    Ok(CommentWithOwnerRow {
                        comment: map_comment(row)?,
                        owner: map_owner(row, 6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_comment(
        &self,
        id: &str,
        actor_id: &str,
        content: &str,
    ) -> Result<OwnedMutation<CommentRow>> {
        self.with_conn_mut(|conn| {
            let tx = begin_write(conn)?;
            match super::owner_of(&tx, "comments", id)? {
                None => return Ok(OwnedMutation::Missing),
                Some(owner) if owner != actor_id => return Ok(OwnedMutation::NotOwner),
                Some(_) => {}
            }
            tx.execute(
                "UPDATE comments SET content = ?2, updated_at = datetime('now') WHERE id = ?1",
                [id, content],
            )?;
            let comment = query_comment(&tx, id)?
                .ok_or_else(|| anyhow::anyhow!("comment {} vanished inside transaction", id))?;
            tx.commit()?;
            Ok(OwnedMutation::Done(comment))
        })
    }

    /// Deletes a comment together with the likes pointing at it.
    pub fn delete_comment(&self, id: &str, actor_id: &str) -> Result<OwnedMutation<()>> {
        self.with_conn_mut(|conn| {
            let tx = begin_write(conn)?;
            match super::owner_of(&tx, "comments", id)? {
                None => return Ok(OwnedMutation::Missing),
                Some(owner) if owner != actor_id => return Ok(OwnedMutation::NotOwner),
                Some(_) => {}
            }
            tx.execute(
                "DELETE FROM likes WHERE target_kind = 'comment' AND target_id = ?1",
                [id],
            )?;
            tx.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(OwnedMutation::Done(()))
        })
    }
}

fn query_comment(conn: &Connection, id: &str) -> Result<Option<CommentRow>> {
    let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.id = ?1");
    conn.query_row(&sql, [id], map_comment).optional()
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        video_id: row.get(1)?,
        owner_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
