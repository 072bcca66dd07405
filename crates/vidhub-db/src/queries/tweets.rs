use anyhow::Result;

use super::OptionalExt;
use crate::Database;
use crate::models::TweetRow;

impl Database {
    pub fn insert_tweet(&self, id: &str, owner_id: &str, content: &str) -> Result<Option<TweetRow>> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tweets (id, owner_id, content) VALUES (?1, ?2, ?3)",
                [id, owner_id, content],
            )?;
            query_tweet(conn, id)
        })
    }

    pub fn get_tweet(&self, id: &str) -> Result<Option<TweetRow>> {
        self.with_conn(|conn| query_tweet(conn, id))
    }
}

fn query_tweet(conn: &rusqlite::Connection, id: &str) -> Result<Option<TweetRow>> {
    conn.query_row(
        "SELECT id, owner_id, content, created_at FROM tweets WHERE id = ?1",
        [id],
        |row| {
            Ok(TweetRow {
                id: row.get(0)?,
                owner_id: row.get(1)?,
                content: row.get(2)?,
                created_at: row.get(3)?,
            })
        },
    )
    .optional()
}
