use anyhow::Result;
use rusqlite::{Connection, Row};

use super::{OptionalExt, begin_write};
use crate::Database;
use crate::models::{AccountUpdate, ChannelRow, UserRow};

const USER_COLUMNS: &str = "id, username, email, full_name, avatar, cover_image, password, \
     refresh_token, created_at, updated_at";

impl Database {
    /// Inserts a new user unless the username or email is already held.
    /// Returns `None` when either is taken; the check and the insert share
    /// one write transaction.
    #[allow(clippy::too_many_arguments)]
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        full_name: &str,
        avatar: &str,
        cover_image: &str,
        password_hash: &str,
    ) -> Result<Option<UserRow>> {
        self.with_conn_mut(|conn| {
            let tx = begin_write(conn)?;
            let taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 OR email = ?2)",
                [username, email],
                |row| row.get(0),
            )?;
            if taken {
                return Ok(None);
            }
            tx.execute(
                "INSERT INTO users (id, username, email, full_name, avatar, cover_image, password)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![id, username, email, full_name, avatar, cover_image, password_hash],
            )?;
            let user = query_user(&tx, "id", id)?;
            tx.commit()?;
            Ok(user)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Finds a user matching either the username or the email.
    pub fn find_user_for_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users WHERE username = ?1 OR email = ?2 LIMIT 1"
            );
            conn.query_row(&sql, rusqlite::params![username, email], map_user)
                .optional()
        })
    }

    pub fn set_refresh_token(&self, id: &str, token: Option<&str>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET refresh_token = ?2 WHERE id = ?1",
                rusqlite::params![id, token],
            )?;
            Ok(())
        })
    }

    /// Swaps the stored refresh token for `next` only if it still equals
    /// `current`. Returns false when the token was already rotated or cleared.
    pub fn rotate_refresh_token(&self, id: &str, current: &str, next: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET refresh_token = ?3 WHERE id = ?1 AND refresh_token = ?2",
                [id, current, next],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn update_password(&self, id: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET password = ?2, updated_at = datetime('now') WHERE id = ?1",
                [id, password_hash],
            )?;
            Ok(())
        })
    }

    /// Updates whichever profile fields are given and returns the fresh row.
    /// A new email already held by another user leaves the row untouched.
    pub fn update_account(
        &self,
        id: &str,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<AccountUpdate> {
        self.with_conn_mut(|conn| {
            let tx = begin_write(conn)?;
            if query_user(&tx, "id", id)?.is_none() {
                return Ok(AccountUpdate::UserMissing);
            }
            if let Some(email) = email {
                let held_elsewhere: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 AND id != ?2)",
                    [email, id],
                    |row| row.get(0),
                )?;
                if held_elsewhere {
                    return Ok(AccountUpdate::EmailTaken);
                }
            }
            tx.execute(
                "UPDATE users
                 SET full_name = COALESCE(?2, full_name),
                     email = COALESCE(?3, email),
                     updated_at = datetime('now')
                 WHERE id = ?1",
                rusqlite::params![id, full_name, email],
            )?;
            let updated = query_user(&tx, "id", id)?;
            tx.commit()?;
            Ok(updated.map_or(AccountUpdate::UserMissing, AccountUpdate::Updated))
        })
    }

    pub fn update_avatar(&self, id: &str, url: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET avatar = ?2, updated_at = datetime('now') WHERE id = ?1",
                [id, url],
            )?;
            query_user(conn, "id", id)
        })
    }

    pub fn update_cover_image(&self, id: &str, url: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET cover_image = ?2, updated_at = datetime('now') WHERE id = ?1",
                [id, url],
            )?;
            query_user(conn, "id", id)
        })
    }

    /// Public channel profile: the user plus how many published videos they have.
    pub fn get_channel(&self, username: &str) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| {
            let Some(user) = query_user(conn, "username", username)? else {
                return Ok(None);
            };
            let video_count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM videos WHERE owner_id = ?1 AND is_published = 1",
                [&user.id],
                |row| row.get(0),
            )?;
            Ok(Some(ChannelRow { user, video_count }))
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([value], map_user).optional()
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        full_name: row.get(3)?,
        avatar: row.get(4)?,
        cover_image: row.get(5)?,
        password: row.get(6)?,
        refresh_token: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::models::AccountUpdate;
    use crate::test_support::{open_tmp, seed_user, seed_video};

    #[test]
    fn duplicate_username_or_email_is_rejected() {
        let (db, _dir) = open_tmp();
        seed_user(&db, "alice");

        let register = |id: &str, username: &str, email: &str| {
            db.create_user(id, username, email, "Alice Again", "https://cdn.example.com/a.png", "", "hash")
                .unwrap()
        };
        assert!(register("id-1", "alice", "another@example.com").is_none());
        assert!(register("id-2", "nobody", "alice@example.com").is_none());
        assert!(db.get_user_by_id("id-1").unwrap().is_none());
        assert!(db.get_user_by_id("id-2").unwrap().is_none());

        let created = register("id-3", "nobody", "nobody@example.com").unwrap();
        assert_eq!(created.username, "nobody");
        assert!(created.refresh_token.is_none());
    }

    #[test]
    fn login_lookup_matches_username_or_email() {
        let (db, _dir) = open_tmp();
        let id = seed_user(&db, "bob");

        let by_name = db.find_user_for_login(Some("bob"), None).unwrap().unwrap();
        assert_eq!(by_name.id, id);

        let by_email = db
            .find_user_for_login(None, Some("bob@example.com"))
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, id);

        assert!(db.find_user_for_login(Some("carol"), None).unwrap().is_none());
    }

    #[test]
    fn refresh_token_rotation_is_compare_and_swap() {
        let (db, _dir) = open_tmp();
        let id = seed_user(&db, "dave");

        db.set_refresh_token(&id, Some("first")).unwrap();
        assert!(db.rotate_refresh_token(&id, "first", "second").unwrap());
        // The old token cannot be used twice.
        assert!(!db.rotate_refresh_token(&id, "first", "third").unwrap());

        let user = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(user.refresh_token.as_deref(), Some("second"));

        db.set_refresh_token(&id, None).unwrap();
        assert!(!db.rotate_refresh_token(&id, "second", "fourth").unwrap());
    }

    #[test]
    fn account_update_keeps_unset_fields() {
        let (db, _dir) = open_tmp();
        let id = seed_user(&db, "erin");

        let AccountUpdate::Updated(user) = db.update_account(&id, Some("Erin Example"), None).unwrap()
        else {
            panic!("expected the account to be updated");
        };
        assert_eq!(user.full_name, "Erin Example");
        assert_eq!(user.email, "erin@example.com");
    }

    #[test]
    fn account_update_rejects_an_email_held_by_someone_else() {
        let (db, _dir) = open_tmp();
        let id = seed_user(&db, "gina");
        seed_user(&db, "hank");

        assert!(matches!(
            db.update_account(&id, Some("Gina"), Some("hank@example.com")).unwrap(),
            AccountUpdate::EmailTaken
        ));
        let user = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(user.full_name, "Test User");

        // Re-submitting your own email is not a conflict.
        assert!(matches!(
            db.update_account(&id, None, Some("gina@example.com")).unwrap(),
            AccountUpdate::Updated(_)
        ));
        assert!(matches!(
            db.update_account("missing", Some("x"), None).unwrap(),
            AccountUpdate::UserMissing
        ));
    }

    #[test]
    fn channel_counts_only_published_videos() {
        let (db, _dir) = open_tmp();
        let id = seed_user(&db, "frank");
        seed_video(&db, &id, "one");
        let hidden = seed_video(&db, &id, "two");
        db.set_publish_status(&hidden, &id, Some(false)).unwrap();

        let channel = db.get_channel("frank").unwrap().unwrap();
        assert_eq!(channel.video_count, 1);
        assert!(db.get_channel("nobody").unwrap().is_none());
    }
}
