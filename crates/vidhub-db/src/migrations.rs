use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                username        TEXT NOT NULL UNIQUE,
                email           TEXT NOT NULL UNIQUE,
                full_name       TEXT NOT NULL,
                avatar          TEXT NOT NULL,
                cover_image     TEXT NOT NULL DEFAULT '',
                password        TEXT NOT NULL,
                refresh_token   TEXT,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE videos (
                id              TEXT PRIMARY KEY,
                owner_id        TEXT NOT NULL REFERENCES users(id),
                title           TEXT NOT NULL,
                description     TEXT NOT NULL,
                video_file      TEXT NOT NULL,
                thumbnail       TEXT NOT NULL,
                duration        REAL NOT NULL DEFAULT 0,
                views           INTEGER NOT NULL DEFAULT 0,
                is_published    INTEGER NOT NULL DEFAULT 1,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_videos_owner ON videos(owner_id);

            CREATE TABLE watch_history (
                user_id         TEXT NOT NULL REFERENCES users(id),
                video_id        TEXT NOT NULL REFERENCES videos(id),
                watched_at      TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (user_id, video_id)
            );

            CREATE TABLE tweets (
                id              TEXT PRIMARY KEY,
                owner_id        TEXT NOT NULL REFERENCES users(id),
                content         TEXT NOT NULL,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE comments (
                id              TEXT PRIMARY KEY,
                video_id        TEXT NOT NULL REFERENCES videos(id),
                owner_id        TEXT NOT NULL REFERENCES users(id),
                content         TEXT NOT NULL,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_comments_video ON comments(video_id, created_at);

            -- A like points at exactly one target; target_kind picks the table.
            CREATE TABLE likes (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id),
                target_kind     TEXT NOT NULL CHECK (target_kind IN ('video', 'tweet', 'comment')),
                target_id       TEXT NOT NULL,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(user_id, target_kind, target_id)
            );

            CREATE INDEX idx_likes_target ON likes(target_kind, target_id);

            CREATE TABLE playlists (
                id              TEXT PRIMARY KEY,
                owner_id        TEXT NOT NULL REFERENCES users(id),
                name            TEXT NOT NULL,
                description     TEXT NOT NULL DEFAULT '',
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_playlists_owner ON playlists(owner_id);

            CREATE TABLE playlist_videos (
                playlist_id     TEXT NOT NULL REFERENCES playlists(id) ON DELETE CASCADE,
                video_id        TEXT NOT NULL REFERENCES videos(id),
                position        INTEGER NOT NULL,
                PRIMARY KEY (playlist_id, video_id)
            );

            CREATE INDEX idx_playlist_videos_order ON playlist_videos(playlist_id, position);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
