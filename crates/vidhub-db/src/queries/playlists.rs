use anyhow::Result;
use rusqlite::Connection;

use super::{OWNER_COLUMNS, OptionalExt, VIDEO_COLUMNS, begin_write, map_owner, map_video};
use crate::Database;
use crate::models::{
    MembershipOutcome, OwnedMutation, PlaylistRow, PlaylistSummaryRow, VideoRow,
};

impl Database {
    pub fn insert_playlist(
        &self,
        id: &str,
        owner_id: &str,
        name: &str,
        description: &str,
    ) -> Result<PlaylistRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO playlists (id, owner_id, name, description) VALUES (?1, ?2, ?3, ?4)",
                [id, owner_id, name, description],
            )?;
            query_playlist(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("playlist {} missing after insert", id))
        })
    }

    pub fn get_playlist(&self, id: &str) -> Result<Option<PlaylistRow>> {
        self.with_conn(|conn| query_playlist(conn, id))
    }

    /// Member videos resolved to full rows, in playlist order. Unpublished
    /// members are left out unless `viewer_id` owns them.
    pub fn get_playlist_videos(&self, playlist_id: &str, viewer_id: &str) -> Result<Vec<VideoRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {VIDEO_COLUMNS}
                 FROM playlist_videos pv
                 JOIN videos v ON v.id = pv.video_id
                 WHERE pv.playlist_id = ?1 AND (v.is_published = 1 OR v.owner_id = ?2)
                 ORDER BY pv.position ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([playlist_id, viewer_id], |row| map_video(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_user_playlists(&self, owner_id: &str) -> Result<Vec<PlaylistSummaryRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT p.id, p.name, p.description, {OWNER_COLUMNS},
                        (SELECT COUNT(*) FROM playlist_videos pv WHERE pv.playlist_id = p.id)
                 FROM playlists p
                 JOIN users u ON u.id = p.owner_id
                 WHERE p.owner_id = ?1
                 ORDER BY p.created_at ASC, p.rowid ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([owner_id], |row| {
                    Ok(PlaylistSummaryRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        owner: map_owner(row, 3)?,
                        video_count: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_playlist(
        &self,
        id: &str,
        actor_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<OwnedMutation<PlaylistRow>> {
        self.with_conn_mut(|conn| {
            let tx = begin_write(conn)?;
            match super::owner_of(&tx, "playlists", id)? {
                None => return Ok(OwnedMutation::Missing),
                Some(owner) if owner != actor_id => return Ok(OwnedMutation::NotOwner),
                Some(_) => {}
            }
            tx.execute(
                "UPDATE playlists
                 SET name = COALESCE(?2, name),
                     description = COALESCE(?3, description),
                     updated_at = datetime('now')
                 WHERE id = ?1",
                rusqlite::params![id, name, description],
            )?;
            let playlist = query_playlist(&tx, id)?
                .ok_or_else(|| anyhow::anyhow!("playlist {} vanished inside transaction", id))?;
            tx.commit()?;
            Ok(OwnedMutation::Done(playlist))
        })
    }

    pub fn delete_playlist(&self, id: &str, actor_id: &str) -> Result<OwnedMutation<()>> {
        self.with_conn_mut(|conn| {
            let tx = begin_write(conn)?;
            match super::owner_of(&tx, "playlists", id)? {
                None => return Ok(OwnedMutation::Missing),
                Some(owner) if owner != actor_id => return Ok(OwnedMutation::NotOwner),
                Some(_) => {}
            }
            // playlist_videos rows go with it (ON DELETE CASCADE)
            tx.execute("DELETE FROM playlists WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(OwnedMutation::Done(()))
        })
    }

    /// Appends a video to the end of a playlist owned by `actor_id`.
    pub fn add_playlist_video(
        &self,
        playlist_id: &str,
        video_id: &str,
        actor_id: &str,
    ) -> Result<MembershipOutcome> {
        self.with_conn_mut(|conn| {
            let tx = begin_write(conn)?;
            if let Some(rejected) =
                check_membership_guards(&tx, playlist_id, video_id, actor_id, VideoCheck::Visible)?
            {
                return Ok(rejected);
            }
            if is_member(&tx, playlist_id, video_id)? {
                return Ok(MembershipOutcome::AlreadyMember);
            }

            tx.execute(
                "INSERT INTO playlist_videos (playlist_id, video_id, position)
                 SELECT ?1, ?2, COALESCE(MAX(position) + 1, 0)
                 FROM playlist_videos WHERE playlist_id = ?1",
                [playlist_id, video_id],
            )?;
            touch_playlist(&tx, playlist_id)?;

            let playlist = query_playlist(&tx, playlist_id)?
                .ok_or_else(|| anyhow::anyhow!("playlist {} vanished inside transaction", playlist_id))?;
            tx.commit()?;
            Ok(MembershipOutcome::Updated(playlist))
        })
    }

    /// Removes a video from a playlist owned by `actor_id`. The remaining
    /// members keep their relative order.
    pub fn remove_playlist_video(
        &self,
        playlist_id: &str,
        video_id: &str,
        actor_id: &str,
    ) -> Result<MembershipOutcome> {
        self.with_conn_mut(|conn| {
            let tx = begin_write(conn)?;
            if let Some(rejected) =
                check_membership_guards(&tx, playlist_id, video_id, actor_id, VideoCheck::Exists)?
            {
                return Ok(rejected);
            }

            let removed = tx.execute(
                "DELETE FROM playlist_videos WHERE playlist_id = ?1 AND video_id = ?2",
                [playlist_id, video_id],
            )?;
            if removed == 0 {
                return Ok(MembershipOutcome::NotMember);
            }
            touch_playlist(&tx, playlist_id)?;

            let playlist = query_playlist(&tx, playlist_id)?
                .ok_or_else(|| anyhow::anyhow!("playlist {} vanished inside transaction", playlist_id))?;
            tx.commit()?;
            Ok(MembershipOutcome::Updated(playlist))
        })
    }
}

/// How the video side of a membership change is looked up. Adding needs a
/// video the actor can see; removing only needs the row, so a member that
/// was unpublished later can still be taken out.
enum VideoCheck {
    Visible,
    Exists,
}

/// Playlist exists, then video exists, then the actor owns the playlist.
fn check_membership_guards(
    conn: &Connection,
    playlist_id: &str,
    video_id: &str,
    actor_id: &str,
    video_check: VideoCheck,
) -> Result<Option<MembershipOutcome>> {
    let Some(owner) = super::owner_of(conn, "playlists", playlist_id)? else {
        return Ok(Some(MembershipOutcome::PlaylistMissing));
    };
    let video_found = match video_check {
        VideoCheck::Visible => super::video_visible(conn, video_id, actor_id)?,
        VideoCheck::Exists => super::exists(conn, "videos", video_id)?,
    };
    if !video_found {
        return Ok(Some(MembershipOutcome::VideoMissing));
    }
    if owner != actor_id {
        return Ok(Some(MembershipOutcome::NotOwner));
    }
    Ok(None)
}

fn is_member(conn: &Connection, playlist_id: &str, video_id: &str) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM playlist_videos WHERE playlist_id = ?1 AND video_id = ?2)",
        [playlist_id, video_id],
        |row| row.get(0),
    )?)
}

fn touch_playlist(conn: &Connection, playlist_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE playlists SET updated_at = datetime('now') WHERE id = ?1",
        [playlist_id],
    )?;
    Ok(())
}

fn query_playlist(conn: &Connection, id: &str) -> Result<Option<PlaylistRow>> {
    let playlist = conn
        .query_row(
            "SELECT id, owner_id, name, description, created_at, updated_at
             FROM playlists WHERE id = ?1",
            [id],
            |row| {
                Ok(PlaylistRow {
                    id: row.get(0)?,
                    owner_id: row.get(1)?,
                    name: row.get(2)?,
                    description: row.get(3)?,
                    video_ids: Vec::new(),
                    created_at: row.get(4)?,
                    updated_at: row.get(5)?,
                })
            },
        )
        .optional()?;

    let Some(mut playlist) = playlist else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT video_id FROM playlist_videos WHERE playlist_id = ?1 ORDER BY position ASC",
    )?;
    playlist.video_ids = stmt
        .query_map([id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    Ok(Some(playlist))
}
