//! Test fixture creation: user database and in-memory ZIP archives.

use super::constants::*;
use anyhow::Result;
use serde_json::{json, Value};
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::Arc;
use streamlyze_server::user::{SqliteUserStore, UserManager};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Creates a temporary user database with two test users.
pub fn create_test_db_with_users() -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("user.db");

    {
        let store = Arc::new(SqliteUserStore::new(&db_path)?);
        let manager = UserManager::new(store);

        let user_id = manager.register_user(TEST_USER, TEST_PASS)?;
        eprintln!("Created test user {} with id {}", TEST_USER, user_id);

        let other_id = manager.register_user(OTHER_USER, OTHER_PASS)?;
        eprintln!("Created test user {} with id {}", OTHER_USER, other_id);
    }

    Ok((temp_dir, db_path))
}

/// Builds a ZIP archive in memory from (path, content) pairs.
pub fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (path, content) in entries {
        writer
            .start_file(*path, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A music playback record as found in the export.
pub fn music_record(ts: &str, track: &str, artist: &str, album: &str, ms_played: u64) -> Value {
    json!({
        "ts": ts,
        "platform": "ios",
        "ms_played": ms_played,
        "conn_country": "DE",
        "master_metadata_track_name": track,
        "master_metadata_album_artist_name": artist,
        "master_metadata_album_album_name": album,
        "spotify_track_uri": "spotify:track:000000000000000000000000",
        "episode_name": null,
        "episode_show_name": null,
        "reason_start": "clickrow",
        "reason_end": "trackdone",
        "shuffle": false,
        "skipped": false,
        "offline": false,
        "incognito_mode": false,
    })
}

/// A podcast playback record: no music metadata, episode fields set.
pub fn podcast_record(ts: &str, episode: &str, show: &str, ms_played: u64) -> Value {
    json!({
        "ts": ts,
        "platform": "android",
        "ms_played": ms_played,
        "master_metadata_track_name": null,
        "master_metadata_album_artist_name": null,
        "episode_name": episode,
        "episode_show_name": show,
        "shuffle": false,
        "skipped": false,
    })
}

/// Serializes records into the JSON text of one history file.
pub fn records_json(records: &[Value]) -> String {
    serde_json::to_string(&records).unwrap()
}
