use super::models::*;
use super::schema::HISTORY_VERSIONED_SCHEMAS;
use super::HistoryStore;
use crate::ingest::StreamingRecord;
use crate::sqlite_persistence::open_versioned_db;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Milliseconds in an average Julian year, for the time-span figure.
const MS_PER_YEAR: f64 = 31_557_600_000.0;

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn ms_to_hours(ms: i64) -> f64 {
    round1(ms as f64 / 3_600_000.0)
}

#[derive(Clone)]
pub struct SqliteHistoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHistoryStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned_db(db_path.as_ref(), HISTORY_VERSIONED_SCHEMAS)
            .context("Failed to open history database")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn insert_upload(&self, batch: &UploadBatch) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO upload (id, user_id, filename, record_count, file_size, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                batch.id,
                batch.user_id,
                batch.filename,
                batch.record_count,
                batch.file_size,
                batch.uploaded_at,
            ],
        )
        .with_context(|| format!("Failed to insert upload {}", batch.id))?;
        Ok(())
    }

    fn insert_records(
        &self,
        user_id: usize,
        upload_id: &str,
        records: &[StreamingRecord],
    ) -> Result<usize> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO streaming_record (
                    user_id, upload_id, ts, platform, ms_played, conn_country, ip_addr,
                    track_name, artist_name, album_name, spotify_track_uri,
                    episode_name, episode_show_name, spotify_episode_uri,
                    audiobook_title, audiobook_uri, audiobook_chapter_uri,
                    audiobook_chapter_title, reason_start, reason_end,
                    shuffle, skipped, offline, offline_timestamp, incognito_mode
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                    ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25
                )",
            )?;
            for record in records {
                stmt.execute(params![
                    user_id,
                    upload_id,
                    record.ts,
                    record.platform,
                    record.ms_played,
                    record.conn_country,
                    record.ip_addr,
                    record.master_metadata_track_name,
                    record.master_metadata_album_artist_name,
                    record.master_metadata_album_album_name,
                    record.spotify_track_uri,
                    record.episode_name,
                    record.episode_show_name,
                    record.spotify_episode_uri,
                    record.audiobook_title,
                    record.audiobook_uri,
                    record.audiobook_chapter_uri,
                    record.audiobook_chapter_title,
                    record.reason_start,
                    record.reason_end,
                    record.shuffle,
                    record.skipped,
                    record.offline,
                    record.offline_timestamp,
                    record.incognito_mode,
                ])?;
            }
        }
        tx.commit()
            .with_context(|| format!("Failed to commit records for upload {}", upload_id))?;

        debug!(
            "Inserted {} records for user {} upload {}",
            records.len(),
            user_id,
            upload_id
        );
        Ok(records.len())
    }

    fn get_user_uploads(&self, user_id: usize) -> Result<Vec<UploadBatch>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, filename, record_count, file_size, uploaded_at
             FROM upload WHERE user_id = ?1 ORDER BY uploaded_at DESC",
        )?;
        let uploads = stmt
            .query_map(params![user_id], |row| {
                Ok(UploadBatch {
                    id: row.get(0)?,
                    user_id,
                    filename: row.get(1)?,
                    record_count: row.get(2)?,
                    file_size: row.get(3)?,
                    uploaded_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(uploads)
    }

    fn delete_user_data(&self, user_id: usize) -> Result<DeletedCounts> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let records = tx.execute(
            "DELETE FROM streaming_record WHERE user_id = ?1",
            params![user_id],
        )?;
        let uploads = tx.execute("DELETE FROM upload WHERE user_id = ?1", params![user_id])?;
        tx.commit()?;
        Ok(DeletedCounts { records, uploads })
    }

    fn get_top_artists(&self, user_id: usize, limit: usize) -> Result<Vec<ArtistStats>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT artist_name, SUM(ms_played) AS total_play_time, COUNT(*) AS play_count
             FROM streaming_record
             WHERE user_id = ?1 AND artist_name IS NOT NULL
             GROUP BY artist_name
             ORDER BY total_play_time DESC
             LIMIT ?2",
        )?;
        let stats = stmt
            .query_map(params![user_id, limit], |row| {
                let total_play_time: i64 = row.get(1)?;
                Ok(ArtistStats {
                    artist: row.get(0)?,
                    total_play_time,
                    play_count: row.get(2)?,
                    total_hours: ms_to_hours(total_play_time),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stats)
    }

    fn get_top_albums(&self, user_id: usize, limit: usize) -> Result<Vec<AlbumStats>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT album_name, artist_name, SUM(ms_played) AS total_play_time,
                    COUNT(*) AS play_count
             FROM streaming_record
             WHERE user_id = ?1 AND album_name IS NOT NULL
             GROUP BY album_name, artist_name
             ORDER BY total_play_time DESC
             LIMIT ?2",
        )?;
        let stats = stmt
            .query_map(params![user_id, limit], |row| {
                let total_play_time: i64 = row.get(2)?;
                Ok(AlbumStats {
                    album: row.get(0)?,
                    artist: row.get(1)?,
                    total_play_time,
                    play_count: row.get(3)?,
                    total_hours: ms_to_hours(total_play_time),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stats)
    }

    fn get_top_tracks(&self, user_id: usize, limit: usize) -> Result<Vec<TrackStats>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT track_name, artist_name, SUM(ms_played) AS total_play_time,
                    COUNT(*) AS play_count
             FROM streaming_record
             WHERE user_id = ?1 AND track_name IS NOT NULL
             GROUP BY track_name, artist_name
             ORDER BY total_play_time DESC
             LIMIT ?2",
        )?;
        let stats = stmt
            .query_map(params![user_id, limit], |row| {
                let total_play_time: i64 = row.get(2)?;
                Ok(TrackStats {
                    track: row.get(0)?,
                    artist: row.get(1)?,
                    total_play_time,
                    play_count: row.get(3)?,
                    total_hours: ms_to_hours(total_play_time),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stats)
    }

    fn get_listening_summary(&self, user_id: usize) -> Result<Option<ListeningSummary>> {
        let conn = self.conn.lock().unwrap();
        let row = conn.query_row(
            "SELECT COUNT(*), SUM(ms_played),
                    COUNT(DISTINCT artist_name), COUNT(DISTINCT album_name),
                    MIN(ts), MAX(ts)
             FROM streaming_record WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            },
        )?;

        let (total_tracks, total_ms, unique_artists, unique_albums, earliest, latest) = row;
        if total_tracks == 0 {
            return Ok(None);
        }
        let total_ms = total_ms.unwrap_or(0);

        let time_span_years = match (earliest, latest) {
            (Some(earliest), Some(latest)) => {
                let earliest = chrono::DateTime::parse_from_rfc3339(&earliest);
                let latest = chrono::DateTime::parse_from_rfc3339(&latest);
                match (earliest, latest) {
                    (Ok(earliest), Ok(latest)) => {
                        let span_ms = (latest - earliest).num_milliseconds() as f64;
                        round1(span_ms / MS_PER_YEAR)
                    }
                    _ => 0.0,
                }
            }
            _ => 0.0,
        };

        Ok(Some(ListeningSummary {
            total_tracks,
            total_hours: ms_to_hours(total_ms),
            total_days: round1(total_ms as f64 / 86_400_000.0),
            unique_artists,
            unique_albums,
            time_span_years,
        }))
    }

    fn get_monthly_activity(&self, user_id: usize) -> Result<Vec<MonthlyActivity>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT strftime('%Y-%m', ts) AS month, COUNT(*), SUM(ms_played)
             FROM streaming_record
             WHERE user_id = ?1
             GROUP BY month
             ORDER BY month ASC",
        )?;
        let activity = stmt
            .query_map(params![user_id], |row| {
                let month: String = row.get(0)?;
                let total_ms: i64 = row.get(2)?;
                Ok(MonthlyActivity {
                    date: format!("{}-01", month),
                    stream_count: row.get(1)?,
                    total_hours: ms_to_hours(total_ms),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(activity)
    }

    fn get_daily_patterns(&self, user_id: usize) -> Result<Vec<DailyPattern>> {
        let conn = self.conn.lock().unwrap();
        // 1 = Sunday .. 7 = Saturday, hence the +1 on SQLite's %w (0 = Sunday).
        let mut stmt = conn.prepare(
            "SELECT CAST(strftime('%w', ts) AS INTEGER) + 1 AS day_of_week,
                    CAST(strftime('%H', ts) AS INTEGER) AS hour,
                    COUNT(*), AVG(ms_played)
             FROM streaming_record
             WHERE user_id = ?1
             GROUP BY day_of_week, hour
             ORDER BY day_of_week, hour",
        )?;
        let patterns = stmt
            .query_map(params![user_id], |row| {
                let avg_ms: f64 = row.get(3)?;
                Ok(DailyPattern {
                    day_of_week: row.get(0)?,
                    hour: row.get(1)?,
                    stream_count: row.get(2)?,
                    avg_listening: round1(avg_ms / 60_000.0),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(patterns)
    }

    fn get_artist_distribution(
        &self,
        user_id: usize,
        limit: usize,
    ) -> Result<Vec<ArtistDistribution>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT artist_name, SUM(ms_played) AS total_play_time, COUNT(*) AS stream_count
             FROM streaming_record
             WHERE user_id = ?1 AND artist_name IS NOT NULL
             GROUP BY artist_name
             ORDER BY total_play_time DESC
             LIMIT ?2",
        )?;
        let distribution = stmt
            .query_map(params![user_id, limit], |row| {
                let total_play_time: i64 = row.get(1)?;
                Ok(ArtistDistribution {
                    artist: row.get(0)?,
                    total_hours: ms_to_hours(total_play_time),
                    stream_count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(distribution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_store() -> (TempDir, SqliteHistoryStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteHistoryStore::new(dir.path().join("history.db")).unwrap();
        (dir, store)
    }

    fn music_record(ts: &str, track: &str, artist: &str, album: &str, ms: u64) -> StreamingRecord {
        StreamingRecord {
            ts: ts.to_string(),
            platform: Some("ios".to_string()),
            ms_played: ms,
            conn_country: Some("DE".to_string()),
            ip_addr: None,
            master_metadata_track_name: Some(track.to_string()),
            master_metadata_album_artist_name: Some(artist.to_string()),
            master_metadata_album_album_name: Some(album.to_string()),
            spotify_track_uri: None,
            episode_name: None,
            episode_show_name: None,
            spotify_episode_uri: None,
            audiobook_title: None,
            audiobook_uri: None,
            audiobook_chapter_uri: None,
            audiobook_chapter_title: None,
            reason_start: Some("clickrow".to_string()),
            reason_end: Some("trackdone".to_string()),
            shuffle: Some(false),
            skipped: Some(false),
            offline: Some(false),
            offline_timestamp: None,
            incognito_mode: Some(false),
        }
    }

    fn batch(id: &str, user_id: usize, record_count: usize) -> UploadBatch {
        UploadBatch {
            id: id.to_string(),
            user_id,
            filename: "my_spotify_data.zip".to_string(),
            uploaded_at: 1_700_000_000,
            record_count,
            file_size: 1024,
        }
    }

    #[test]
    fn insert_and_list_uploads() {
        let (_dir, store) = make_store();

        store.insert_upload(&batch("upload-1", 1, 2)).unwrap();
        store.insert_upload(&batch("upload-2", 1, 0)).unwrap();
        store.insert_upload(&batch("upload-3", 2, 5)).unwrap();

        let uploads = store.get_user_uploads(1).unwrap();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].filename, "my_spotify_data.zip");

        assert_eq!(store.get_user_uploads(2).unwrap().len(), 1);
        assert!(store.get_user_uploads(3).unwrap().is_empty());
    }

    #[test]
    fn duplicate_upload_id_is_rejected() {
        let (_dir, store) = make_store();
        store.insert_upload(&batch("upload-1", 1, 0)).unwrap();
        assert!(store.insert_upload(&batch("upload-1", 2, 0)).is_err());
    }

    #[test]
    fn insert_records_and_delete_user_data() {
        let (_dir, store) = make_store();
        store.insert_upload(&batch("upload-1", 1, 5)).unwrap();

        let records: Vec<StreamingRecord> = (0..5)
            .map(|i| {
                music_record(
                    "2023-06-15T08:21:00Z",
                    &format!("Track {}", i),
                    "Artist",
                    "Album",
                    30_000,
                )
            })
            .collect();
        let inserted = store.insert_records(1, "upload-1", &records).unwrap();
        assert_eq!(inserted, 5);

        // Another user's data must be untouched by the delete.
        store.insert_upload(&batch("upload-2", 2, 1)).unwrap();
        store
            .insert_records(
                2,
                "upload-2",
                &[music_record("2023-06-15T08:21:00Z", "T", "A", "B", 30_000)],
            )
            .unwrap();

        let deleted = store.delete_user_data(1).unwrap();
        assert_eq!(deleted.records, 5);
        assert_eq!(deleted.uploads, 1);

        assert!(store.get_listening_summary(1).unwrap().is_none());
        assert!(store.get_listening_summary(2).unwrap().is_some());
    }

    #[test]
    fn top_artists_ordered_by_play_time() {
        let (_dir, store) = make_store();
        store.insert_upload(&batch("upload-1", 1, 3)).unwrap();
        store
            .insert_records(
                1,
                "upload-1",
                &[
                    music_record("2023-06-15T08:00:00Z", "A", "Minor Artist", "X", 30_000),
                    music_record("2023-06-15T09:00:00Z", "B", "Major Artist", "Y", 3_600_000),
                    music_record("2023-06-15T10:00:00Z", "C", "Major Artist", "Y", 1_800_000),
                ],
            )
            .unwrap();

        let top = store.get_top_artists(1, 10).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].artist, "Major Artist");
        assert_eq!(top[0].play_count, 2);
        assert_eq!(top[0].total_play_time, 5_400_000);
        assert_eq!(top[0].total_hours, 1.5);
        assert_eq!(top[1].artist, "Minor Artist");

        let limited = store.get_top_artists(1, 1).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn top_tracks_group_by_track_and_artist() {
        let (_dir, store) = make_store();
        store.insert_upload(&batch("upload-1", 1, 3)).unwrap();
        store
            .insert_records(
                1,
                "upload-1",
                &[
                    music_record("2023-06-15T08:00:00Z", "Same Song", "Artist A", "X", 30_000),
                    music_record("2023-06-15T09:00:00Z", "Same Song", "Artist A", "X", 30_000),
                    music_record("2023-06-15T10:00:00Z", "Same Song", "Artist B", "Y", 30_000),
                ],
            )
            .unwrap();

        let top = store.get_top_tracks(1, 10).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].track, "Same Song");
        assert_eq!(top[0].artist, "Artist A");
        assert_eq!(top[0].play_count, 2);
    }

    #[test]
    fn summary_math() {
        let (_dir, store) = make_store();
        store.insert_upload(&batch("upload-1", 1, 2)).unwrap();
        store
            .insert_records(
                1,
                "upload-1",
                &[
                    music_record("2022-01-01T00:00:00Z", "A", "Artist 1", "Album 1", 3_600_000),
                    music_record("2023-01-01T00:00:00Z", "B", "Artist 2", "Album 1", 3_600_000),
                ],
            )
            .unwrap();

        let summary = store.get_listening_summary(1).unwrap().unwrap();
        assert_eq!(summary.total_tracks, 2);
        assert_eq!(summary.total_hours, 2.0);
        assert_eq!(summary.unique_artists, 2);
        assert_eq!(summary.unique_albums, 1);
        assert_eq!(summary.time_span_years, 1.0);
    }

    #[test]
    fn monthly_activity_grouped_ascending() {
        let (_dir, store) = make_store();
        store.insert_upload(&batch("upload-1", 1, 3)).unwrap();
        store
            .insert_records(
                1,
                "upload-1",
                &[
                    music_record("2023-02-10T08:00:00Z", "A", "Artist", "X", 1_800_000),
                    music_record("2023-01-05T08:00:00Z", "B", "Artist", "X", 3_600_000),
                    music_record("2023-02-20T08:00:00Z", "C", "Artist", "X", 1_800_000),
                ],
            )
            .unwrap();

        let months = store.get_monthly_activity(1).unwrap();
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].date, "2023-01-01");
        assert_eq!(months[0].stream_count, 1);
        assert_eq!(months[0].total_hours, 1.0);
        assert_eq!(months[1].date, "2023-02-01");
        assert_eq!(months[1].stream_count, 2);
    }

    #[test]
    fn daily_patterns_use_sunday_first_numbering() {
        let (_dir, store) = make_store();
        store.insert_upload(&batch("upload-1", 1, 2)).unwrap();
        store
            .insert_records(
                1,
                "upload-1",
                &[
                    // 2023-06-18 was a Sunday.
                    music_record("2023-06-18T14:30:00Z", "A", "Artist", "X", 60_000),
                    music_record("2023-06-18T14:45:00Z", "B", "Artist", "X", 120_000),
                ],
            )
            .unwrap();

        let patterns = store.get_daily_patterns(1).unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].day_of_week, 1);
        assert_eq!(patterns[0].hour, 14);
        assert_eq!(patterns[0].stream_count, 2);
        assert_eq!(patterns[0].avg_listening, 1.5);
    }

    #[test]
    fn artist_distribution_respects_limit() {
        let (_dir, store) = make_store();
        store.insert_upload(&batch("upload-1", 1, 10)).unwrap();
        let records: Vec<StreamingRecord> = (0..10u64)
            .map(|i| {
                music_record(
                    "2023-06-15T08:00:00Z",
                    "T",
                    &format!("Artist {}", i),
                    "X",
                    30_000 + i * 1000,
                )
            })
            .collect();
        store.insert_records(1, "upload-1", &records).unwrap();

        let distribution = store.get_artist_distribution(1, 8).unwrap();
        assert_eq!(distribution.len(), 8);
        assert_eq!(distribution[0].artist, "Artist 9");
    }
}
