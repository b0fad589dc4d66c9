use crate::sql_column;
use crate::sqlite_persistence::{SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};

/// V 0
///
/// `streaming_record.upload_id` and `user_id` are weak references: deleting
/// an upload does not cascade to its records, the delete-all operation
/// removes both explicitly.
const UPLOAD_TABLE_V_0: Table = Table {
    name: "upload",
    columns: &[
        sql_column!(
            "id",
            SqlType::Text,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sql_column!("user_id", SqlType::Integer, non_null = true),
        sql_column!("filename", SqlType::Text, non_null = true),
        sql_column!("record_count", SqlType::Integer, non_null = true),
        sql_column!("file_size", SqlType::Integer, non_null = true),
        sql_column!(
            "uploaded_at",
            SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_upload_user_id", "user_id")],
};

const STREAMING_RECORD_TABLE_V_0: Table = Table {
    name: "streaming_record",
    columns: &[
        sql_column!("id", SqlType::Integer, is_primary_key = true),
        sql_column!("user_id", SqlType::Integer, non_null = true),
        sql_column!("upload_id", SqlType::Text, non_null = true),
        sql_column!("ts", SqlType::Text, non_null = true),
        sql_column!("platform", SqlType::Text),
        sql_column!("ms_played", SqlType::Integer, non_null = true),
        sql_column!("conn_country", SqlType::Text),
        sql_column!("ip_addr", SqlType::Text),
        sql_column!("track_name", SqlType::Text),
        sql_column!("artist_name", SqlType::Text),
        sql_column!("album_name", SqlType::Text),
        sql_column!("spotify_track_uri", SqlType::Text),
        sql_column!("episode_name", SqlType::Text),
        sql_column!("episode_show_name", SqlType::Text),
        sql_column!("spotify_episode_uri", SqlType::Text),
        sql_column!("audiobook_title", SqlType::Text),
        sql_column!("audiobook_uri", SqlType::Text),
        sql_column!("audiobook_chapter_uri", SqlType::Text),
        sql_column!("audiobook_chapter_title", SqlType::Text),
        sql_column!("reason_start", SqlType::Text),
        sql_column!("reason_end", SqlType::Text),
        sql_column!("shuffle", SqlType::Integer),
        sql_column!("skipped", SqlType::Integer),
        sql_column!("offline", SqlType::Integer),
        sql_column!("offline_timestamp", SqlType::Integer),
        sql_column!("incognito_mode", SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[
        ("idx_streaming_record_user_id", "user_id"),
        ("idx_streaming_record_upload_id", "upload_id"),
        ("idx_streaming_record_artist_name", "artist_name"),
    ],
};

pub const HISTORY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[UPLOAD_TABLE_V_0, STREAMING_RECORD_TABLE_V_0],
    migration: None,
}];
