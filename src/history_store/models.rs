use serde::Serialize;

/// One upload's persisted grouping of accepted records.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadBatch {
    /// Generated batch id (UUID v4).
    pub id: String,
    #[serde(skip_serializing)]
    pub user_id: usize,
    pub filename: String,
    /// Unix seconds.
    pub uploaded_at: i64,
    /// Snapshot of the number of records inserted with this batch id.
    pub record_count: usize,
    /// Original archive size in bytes.
    pub file_size: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeletedCounts {
    pub records: usize,
    pub uploads: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistStats {
    pub artist: String,
    /// Total milliseconds played.
    pub total_play_time: i64,
    pub play_count: i64,
    pub total_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumStats {
    pub album: String,
    pub artist: String,
    pub total_play_time: i64,
    pub play_count: i64,
    pub total_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStats {
    pub track: String,
    pub artist: String,
    pub total_play_time: i64,
    pub play_count: i64,
    pub total_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListeningSummary {
    pub total_tracks: i64,
    pub total_hours: f64,
    pub total_days: f64,
    pub unique_artists: i64,
    pub unique_albums: i64,
    pub time_span_years: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyActivity {
    /// First day of the month, `YYYY-MM-01`.
    pub date: String,
    pub stream_count: i64,
    pub total_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPattern {
    /// 1 = Sunday .. 7 = Saturday.
    pub day_of_week: u32,
    /// 0..23.
    pub hour: u32,
    pub stream_count: i64,
    /// Average minutes listened in this bucket.
    pub avg_listening: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistDistribution {
    pub artist: String,
    pub total_hours: f64,
    pub stream_count: i64,
}
