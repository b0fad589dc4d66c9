use super::StreamingRecord;

/// Minimum playback duration for a stream to count, matching Spotify's own
/// 30-second royalty threshold with a small tolerance.
const MIN_QUALITY_STREAM_MS: u64 = 28_000;

/// The whole "quality stream" business rule: real music (track and artist
/// both known) played for at least [`MIN_QUALITY_STREAM_MS`].
///
/// Pure and total; records with absent or empty metadata simply evaluate to
/// `false`.
pub fn is_quality_music_stream(record: &StreamingRecord) -> bool {
    let has_value = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.is_empty());

    has_value(&record.master_metadata_track_name)
        && has_value(&record.master_metadata_album_artist_name)
        && record.ms_played >= MIN_QUALITY_STREAM_MS
}
