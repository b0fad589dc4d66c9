use serde::{Deserialize, Serialize};

/// One playback event as exported in Spotify's "Extended Streaming History".
///
/// Field names match the export format verbatim. Every optional field treats
/// JSON `null` and a missing key the same way: both decode to `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingRecord {
    /// ISO-8601 timestamp of the playback event.
    pub ts: String,
    #[serde(default)]
    pub platform: Option<String>,
    /// Milliseconds the stream was played for.
    pub ms_played: u64,
    #[serde(default)]
    pub conn_country: Option<String>,
    #[serde(default)]
    pub ip_addr: Option<String>,
    #[serde(default)]
    pub master_metadata_track_name: Option<String>,
    #[serde(default)]
    pub master_metadata_album_artist_name: Option<String>,
    #[serde(default)]
    pub master_metadata_album_album_name: Option<String>,
    #[serde(default)]
    pub spotify_track_uri: Option<String>,
    #[serde(default)]
    pub episode_name: Option<String>,
    #[serde(default)]
    pub episode_show_name: Option<String>,
    #[serde(default)]
    pub spotify_episode_uri: Option<String>,
    #[serde(default)]
    pub audiobook_title: Option<String>,
    #[serde(default)]
    pub audiobook_uri: Option<String>,
    #[serde(default)]
    pub audiobook_chapter_uri: Option<String>,
    #[serde(default)]
    pub audiobook_chapter_title: Option<String>,
    #[serde(default)]
    pub reason_start: Option<String>,
    #[serde(default)]
    pub reason_end: Option<String>,
    #[serde(default)]
    pub shuffle: Option<bool>,
    #[serde(default)]
    pub skipped: Option<bool>,
    #[serde(default)]
    pub offline: Option<bool>,
    #[serde(default)]
    pub offline_timestamp: Option<i64>,
    #[serde(default)]
    pub incognito_mode: Option<bool>,
}

impl StreamingRecord {
    /// True when the record carries any music-identifying metadata.
    pub fn has_music_metadata(&self) -> bool {
        self.master_metadata_track_name.is_some()
            || self.master_metadata_album_artist_name.is_some()
    }

    /// True when the record carries any podcast-identifying metadata.
    pub fn has_podcast_metadata(&self) -> bool {
        self.episode_name.is_some() || self.episode_show_name.is_some()
    }
}
