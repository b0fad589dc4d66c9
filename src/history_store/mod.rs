//! Persistence for uploaded streaming history: upload batches, their
//! accepted records, and the aggregate listening statistics served to the
//! dashboard.

mod models;
mod schema;
mod sqlite_history_store;

pub use models::*;
pub use schema::HISTORY_VERSIONED_SCHEMAS;
pub use sqlite_history_store::SqliteHistoryStore;

use crate::ingest::StreamingRecord;
use anyhow::Result;

pub trait HistoryStore: Send + Sync {
    /// Persists an upload batch. `batch.record_count` is a snapshot of the
    /// records inserted with the batch id, taken at creation.
    fn insert_upload(&self, batch: &UploadBatch) -> Result<()>;

    /// Persists all accepted records of one upload in a single transaction,
    /// each stamped with the owning user and the batch id. Returns the
    /// number of records inserted.
    fn insert_records(
        &self,
        user_id: usize,
        upload_id: &str,
        records: &[StreamingRecord],
    ) -> Result<usize>;

    /// Lists a user's upload batches, most recent first.
    fn get_user_uploads(&self, user_id: usize) -> Result<Vec<UploadBatch>>;

    /// Deletes every streaming record and upload batch owned by the user.
    fn delete_user_data(&self, user_id: usize) -> Result<DeletedCounts>;

    // Aggregate statistics, all scoped to one user.

    fn get_top_artists(&self, user_id: usize, limit: usize) -> Result<Vec<ArtistStats>>;
    fn get_top_albums(&self, user_id: usize, limit: usize) -> Result<Vec<AlbumStats>>;
    fn get_top_tracks(&self, user_id: usize, limit: usize) -> Result<Vec<TrackStats>>;

    /// Overall listening summary. `None` when the user has no records.
    fn get_listening_summary(&self, user_id: usize) -> Result<Option<ListeningSummary>>;

    /// Stream counts and hours per calendar month, ascending.
    fn get_monthly_activity(&self, user_id: usize) -> Result<Vec<MonthlyActivity>>;

    /// Stream counts and average minutes per (day-of-week, hour) bucket.
    fn get_daily_patterns(&self, user_id: usize) -> Result<Vec<DailyPattern>>;

    /// Top artists by listening hours, for the distribution chart.
    fn get_artist_distribution(
        &self,
        user_id: usize,
        limit: usize,
    ) -> Result<Vec<ArtistDistribution>>;
}
