//! Streaming-history ingestion: archive scanning, schema validation,
//! quality filtering and the pipeline tying them together.

mod archive;
mod filter;
mod pipeline;
mod record;
mod validate;

pub use archive::{ArchiveScanner, CandidateEntry};
pub use filter::is_quality_music_stream;
pub use pipeline::{ingest_archive, IngestError, IngestSummary};
pub use record::StreamingRecord;
pub use validate::{validate_records, ValidationError};
