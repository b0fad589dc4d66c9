use super::{is_quality_music_stream, validate_records, ArchiveScanner, StreamingRecord};
use thiserror::Error;
use tracing::debug;

/// Why an upload was rejected. Every variant maps to a client-input failure;
/// the message texts are shown to the user as-is.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Uploaded file is not a valid ZIP archive")]
    MalformedArchive,

    #[error("No streaming history JSON files found in the ZIP archive")]
    NoQualifyingFiles,

    #[error("Invalid JSON format in file: {file}")]
    InvalidJson { file: String },

    #[error("Invalid streaming history format in file: {file} ({detail})")]
    InvalidSchema { file: String, detail: String },
}

/// Outcome of a successful ingestion run.
#[derive(Debug)]
pub struct IngestSummary {
    /// Number of candidate files found in the archive.
    pub files_scanned: usize,
    /// Quality music streams, in archive order.
    pub records: Vec<StreamingRecord>,
}

/// Runs the full ingestion over an archive buffer: scan for candidate files,
/// decode and validate each one, keep the quality music streams.
///
/// A left-fold with short-circuit semantics: the first malformed file
/// anywhere in the archive aborts the whole run. There is no best-effort
/// mode, so a failed upload never yields partial results.
pub fn ingest_archive(bytes: Vec<u8>) -> Result<IngestSummary, IngestError> {
    let mut scanner = ArchiveScanner::open(bytes).map_err(|err| {
        debug!("Failed to open uploaded archive: {}", err);
        IngestError::MalformedArchive
    })?;

    let candidates = scanner.candidates().map_err(|err| {
        debug!("Failed to enumerate archive entries: {}", err);
        IngestError::MalformedArchive
    })?;

    if candidates.is_empty() {
        return Err(IngestError::NoQualifyingFiles);
    }

    let files_scanned = candidates.len();
    let mut records = Vec::new();

    for candidate in &candidates {
        let text = scanner.read_entry(candidate).map_err(|err| {
            debug!("Failed to decode {}: {}", candidate.path, err);
            IngestError::MalformedArchive
        })?;

        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|_| IngestError::InvalidJson {
                file: candidate.path.clone(),
            })?;

        let validated = validate_records(&value).map_err(|err| IngestError::InvalidSchema {
            file: candidate.path.clone(),
            detail: err.to_string(),
        })?;

        let total = validated.len();
        records.extend(validated.into_iter().filter(is_quality_music_stream));
        debug!(
            "{}: {} records validated, {} quality so far",
            candidate.path,
            total,
            records.len()
        );
    }

    Ok(IngestSummary {
        files_scanned,
        records,
    })
}
