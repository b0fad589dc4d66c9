use anyhow::{Context, Result};
use std::io::{Cursor, Read};
use zip::result::ZipError;
use zip::ZipArchive;

/// A ZIP archive member selected by the filename heuristic as likely
/// containing streaming-history JSON. Content stays compressed until
/// [`ArchiveScanner::read_entry`] is called.
#[derive(Debug, Clone)]
pub struct CandidateEntry {
    pub path: String,
    index: usize,
}

/// Scans an in-memory ZIP buffer for streaming-history JSON entries.
///
/// Exports bundle the "Audio" history files together with PDFs and account
/// data in one archive; only entries whose path ends with `.json` and
/// contains `audio` (both case-insensitive) are relevant.
pub struct ArchiveScanner {
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

fn is_streaming_history_entry(path: &str) -> bool {
    let lower = path.to_lowercase();
    lower.ends_with(".json") && lower.contains("audio")
}

impl ArchiveScanner {
    /// Fails when the buffer is not a valid ZIP archive.
    pub fn open(bytes: Vec<u8>) -> Result<Self, ZipError> {
        Ok(Self {
            archive: ZipArchive::new(Cursor::new(bytes))?,
        })
    }

    /// Selects candidate entries, in archive order. Only entry metadata is
    /// touched here; nothing is decompressed.
    pub fn candidates(&mut self) -> Result<Vec<CandidateEntry>> {
        let mut selected = Vec::new();
        for index in 0..self.archive.len() {
            let entry = self
                .archive
                .by_index(index)
                .with_context(|| format!("Failed to read archive entry {}", index))?;

            if entry.is_dir() {
                continue;
            }

            let path = entry.name().to_string();
            if is_streaming_history_entry(&path) {
                selected.push(CandidateEntry { path, index });
            }
        }
        Ok(selected)
    }

    /// Decompresses one candidate's content as text.
    pub fn read_entry(&mut self, candidate: &CandidateEntry) -> Result<String> {
        let mut entry = self
            .archive
            .by_index(candidate.index)
            .with_context(|| format!("Failed to open archive entry {}", candidate.path))?;

        let mut text = String::new();
        entry
            .read_to_string(&mut text)
            .with_context(|| format!("Failed to decode archive entry {}", candidate.path))?;
        Ok(text)
    }
}
