use super::StreamingRecord;
use serde_json::Value;
use thiserror::Error;

/// Errors produced while validating the decoded content of one candidate
/// JSON file.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("expected a JSON array of streaming records")]
    NotAnArray,

    #[error("record at index {index} does not match the streaming record schema: {detail}")]
    InvalidRecord { index: usize, detail: String },

    #[error("record at index {index} has neither music nor podcast metadata")]
    UnrecognizedRecordShape { index: usize },
}

/// Validates a full decoded JSON value as an array of streaming records.
///
/// One structurally invalid element fails the whole array: the source export
/// is machine-written, so a single malformed record means the file is not a
/// streaming history file at all.
pub fn validate_records(value: &Value) -> Result<Vec<StreamingRecord>, ValidationError> {
    let elements = value.as_array().ok_or(ValidationError::NotAnArray)?;

    let mut records = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        let record: StreamingRecord = serde_json::from_value(element.clone())
            .map_err(|err| ValidationError::InvalidRecord {
                index,
                detail: err.to_string(),
            })?;

        if !record.has_music_metadata() && !record.has_podcast_metadata() {
            return Err(ValidationError::UnrecognizedRecordShape { index });
        }

        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn music_record(ms_played: u64) -> Value {
        json!({
            "ts": "2023-06-15T08:21:00Z",
            "platform": "ios",
            "ms_played": ms_played,
            "master_metadata_track_name": "Paranoid",
            "master_metadata_album_artist_name": "Black Sabbath",
            "master_metadata_album_album_name": "Paranoid",
            "shuffle": false,
            "skipped": false,
        })
    }

    #[test]
    fn rejects_non_array_top_level() {
        assert!(matches!(
            validate_records(&json!({"ts": "2023-06-15T08:21:00Z"})),
            Err(ValidationError::NotAnArray)
        ));
        assert!(matches!(
            validate_records(&json!("not even an object")),
            Err(ValidationError::NotAnArray)
        ));
    }

    #[test]
    fn empty_array_is_valid() {
        assert!(validate_records(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn returns_every_validated_record() {
        let records =
            validate_records(&json!([music_record(1000), music_record(50000)])).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].ms_played, 50000);
    }

    #[test]
    fn podcast_records_are_valid() {
        let records = validate_records(&json!([{
            "ts": "2023-06-15T08:21:00Z",
            "ms_played": 900000,
            "episode_name": "Episode 42",
            "episode_show_name": "Some Show",
        }]))
        .unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].has_podcast_metadata());
    }

    #[test]
    fn one_invalid_element_fails_the_whole_array() {
        let result = validate_records(&json!([
            music_record(1000),
            {"ts": "2023-06-15T08:21:00Z", "ms_played": "not a number", "episode_name": "x"},
            music_record(2000),
        ]));

        match result {
            Err(ValidationError::InvalidRecord { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected InvalidRecord, got {:?}", other),
        }
    }

    #[test]
    fn record_without_music_or_podcast_metadata_is_unrecognized() {
        let result = validate_records(&json!([{
            "ts": "2023-06-15T08:21:00Z",
            "ms_played": 1000,
            "platform": "android",
        }]));

        assert!(matches!(
            result,
            Err(ValidationError::UnrecognizedRecordShape { index: 0 })
        ));
    }
}
