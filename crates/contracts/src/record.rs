//! NormalizedRecord - RecordSource output
//!
//! One click event, fully coerced to its declared types.

use serde::{Deserialize, Serialize};

/// A single ingested click event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Sequence number within the source
    pub row_id: i64,

    /// Event timestamp (opaque text)
    pub timestamp: String,

    /// Watch duration in seconds
    pub duration_seconds: f64,

    /// Movie title
    pub title: String,

    /// Comma-joined genre list (not parsed)
    pub genres: String,

    /// Release date (opaque text)
    pub release_date: String,

    /// Movie identifier
    pub movie_id: String,

    /// User identifier
    pub user_id: String,
}

/// Borrowed view of one record field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Long(i64),
    Double(f64),
    String(&'a str),
}

impl NormalizedRecord {
    /// Look up a field by its schema name
    ///
    /// Schema names follow the published event layout (`row_id`, `datetime`,
    /// `duration`, ...), not the Rust field names.
    pub fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        let value = match name {
            "row_id" => FieldValue::Long(self.row_id),
            "datetime" => FieldValue::String(&self.timestamp),
            "duration" => FieldValue::Double(self.duration_seconds),
            "title" => FieldValue::String(&self.title),
            "genres" => FieldValue::String(&self.genres),
            "release_date" => FieldValue::String(&self.release_date),
            "movie_id" => FieldValue::String(&self.movie_id),
            "user_id" => FieldValue::String(&self.user_id),
            _ => return None,
        };
        Some(value)
    }

    /// Message key used when publishing
    pub fn key(&self) -> String {
        self.row_id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NormalizedRecord {
        NormalizedRecord {
            row_id: 58773,
            timestamp: "2017-01-01 01:15:09".to_string(),
            duration_seconds: 0.0,
            title: "Angus, Thongs and Perfect Snogging".to_string(),
            genres: "Comedy, Drama, Romance".to_string(),
            release_date: "2008-07-25".to_string(),
            movie_id: "26bd5987e8".to_string(),
            user_id: "1dea19f6fe".to_string(),
        }
    }

    #[test]
    fn test_field_lookup_by_schema_name() {
        let record = sample();
        assert_eq!(record.field("row_id"), Some(FieldValue::Long(58773)));
        assert_eq!(
            record.field("datetime"),
            Some(FieldValue::String("2017-01-01 01:15:09"))
        );
        assert_eq!(record.field("duration"), Some(FieldValue::Double(0.0)));
        assert_eq!(record.field("timestamp"), None);
    }

    #[test]
    fn test_key_is_stringified_row_id() {
        assert_eq!(sample().key(), "58773");
    }
}
