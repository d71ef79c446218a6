//! Error types for the conversion engine

use thiserror::Error;

/// Errors raised by the flatten / propagate / session pipeline
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Record {index} is missing required field '{field}'")]
    MissingField { index: usize, field: String },

    #[error("Table has no '{column}' column")]
    MissingColumn { column: String },

    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        let err = ConvertError::MissingField {
            index: 3,
            field: "user_pseudo_id".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Record 3 is missing required field 'user_pseudo_id'"
        );
    }

    #[test]
    fn test_missing_column_message() {
        let err = ConvertError::MissingColumn {
            column: "event_name".to_string(),
        };
        assert_eq!(err.to_string(), "Table has no 'event_name' column");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ConvertError = io.into();
        assert!(matches!(err, ConvertError::Io(_)));
    }
}
