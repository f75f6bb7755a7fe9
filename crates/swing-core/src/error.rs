use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the swing analytics crates.
#[derive(Error, Debug)]
pub enum SwingError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document (settings or club profiles) could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A session file is not valid tabular data.
    #[error("Malformed session {session_id}: {reason}")]
    MalformedSession { session_id: String, reason: String },

    /// A session holds more rows than the configured cap.
    #[error("Session {session_id} exceeds the limit of {limit} records")]
    SessionTooLarge { session_id: String, limit: usize },

    /// The store has no session with this identifier.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A timestamp string did not match any recognised format.
    #[error("Invalid timestamp format: {0}")]
    TimestampParse(String),

    /// A timezone name is not a recognised IANA identifier.
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// The expected session directory does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the swing crates.
pub type Result<T> = std::result::Result<T, SwingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = SwingError::FileRead {
            path: PathBuf::from("/range/saturday.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/range/saturday.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_malformed_session() {
        let err = SwingError::MalformedSession {
            session_id: "saturday__05_46_pm".to_string(),
            reason: "missing club column".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed session saturday__05_46_pm: missing club column"
        );
    }

    #[test]
    fn test_error_display_session_too_large() {
        let err = SwingError::SessionTooLarge {
            session_id: "huge".to_string(),
            limit: 10,
        };
        assert_eq!(err.to_string(), "Session huge exceeds the limit of 10 records");
    }

    #[test]
    fn test_error_display_session_not_found() {
        let err = SwingError::SessionNotFound("missing".to_string());
        assert_eq!(err.to_string(), "Session not found: missing");
    }

    #[test]
    fn test_error_display_timestamp_parse() {
        let err = SwingError::TimestampParse("yesterday-ish".to_string());
        assert_eq!(err.to_string(), "Invalid timestamp format: yesterday-ish");
    }

    #[test]
    fn test_error_display_data_path_not_found() {
        let err = SwingError::DataPathNotFound(PathBuf::from("/missing/dir"));
        assert_eq!(err.to_string(), "Data path not found: /missing/dir");
    }

    #[test]
    fn test_error_display_config() {
        let err = SwingError::Config("window must be positive".to_string());
        assert_eq!(err.to_string(), "Configuration error: window must be positive");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: SwingError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: SwingError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
