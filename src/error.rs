//! Error types for the scheduler.
//!
//! Only fatal conditions are represented here. Per-line input problems
//! are reported through [`LineError`](crate::input::LineError) and an
//! unplaceable action is a normal `None` from placement, never an error.

use std::path::PathBuf;

/// Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Fatal scheduler errors.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The input file could not be opened or read.
    #[error("cannot open input file {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The session header line is missing or malformed.
    #[error("error parsing session header: {0}")]
    Header(String),

    /// The parsed actions do not form a valid catalog.
    #[error("invalid action catalog: {0}")]
    Catalog(String),

    /// The configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The horizon table is missing points or is not well formed.
    #[error("invalid horizon table: {0}")]
    Horizon(String),

    /// The output artifact could not be created or written.
    #[error("cannot write output file {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output serialization failed.
    #[error("cannot serialize schedule: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl SchedulerError {
    /// Process exit status for this error.
    ///
    /// Input and header failures map to `-2` (254 as an unsigned status),
    /// everything else to `-1` (255).
    pub fn exit_code(&self) -> u8 {
        match self {
            SchedulerError::Input { .. } | SchedulerError::Header(_) => (-2i8) as u8,
            _ => (-1i8) as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let input = SchedulerError::Input {
            path: "missing.txt".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(input.exit_code(), 254);
        assert_eq!(SchedulerError::Header("bad".into()).exit_code(), 254);
        assert_eq!(SchedulerError::Config("bad".into()).exit_code(), 255);
        assert_eq!(SchedulerError::Horizon("bad".into()).exit_code(), 255);
    }

    #[test]
    fn test_error_display() {
        let err = SchedulerError::Header("expected 3 fields, found 2".into());
        assert_eq!(
            err.to_string(),
            "error parsing session header: expected 3 fields, found 2"
        );
    }
}
