//! Error types for shelfstore operations
//!
//! Every fallible operation returns a [`ShelfError`]. File failures carry
//! the path they happened on so the caller can report them without extra
//! bookkeeping.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Caller-side constraint that blocked a write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required form field was left blank
    #[error("field `{0}` is required")]
    MissingField(&'static str),

    /// The chosen key already exists in the catalog
    #[error("key {0} already exists in the catalog")]
    DuplicateKey(String),

    /// The key does not exist in the catalog
    #[error("key {0} does not exist in the catalog")]
    UnknownKey(String),

    /// The color is not part of the configured palette
    #[error("color `{0}` is not one of the allowed colors")]
    UnknownColor(String),

    /// No machine token survived parsing
    #[error("at least one valid machine number is required (e.g. 1,2,3,4)")]
    NoMachines,

    /// No location token survived parsing
    #[error("at least one location is required")]
    NoLocations,
}

/// Shelfstore error types with detailed context
#[derive(Debug, Clone, Error)]
pub enum ShelfError {
    /// Backing file could not be read or written
    #[error("I/O error{}: {message} ({kind})", display_path(.path))]
    Io {
        /// The file path where the error occurred
        path: Option<PathBuf>,
        /// The underlying I/O error kind
        kind: std::io::ErrorKind,
        /// Human-readable description
        message: String,
    },

    /// Backing file does not follow the fixed column layout
    #[error("malformed file {}{}: {reason}", .path.display(), display_line(.line))]
    Format {
        /// File being parsed
        path: PathBuf,
        /// 1-based line number, when known
        line: Option<u64>,
        /// Description of what was wrong
        reason: String,
    },

    /// Write rejected before touching the store
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration failed validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Login failed
    #[error("invalid user id or password")]
    InvalidCredentials,

    /// Session role does not allow the requested action
    #[error("user {user} is not allowed to {action}")]
    Forbidden {
        /// User id carried by the session
        user: String,
        /// Action that was refused
        action: &'static str,
    },
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" in {}", path.display()),
        None => String::new(),
    }
}

fn display_line(line: &Option<u64>) -> String {
    match line {
        Some(line) => format!(" at line {}", line),
        None => String::new(),
    }
}

impl ShelfError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: &Path, context: &str, err: std::io::Error) -> Self {
        ShelfError::Io {
            path: Some(path.to_path_buf()),
            kind: err.kind(),
            message: format!("{}: {}", context, err),
        }
    }

    /// Map a `csv` error onto the taxonomy: I/O stays I/O, everything else
    /// is a format error on `path`.
    pub fn csv(path: &Path, err: csv::Error) -> Self {
        let line = err.position().map(|pos| pos.line());
        let reason = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(e) => ShelfError::io(path, "CSV I/O failed", e),
            _ => ShelfError::Format {
                path: path.to_path_buf(),
                line,
                reason,
            },
        }
    }

    /// True for errors the caller should report as a blocked write rather
    /// than a failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, ShelfError::Validation(_))
    }
}

/// Convert std::io::Error to ShelfError::Io
impl From<std::io::Error> for ShelfError {
    fn from(err: std::io::Error) -> Self {
        ShelfError::Io {
            path: None,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for shelfstore operations
pub type ShelfResult<T> = Result<T, ShelfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShelfError::Format {
            path: PathBuf::from("/tmp/prodotti.csv"),
            line: Some(3),
            reason: "missing field `locations`".into(),
        };

        let display = format!("{}", err);
        assert!(display.contains("/tmp/prodotti.csv"));
        assert!(display.contains("line 3"));
        assert!(display.contains("locations"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ShelfError = io_err.into();

        match err {
            ShelfError::Io { kind, path, .. } => {
                assert_eq!(kind, std::io::ErrorKind::NotFound);
                assert!(path.is_none());
            }
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_io_error_with_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ShelfError::io(Path::new("/data/movimenti.csv"), "open failed", io_err);
        let display = err.to_string();
        assert!(display.contains("/data/movimenti.csv"));
        assert!(display.contains("open failed"));
    }

    #[test]
    fn test_validation_names_constraint() {
        let err: ShelfError = ValidationError::DuplicateKey("OBEN001".into()).into();
        assert!(err.is_validation());
        assert!(err.to_string().contains("OBEN001"));
    }
}
