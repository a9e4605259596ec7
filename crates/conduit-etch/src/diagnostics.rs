//! Error types for the declaration generator
//!
//! Only a missing `tsconfig.json` and I/O failures abort a generation run.
//! Everything else (unparsable files, unresolvable types) is logged and
//! absorbed where it happens.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for conduit-etch operations
pub type EtchResult<T> = Result<T, EtchError>;

/// Main error type for conduit-etch
#[derive(Debug, Error)]
pub enum EtchError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No tsconfig.json between the source directory and the filesystem root
    #[error("tsconfig.json not found from {0}")]
    ConfigNotFound(PathBuf),

    /// Parse error
    #[error("Parse error in {file}: {message}")]
    Parse { file: PathBuf, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl EtchError {
    /// Create a parse error
    pub fn parse(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        EtchError::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        EtchError::Config(message.into())
    }

    /// Create a generic error
    pub fn other(message: impl Into<String>) -> Self {
        EtchError::Other(message.into())
    }

    /// Whether this error aborts a generation run
    pub fn is_fatal(&self) -> bool {
        matches!(self, EtchError::Io(_) | EtchError::ConfigNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EtchError::ConfigNotFound(PathBuf::from("/work/app/src"));
        assert_eq!(err.to_string(), "tsconfig.json not found from /work/app/src");
        assert!(err.is_fatal());

        let err = EtchError::parse("/work/app/src/a.ts", "Unexpected token");
        assert_eq!(err.to_string(), "Parse error in /work/app/src/a.ts: Unexpected token");
        assert!(!err.is_fatal());
    }
}
