//! Domain-level error types for cvforge.
//!
//! All errors are typed with `thiserror` and recovered at the command
//! boundary. Form validation is not an error: it is reported as a value
//! (see [`crate::domain::SaveOutcome`]).

use std::path::PathBuf;
use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// A persistence operation could not complete.
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Rendering or saving an exported document failed.
    #[error("Export failed: {message}")]
    Export {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A requested record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The free monthly export quota is spent.
    #[error("Export limit reached: {used} of {limit} free exports used this month")]
    ExportLimitReached { used: u32, limit: u32 },

    /// A premium template was used without an entitlement.
    #[error("Template '{template_id}' is premium and has not been unlocked")]
    TemplateLocked { template_id: String },

    /// The purchase backend reported a failure or the user cancelled.
    #[error("Purchase failed: {message}")]
    Purchase { message: String },

    /// Photo file exceeds the configured size cap.
    #[error("Photo too large: {size_kb} KB (max {max_kb} KB) at {path}")]
    PhotoTooLarge {
        path: PathBuf,
        size_kb: u64,
        max_kb: u64,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create a storage error from a rusqlite error.
    pub fn storage(err: rusqlite::Error) -> Self {
        Self::Storage {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create an export error with context.
    pub fn export(
        message: impl Into<String>,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Export {
            message: message.into(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create a not-found error.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_message_mentions_counts() {
        let err = AppError::ExportLimitReached { used: 3, limit: 3 };
        assert_eq!(
            err.to_string(),
            "Export limit reached: 3 of 3 free exports used this month"
        );
    }

    #[test]
    fn test_storage_keeps_source() {
        let err = AppError::storage(rusqlite::Error::QueryReturnedNoRows);
        assert!(std::error::Error::source(&err).is_some());
    }
}
