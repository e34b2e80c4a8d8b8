//! Error types for the Caleanna core library.

use thiserror::Error;

/// All errors that can occur within the Caleanna core library.
#[derive(Debug, Error)]
pub enum CaleannaError {
    /// The environment refused access to the backing store (permissions, missing directory, …).
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The backing store exists but could not be opened or prepared.
    #[error("Storage initialisation failed: {0}")]
    StorageInitFailed(String),

    /// A read against one collection failed.
    #[error("Storage read failed in {operation} ({}): {source}", .ids.join(", "))]
    StorageReadFailed {
        /// Name of the store operation that failed.
        operation: &'static str,
        /// Record identifiers involved, if any.
        ids: Vec<String>,
        #[source]
        source: rusqlite::Error,
    },

    /// A write against one or more collections failed and was rolled back.
    #[error("Storage write failed in {operation} ({}): {source}", .ids.join(", "))]
    StorageWriteFailed {
        /// Name of the store operation that failed.
        operation: &'static str,
        /// Record identifiers involved, if any.
        ids: Vec<String>,
        #[source]
        source: rusqlite::Error,
    },

    /// A transfer token could not be decoded, parsed or validated.
    #[error("Invalid import payload: {0}")]
    InvalidImportPayload(String),

    /// A user-authored sort/filter condition failed to compile or evaluate.
    #[error("Rule '{rule}' failed: {message}")]
    RuleCompilationFailed { rule: String, message: String },

    /// A workspace ID was requested that does not exist.
    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    /// A link ID was requested that does not exist in the current workspace.
    #[error("Link not found: {0}")]
    LinkNotFound(String),

    /// An attribute ID was requested that does not exist in the current catalog.
    #[error("Attribute not found: {0}")]
    AttributeNotFound(String),

    /// Input was rejected before anything was written.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// A link URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialisation or deserialisation failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias that pins the error type to [`CaleannaError`].
pub type Result<T> = std::result::Result<T, CaleannaError>;

impl CaleannaError {
    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::StorageUnavailable(_) => "Local storage is not available".to_string(),
            Self::StorageInitFailed(_) => {
                "Could not open the link database. Please try again.".to_string()
            }
            Self::StorageReadFailed { operation, .. } => {
                format!("Error loading data ({operation}). Please try refreshing.")
            }
            Self::StorageWriteFailed { operation, .. } => {
                format!("Error saving changes ({operation}). Please try again.")
            }
            Self::InvalidImportPayload(_) => {
                "Invalid import data. Please check the URL or string and try again.".to_string()
            }
            Self::RuleCompilationFailed { rule, message } => {
                format!("Rule '{rule}' is invalid: {message}")
            }
            Self::WorkspaceNotFound(_) => "Workspace no longer exists".to_string(),
            Self::LinkNotFound(_) => "Link no longer exists".to_string(),
            Self::AttributeNotFound(_) => "Attribute no longer exists".to_string(),
            Self::ValidationFailed(msg) => msg.clone(),
            Self::InvalidUrl(url) => format!("'{url}' is not a valid URL"),
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
        }
    }
}

/// Builds a `map_err` adapter that wraps a SQLite error as [`CaleannaError::StorageReadFailed`].
pub(crate) fn read_failed(
    operation: &'static str,
    ids: &[&str],
) -> impl FnOnce(rusqlite::Error) -> CaleannaError {
    let ids: Vec<String> = ids.iter().map(|s| (*s).to_string()).collect();
    move |source| CaleannaError::StorageReadFailed { operation, ids, source }
}

/// Builds a `map_err` adapter that wraps a SQLite error as [`CaleannaError::StorageWriteFailed`].
pub(crate) fn write_failed(
    operation: &'static str,
    ids: &[&str],
) -> impl FnOnce(rusqlite::Error) -> CaleannaError {
    let ids: Vec<String> = ids.iter().map(|s| (*s).to_string()).collect();
    move |source| CaleannaError::StorageWriteFailed { operation, ids, source }
}
