//! Error types for rs-comment-harvest.
//!
//! Only [`Error`] ever reaches a caller. [`SelectorError`], [`OracleError`] and
//! [`PageError`] are produced deep inside the engine and absorbed there. A bad
//! selector counts as zero matches and a failed oracle call consumes one retry.
//! Page failures are logged and skipped.

/// Hard failures that propagate to the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The settings/storage service could not be reached.
    #[error("Settings service unavailable: {0}")]
    SettingsUnavailable(String),

    /// The settings document could not be encoded or decoded.
    #[error("Settings document malformed: {0}")]
    SettingsFormat(#[from] serde_json::Error),

    /// A site URL could not be turned into a site identity.
    #[error("Invalid site URL: {0}")]
    InvalidUrl(String),

    /// Filesystem failure while persisting settings.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for fallible public operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A selector string that the DOM backend refused to parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("Invalid selector: {0}")]
    Invalid(String),
}

/// Failure talking to the AI oracle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// The oracle returned an error of its own.
    #[error("Oracle request failed: {0}")]
    Request(String),

    /// No reply within the configured timeout.
    #[error("Oracle timed out after {0} ms")]
    Timeout(u64),

    /// The reply was not a usable JSON selector object.
    #[error("Oracle reply malformed: {0}")]
    Malformed(String),
}

/// Failure of a page primitive (scroll, scroll-into-view, event dispatch).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    /// The target node is no longer attached to the document.
    #[error("Node detached from the document")]
    Detached,

    /// The page rejected or failed the operation.
    #[error("Page operation failed: {0}")]
    Failed(String),
}
