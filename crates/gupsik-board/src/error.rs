//! Error types for the board.

use thiserror::Error;

/// Result type for board operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while interpreting board inputs.
#[derive(Debug, Error)]
pub enum Error {
    /// Date string is not `YYYY-MM-DD`.
    #[error("invalid date {input:?}: expected YYYY-MM-DD")]
    InvalidDate { input: String },

    /// Help guide does not start with a `#` title line.
    #[error("help guide has no title line")]
    MissingTitle,
}
