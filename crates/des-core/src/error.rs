//! Kernel-wide base error type.
//!
//! Sub-crates define their own error enums and either convert them into
//! `DesError` or wrap `DesError` as one variant; prefer whichever keeps error
//! sites clean.

use thiserror::Error;

/// The top-level error type for `des-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum DesError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for `des-core`.
pub type DesResult<T> = Result<T, DesError>;
