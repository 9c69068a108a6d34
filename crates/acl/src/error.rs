//! Permission model error types.

use thiserror::Error;

/// Permission model errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// The operator byte of a packed param is not a known operator.
    #[error("invalid operator: {0}")]
    InvalidOp(u8),

    /// A param value does not fit in 240 bits.
    #[error("param value exceeds 240 bits")]
    ValueTooWide,
}

pub type Result<T> = std::result::Result<T, Error>;
