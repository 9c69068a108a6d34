use alloy_primitives::Address;
use thiserror::Error;

/// Why an invocation aborted.
///
/// Any error returned from a frame rolls back everything that frame wrote.
/// Errors propagate to the caller unchanged, so an unhandled failure anywhere
/// aborts the whole transaction.
#[derive(Debug, Error)]
pub enum Error {
    /// A component refused the call.
    #[error("reverted: {0}")]
    Revert(String),

    #[error("out of gas")]
    OutOfGas,

    #[error("state modification attempted in a static call")]
    StaticViolation,

    #[error("no code at {0}")]
    NoCode(Address),

    #[error("unknown code '{0}'")]
    UnknownCode(String),

    #[error("call depth limit of {0} exceeded")]
    CallDepth(usize),

    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] storage::Error),
}

impl Error {
    pub fn revert(reason: impl Into<String>) -> Self {
        Self::Revert(reason.into())
    }

    /// The revert reason, if this is a revert.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Revert(reason) => Some(reason),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
