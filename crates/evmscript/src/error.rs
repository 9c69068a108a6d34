//! Script engine error types.

use alloy_primitives::Address;
use thiserror::Error;

/// Script decoding and execution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// Shorter than the 4-byte spec id.
    #[error("script too short: {0} bytes")]
    ScriptTooShort(usize),

    /// Fewer bytes left than an action header needs.
    #[error("truncated action at offset {offset}: {remaining} bytes left")]
    TruncatedAction { offset: usize, remaining: usize },

    /// An action's length field reads past the end of the script.
    #[error("action at offset {offset} declares {length} bytes past the end of the script")]
    LengthOverrun { offset: usize, length: u32 },

    /// An action payload longer than its 32-bit length field can describe.
    #[error("action payload of {0} bytes is too long to encode")]
    PayloadTooLong(usize),

    #[error("script has spec id {actual}, expected {expected}")]
    WrongSpecId { expected: u32, actual: u32 },

    #[error("script targets banned address {0}")]
    BannedTarget(Address),

    #[error("no script executor available")]
    ExecutorUnavailable,

    #[error("spec id 0 is reserved")]
    ReservedSpecId,

    #[error("executor {0} already enabled")]
    ExecutorEnabled(u32),

    #[error("executor {0} already disabled")]
    ExecutorDisabled(u32),

    #[error("no executor registered under {0}")]
    UnknownExecutor(u32),

    #[error("no code at {0}")]
    NotAContract(Address),

    /// The script changed the running app's kernel or app id.
    #[error("script modified protected app state")]
    ProtectedState,

    #[error("sender cannot forward")]
    CannotForward,
}

impl From<Error> for runtime::Error {
    fn from(e: Error) -> Self {
        runtime::Error::Revert(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
