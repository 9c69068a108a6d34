//! Kernel and app error types.

use alloy_primitives::{Address, B256};
use thiserror::Error;

/// Why a kernel, ACL or app entry point refused a call.
///
/// These surface to callers as [`runtime::Error::Revert`] carrying the
/// display string, so the whole invocation rolls back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("auth failed for role {role}")]
    AuthFailed { role: B256 },

    #[error("already initialized")]
    AlreadyInitialized,

    #[error("not initialized")]
    NotInitialized,

    /// `initialize` on an ACL must come from its own kernel.
    #[error("initialization must be requested by the kernel")]
    InitNotFromKernel,

    #[error("no code at {0}")]
    NotAContract(Address),

    /// A different base is already registered for the app id.
    #[error("app {app_id} already has base {existing}")]
    InvalidAppChange { app_id: B256, existing: Address },

    #[error("permission manager already set for role {role}")]
    ExistentManager { role: B256 },

    #[error("sender is not the manager of role {role}")]
    NotManager { role: B256 },

    #[error("permission not set")]
    NonexistentPermission,

    #[error("invalid param: {0}")]
    InvalidParam(#[from] acl::Error),
}

impl From<Error> for runtime::Error {
    fn from(e: Error) -> Self {
        runtime::Error::Revert(e.to_string())
    }
}
