//! CLI error types.

use std::path::PathBuf;
use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The state file has no deployment recorded yet.
    #[error("no organization found in {path}. Run 'keel init' first")]
    NotInitialized { path: PathBuf },

    /// `keel init` was run against a state file that already has one.
    #[error("{path} already holds an organization with kernel {kernel}")]
    AlreadyInitialized {
        path: PathBuf,
        kernel: alloy_primitives::Address,
    },

    /// Configuration is invalid or unreadable.
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// An invocation reverted or the runtime failed.
    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    #[error(transparent)]
    Storage(#[from] storage::Error),

    #[error(transparent)]
    Script(#[from] evmscript::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
