//! The calls script executor.

use crate::Error;
use crate::script::decode_calls;
use alloy_primitives::{Address, B256, Bytes, keccak256};
use kernel::{AppEnv, Dispatch, construct_base, decode_call};
use runtime::{Component, Env, Result, abi};
use serde::{Deserialize, Serialize};
use storage::EventKind;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "method",
    content = "params",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ExecutorCall {
    /// -> `Bytes` of script output
    ExecScript {
        script: Bytes,
        #[serde(default)]
        input: Bytes,
        #[serde(default)]
        blacklist: Vec<Address>,
    },
    /// -> `B256`
    ExecutorType,
}

/// Runs every action of a calls script, in order, as the calling app.
///
/// Only meaningful when delegate-called by an initialized app: actions are
/// then sent from the app's address. The deployed base is petrified, so
/// calling it directly fails.
pub struct CallsScript;

impl CallsScript {
    pub fn executor_type() -> B256 {
        keccak256("CALLS_SCRIPT")
    }
}

impl Component for CallsScript {
    fn construct(&self, env: &mut Env<'_>, args: &[u8]) -> Result<()> {
        construct_base(env, args)
    }

    fn invoke(&self, env: &mut Env<'_>, data: &[u8]) -> Result<Vec<u8>> {
        let call = match decode_call::<ExecutorCall>(data)? {
            Dispatch::App(call) => return env.app_call(call),
            Dispatch::Own(call) => call,
        };

        match call {
            ExecutorCall::ExecutorType => abi::encode(&Self::executor_type()),
            ExecutorCall::ExecScript {
                script, blacklist, ..
            } => {
                env.require_initialized()?;
                let actions = decode_calls(&script)?;
                if let Some(banned) = actions.iter().find(|a| blacklist.contains(&a.target)) {
                    return Err(Error::BannedTarget(banned.target).into());
                }

                for action in &actions {
                    env.emit(EventKind::LogScriptCall {
                        sender: env.sender(),
                        src: env.this(),
                        dst: action.target,
                    })?;
                    debug!(app = %env.this(), target = %action.target, "script call");
                    env.call(action.target, &action.payload)?;
                }
                abi::encode(&Bytes::new())
            }
        }
    }
}
