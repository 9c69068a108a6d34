//! An app that runs scripts for whoever holds `RUN_SCRIPT_ROLE`.

use crate::Error;
use crate::runner::ScriptRunnerEnv;
use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use kernel::ids::{namehash, word};
use kernel::{AppEnv, Dispatch, construct_base, decode_call};
use runtime::{Component, Env, Result, abi};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub static SCRIPT_RUNNER_APP_ID: LazyLock<B256> =
    LazyLock::new(|| namehash("script-runner.aragonpm.eth"));
/// Run a script. Checked with the script's hash as the only argument.
pub static RUN_SCRIPT_ROLE: LazyLock<B256> = LazyLock::new(|| keccak256("RUN_SCRIPT_ROLE"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "method",
    content = "params",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ScriptRunnerCall {
    Initialize,
    /// -> `Bytes`
    Execute { script: Bytes },
    /// -> `Bytes`
    ExecuteWithBan { script: Bytes, banned: Vec<Address> },
    /// -> `Bytes`
    Forward { evm_script: Bytes },
    /// -> `bool`
    CanForward { sender: Address, evm_script: Bytes },
    /// -> `bool`
    IsForwarder,
}

fn script_params(script: &[u8]) -> [U256; 1] {
    [word(keccak256(script))]
}

/// Forwarder that executes scripts as itself.
pub struct ScriptRunner;

impl Component for ScriptRunner {
    fn construct(&self, env: &mut Env<'_>, args: &[u8]) -> Result<()> {
        construct_base(env, args)
    }

    fn invoke(&self, env: &mut Env<'_>, data: &[u8]) -> Result<Vec<u8>> {
        let call = match decode_call::<ScriptRunnerCall>(data)? {
            Dispatch::App(call) => return env.app_call(call),
            Dispatch::Own(call) => call,
        };

        match call {
            ScriptRunnerCall::Initialize => {
                env.initialized()?;
                abi::encode(&())
            }
            ScriptRunnerCall::Execute { script } => {
                env.auth_p(*RUN_SCRIPT_ROLE, &script_params(&script))?;
                abi::encode(&env.run_script(&script, &[], &[])?)
            }
            ScriptRunnerCall::ExecuteWithBan { script, banned } => {
                env.auth_p(*RUN_SCRIPT_ROLE, &script_params(&script))?;
                abi::encode(&env.run_script(&script, &[], &banned)?)
            }
            ScriptRunnerCall::Forward { evm_script } => {
                let sender = env.sender();
                if !env.can_perform(sender, *RUN_SCRIPT_ROLE, &script_params(&evm_script))? {
                    return Err(Error::CannotForward.into());
                }
                abi::encode(&env.run_script(&evm_script, &[], &[])?)
            }
            ScriptRunnerCall::CanForward { sender, evm_script } => {
                abi::encode(&env.can_perform(sender, *RUN_SCRIPT_ROLE, &script_params(&evm_script))?)
            }
            ScriptRunnerCall::IsForwarder => abi::encode(&true),
        }
    }
}
