//! The script executor registry app.

use crate::{Error, script};
use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use kernel::{AppEnv, Dispatch, construct_base, decode_call};
use runtime::{Component, Env, Result, abi};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use storage::{EventKind, Slot};
use tracing::info;

/// Append executors under the next free spec id.
pub static REGISTRY_ADD_EXECUTOR_ROLE: LazyLock<B256> =
    LazyLock::new(|| keccak256("REGISTRY_ADD_EXECUTOR_ROLE"));
/// Register, enable and disable executors. Scoped by spec id.
pub static REGISTRY_MANAGER_ROLE: LazyLock<B256> =
    LazyLock::new(|| keccak256("REGISTRY_MANAGER_ROLE"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "method",
    content = "params",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum RegistryCall {
    Initialize,
    /// -> `u32` spec id assigned
    AddScriptExecutor { executor: Address },
    RegisterScriptExecutor { spec_id: u32, executor: Address },
    EnableScriptExecutor { spec_id: u32 },
    DisableScriptExecutor { spec_id: u32 },
    /// -> `Option<Address>` of the active executor for the script's spec id
    GetScriptExecutor { script: Bytes },
    /// -> `Option<ExecutorEntry>`
    GetExecutor { spec_id: u32 },
}

/// A registered executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorEntry {
    pub executor: Address,
    pub enabled: bool,
}

fn entry_slot(spec_id: u32) -> Slot {
    Slot::named("evmreg.executors").mapping(spec_id.to_be_bytes())
}

fn next_index_slot() -> Slot {
    Slot::named("evmreg.nextIndex")
}

/// Maps script spec ids to executor addresses. Spec id 0 is never assigned.
pub struct ScriptRegistry;

impl Component for ScriptRegistry {
    fn construct(&self, env: &mut Env<'_>, args: &[u8]) -> Result<()> {
        construct_base(env, args)
    }

    fn invoke(&self, env: &mut Env<'_>, data: &[u8]) -> Result<Vec<u8>> {
        let call = match decode_call::<RegistryCall>(data)? {
            Dispatch::App(call) => return env.app_call(call),
            Dispatch::Own(call) => call,
        };

        match call {
            RegistryCall::Initialize => {
                env.initialized()?;
                env.store(next_index_slot(), &1u32)?;
                abi::encode(&())
            }
            RegistryCall::AddScriptExecutor { executor } => {
                env.auth(*REGISTRY_ADD_EXECUTOR_ROLE)?;
                let spec_id: u32 = env.load(next_index_slot())?.unwrap_or(1);
                set_executor(env, spec_id, executor)?;
                abi::encode(&spec_id)
            }
            RegistryCall::RegisterScriptExecutor { spec_id, executor } => {
                env.auth_p(*REGISTRY_MANAGER_ROLE, &[U256::from(spec_id)])?;
                if spec_id == 0 {
                    return Err(Error::ReservedSpecId.into());
                }
                set_executor(env, spec_id, executor)?;
                abi::encode(&())
            }
            RegistryCall::EnableScriptExecutor { spec_id } => {
                env.auth_p(*REGISTRY_MANAGER_ROLE, &[U256::from(spec_id)])?;
                let entry = entry(env, spec_id)?.ok_or(Error::UnknownExecutor(spec_id))?;
                if entry.enabled {
                    return Err(Error::ExecutorEnabled(spec_id).into());
                }
                toggle(env, spec_id, entry.executor, true)?;
                abi::encode(&())
            }
            RegistryCall::DisableScriptExecutor { spec_id } => {
                env.auth_p(*REGISTRY_MANAGER_ROLE, &[U256::from(spec_id)])?;
                let entry = entry(env, spec_id)?.ok_or(Error::UnknownExecutor(spec_id))?;
                if !entry.enabled {
                    return Err(Error::ExecutorDisabled(spec_id).into());
                }
                toggle(env, spec_id, entry.executor, false)?;
                abi::encode(&())
            }
            RegistryCall::GetScriptExecutor { script } => {
                let spec_id = script::spec_id(&script)?;
                let executor = entry(env, spec_id)?
                    .filter(|entry| entry.enabled)
                    .map(|entry| entry.executor);
                abi::encode(&executor)
            }
            RegistryCall::GetExecutor { spec_id } => abi::encode(&entry(env, spec_id)?),
        }
    }
}

fn entry(env: &mut Env<'_>, spec_id: u32) -> Result<Option<ExecutorEntry>> {
    env.load(entry_slot(spec_id))
}

fn set_executor(env: &mut Env<'_>, spec_id: u32, executor: Address) -> Result<()> {
    if !env.has_code(executor)? {
        return Err(Error::NotAContract(executor).into());
    }
    let next: u32 = env.load(next_index_slot())?.unwrap_or(1);
    if spec_id >= next {
        env.store(next_index_slot(), &spec_id.saturating_add(1))?;
    }
    toggle(env, spec_id, executor, true)
}

fn toggle(env: &mut Env<'_>, spec_id: u32, executor: Address, enabled: bool) -> Result<()> {
    env.store(entry_slot(spec_id), &ExecutorEntry { executor, enabled })?;
    let event = if enabled {
        EventKind::EnableExecutor {
            executor_id: spec_id,
            executor,
        }
    } else {
        EventKind::DisableExecutor {
            executor_id: spec_id,
            executor,
        }
    };
    env.emit(event)?;
    info!(registry = %env.this(), spec_id, %executor, enabled, "script executor updated");
    Ok(())
}
