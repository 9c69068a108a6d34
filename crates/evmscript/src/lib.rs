//! Keel scripts: packed call sequences executed atomically by apps.
//!
//! A script starts with a 4-byte spec id. The registry app maps spec ids to
//! executors; an app running a script looks the executor up through its
//! kernel and delegate-calls it, so every action is sent by the app itself.
//! Any failing action, banned target or decode error aborts the whole run.
//!
//! - [`script`]: encoding and decoding of calls scripts.
//! - [`ScriptRegistry`]: the `evmreg` app.
//! - [`CallsScript`]: executor for spec id 1.
//! - [`ScriptRunnerEnv`]: `run_script` for any app.
//! - [`ScriptRunner`]: an app that runs scripts for holders of
//!   [`RUN_SCRIPT_ROLE`].

mod error;
mod executor;
mod registry;
mod runner;
mod runner_app;
pub mod script;

pub use error::{Error, Result};
pub use executor::{CallsScript, ExecutorCall};
pub use registry::{
    ExecutorEntry, REGISTRY_ADD_EXECUTOR_ROLE, REGISTRY_MANAGER_ROLE, RegistryCall, ScriptRegistry,
};
pub use runner::ScriptRunnerEnv;
pub use runner_app::{RUN_SCRIPT_ROLE, SCRIPT_RUNNER_APP_ID, ScriptRunner, ScriptRunnerCall};
pub use script::{Action, CALLS_SPEC_ID};

use alloy_primitives::Address;
use kernel::ids::EVMSCRIPT_REGISTRY_APP_ID;
use kernel::{BaseArgs, Dao, ProxyKind};
use runtime::{Runtime, abi};
use tracing::info;

/// Catalog names of the script components.
pub mod codes {
    pub const REGISTRY: &str = "evmreg";
    pub const CALLS_SCRIPT: &str = "calls-script";
    pub const SCRIPT_RUNNER: &str = "script-runner";
}

/// Make the script components deployable on `runtime`.
pub fn install(runtime: &mut Runtime) {
    runtime
        .install(codes::REGISTRY, ScriptRegistry)
        .install(codes::CALLS_SCRIPT, CallsScript)
        .install(codes::SCRIPT_RUNNER, ScriptRunner);
}

/// Addresses of an installed script registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptRegistryHandles {
    pub registry: Address,
    pub calls_executor: Address,
}

/// Install the default script registry into `dao` with the calls executor
/// under spec id 1. `root` must hold `APP_MANAGER_ROLE` and `CREATE_PERMISSIONS_ROLE`
/// and ends up holding both registry roles.
pub fn install_script_registry(
    runtime: &Runtime,
    dao: &Dao,
    root: Address,
) -> runtime::Result<ScriptRegistryHandles> {
    let petrified = abi::encode(&BaseArgs::default())?;
    let registry_base = runtime.deploy(root, codes::REGISTRY, &petrified)?;
    let calls_executor = runtime.deploy(root, codes::CALLS_SCRIPT, &petrified)?;

    let init = abi::encode(&RegistryCall::Initialize)?;
    let registry = dao.new_app_instance(
        runtime,
        root,
        *EVMSCRIPT_REGISTRY_APP_ID,
        registry_base,
        init.into(),
        true,
        ProxyKind::Upgradeable,
    )?;
    for role in [*REGISTRY_ADD_EXECUTOR_ROLE, *REGISTRY_MANAGER_ROLE] {
        dao.create_permission(runtime, root, root, registry, role, root)?;
    }
    let spec_id: u32 = runtime.send(
        root,
        registry,
        &RegistryCall::AddScriptExecutor {
            executor: calls_executor,
        },
    )?;
    info!(%registry, %calls_executor, spec_id, "script registry installed");

    Ok(ScriptRegistryHandles {
        registry,
        calls_executor,
    })
}
