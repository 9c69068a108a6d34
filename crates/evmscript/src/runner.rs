//! Running scripts from inside an app.

use crate::Error;
use crate::executor::ExecutorCall;
use crate::registry::RegistryCall;
use alloy_primitives::{Address, Bytes, keccak256};
use kernel::ids::{APP_ADDR_NAMESPACE, EVMSCRIPT_REGISTRY_APP_ID};
use kernel::{AppEnv, KernelCall};
use runtime::{Env, Result, abi};
use storage::EventKind;
use tracing::debug;

/// Script execution for apps, on top of [`AppEnv`].
pub trait ScriptRunnerEnv {
    /// The kernel's default script registry, zero when none is installed.
    fn script_registry(&mut self) -> Result<Address>;

    /// The active executor for `script`'s spec id.
    fn script_executor(&mut self, script: &[u8]) -> Result<Option<Address>>;

    /// Execute `script` as this app, refusing actions on `blacklist`.
    ///
    /// The executor runs in this app's context. The app's kernel and app id
    /// must be unchanged afterwards or the whole run fails.
    fn run_script(&mut self, script: &[u8], input: &[u8], blacklist: &[Address]) -> Result<Bytes>;
}

impl ScriptRunnerEnv for Env<'_> {
    fn script_registry(&mut self) -> Result<Address> {
        let kernel = self.kernel()?;
        if kernel.is_zero() {
            return Ok(Address::ZERO);
        }
        self.view(
            kernel,
            &KernelCall::GetApp {
                namespace: *APP_ADDR_NAMESPACE,
                app_id: *EVMSCRIPT_REGISTRY_APP_ID,
            },
        )
    }

    fn script_executor(&mut self, script: &[u8]) -> Result<Option<Address>> {
        let registry = self.script_registry()?;
        if registry.is_zero() {
            return Ok(None);
        }
        self.view(
            registry,
            &RegistryCall::GetScriptExecutor {
                script: Bytes::copy_from_slice(script),
            },
        )
    }

    fn run_script(&mut self, script: &[u8], input: &[u8], blacklist: &[Address]) -> Result<Bytes> {
        let executor = self
            .script_executor(script)?
            .ok_or(Error::ExecutorUnavailable)?;
        let kernel = self.kernel()?;
        let app_id = self.app_id()?;

        let call = ExecutorCall::ExecScript {
            script: Bytes::copy_from_slice(script),
            input: Bytes::copy_from_slice(input),
            blacklist: blacklist.to_vec(),
        };
        debug!(app = %self.this(), %executor, len = script.len(), "running script");
        let out = self.delegate_call(executor, &abi::encode(&call)?)?;

        if self.kernel()? != kernel || self.app_id()? != app_id {
            return Err(Error::ProtectedState.into());
        }
        let output: Bytes = abi::decode(&out)?;
        self.emit(EventKind::ScriptResult {
            executor,
            script_hash: keccak256(script),
            input: Bytes::copy_from_slice(input),
            return_data: output.clone(),
        })?;
        Ok(output)
    }
}
