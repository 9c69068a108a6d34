//! Proxies: stable addresses whose code lives elsewhere.
//!
//! A proxy answers [`ProxyCall`]s itself and delegate-calls everything else
//! into its current implementation, so the implementation runs against the
//! proxy's storage with the original sender.

use crate::app::AppEnv;
use crate::ids::{APP_BASES_NAMESPACE, CORE_NAMESPACE, KERNEL_APP_ID};
use crate::interface::{AppProxyArgs, KernelCall, KernelProxyArgs, ProxyCall, ProxyKind};
use crate::kernel::app_slot;
use crate::Error;
use alloy_primitives::Address;
use runtime::{Component, Env, Result, abi};
use storage::{EventKind, Slot};
use tracing::debug;

fn pinned_code_slot() -> Slot {
    Slot::named("proxy.pinnedCode")
}

/// Proxy for an app instance bound to a kernel and app id.
#[derive(Debug, Clone, Copy)]
pub struct AppProxy {
    kind: ProxyKind,
}

impl AppProxy {
    pub fn upgradeable() -> Self {
        Self {
            kind: ProxyKind::Upgradeable,
        }
    }

    pub fn pinned() -> Self {
        Self {
            kind: ProxyKind::Pinned,
        }
    }

    pub fn kind(&self) -> ProxyKind {
        self.kind
    }

    fn implementation(&self, env: &mut Env<'_>) -> Result<Address> {
        match self.kind {
            ProxyKind::Pinned => Ok(env.load(pinned_code_slot())?.unwrap_or_default()),
            ProxyKind::Upgradeable => app_base(env),
        }
    }
}

fn app_base(env: &mut Env<'_>) -> Result<Address> {
    let kernel = env.kernel()?;
    let app_id = env.app_id()?;
    env.view(
        kernel,
        &KernelCall::GetApp {
            namespace: *APP_BASES_NAMESPACE,
            app_id,
        },
    )
}

impl Component for AppProxy {
    fn construct(&self, env: &mut Env<'_>, args: &[u8]) -> Result<()> {
        let args: AppProxyArgs = abi::decode(args)?;
        env.set_kernel(args.kernel)?;
        env.set_app_id(args.app_id)?;

        if self.kind == ProxyKind::Pinned {
            let base = app_base(env)?;
            if !env.has_code(base)? {
                return Err(Error::NotAContract(base).into());
            }
            env.store(pinned_code_slot(), &base)?;
        }

        if !args.initialize_payload.is_empty() {
            let implementation = self.implementation(env)?;
            env.delegate_call(implementation, &args.initialize_payload)?;
        }
        Ok(())
    }

    fn invoke(&self, env: &mut Env<'_>, data: &[u8]) -> Result<Vec<u8>> {
        match abi::decode::<ProxyCall>(data) {
            Ok(ProxyCall::Implementation) => abi::encode(&self.implementation(env)?),
            Ok(ProxyCall::ProxyType) => abi::encode(&self.kind),
            Err(_) => {
                let implementation = self.implementation(env)?;
                debug!(proxy = %env.this(), %implementation, "forwarding");
                env.delegate_call(implementation, data)
            }
        }
    }
}

/// Proxy the kernel lives behind.
///
/// The implementation address is the kernel's own `Core` registry entry, so
/// setting that entry through the kernel upgrades it in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelProxy;

fn kernel_impl_slot() -> Slot {
    app_slot(*CORE_NAMESPACE, *KERNEL_APP_ID)
}

impl Component for KernelProxy {
    fn construct(&self, env: &mut Env<'_>, args: &[u8]) -> Result<()> {
        let KernelProxyArgs { kernel_impl } = abi::decode(args)?;
        if !env.has_code(kernel_impl)? {
            return Err(Error::NotAContract(kernel_impl).into());
        }
        env.store(kernel_impl_slot(), &kernel_impl)?;
        env.emit(EventKind::SetApp {
            namespace: *CORE_NAMESPACE,
            app_id: *KERNEL_APP_ID,
            app: kernel_impl,
        })
    }

    fn invoke(&self, env: &mut Env<'_>, data: &[u8]) -> Result<Vec<u8>> {
        let implementation: Address = env.load(kernel_impl_slot())?.unwrap_or_default();
        match abi::decode::<ProxyCall>(data) {
            Ok(ProxyCall::Implementation) => abi::encode(&implementation),
            Ok(ProxyCall::ProxyType) => abi::encode(&ProxyKind::Upgradeable),
            Err(_) => env.delegate_call(implementation, data),
        }
    }
}
