//! The Kernel: namespaced app registry and app instance factory.

use crate::app::{AppEnv, Dispatch, construct_base, decode_call};
use crate::codes;
use crate::ids::{
    ACL_APP_ID, APP_ADDR_NAMESPACE, APP_BASES_NAMESPACE, APP_MANAGER_ROLE, word,
};
use crate::interface::{AclCall, AppProxyArgs, KernelCall, ProxyKind};
use crate::Error;
use alloy_primitives::{Address, B256, Bytes, U256};
use runtime::{Component, Env, Result, abi};
use storage::{EventKind, Slot};
use tracing::info;

/// Registry entry for `(namespace, app_id)`.
pub(crate) fn app_slot(namespace: B256, app_id: B256) -> Slot {
    Slot::named("kernel.apps").mapping(namespace).mapping(app_id)
}

/// The Kernel implementation. Deployed as a petrified base and used through
/// a kernel proxy.
pub struct Kernel;

impl Component for Kernel {
    fn construct(&self, env: &mut Env<'_>, args: &[u8]) -> Result<()> {
        construct_base(env, args)
    }

    fn invoke(&self, env: &mut Env<'_>, data: &[u8]) -> Result<Vec<u8>> {
        let call = match decode_call::<KernelCall>(data)? {
            Dispatch::App(call) => return env.app_call(call),
            Dispatch::Own(call) => call,
        };

        match call {
            KernelCall::Initialize {
                base_acl,
                permissions_creator,
            } => {
                env.initialized()?;
                set_app(env, *APP_BASES_NAMESPACE, *ACL_APP_ID, base_acl)?;
                let payload = abi::encode(&AclCall::Initialize {
                    permissions_creator,
                })?;
                let acl = new_app_proxy(env, *ACL_APP_ID, payload.into(), ProxyKind::Upgradeable)?;
                set_app(env, *APP_ADDR_NAMESPACE, *ACL_APP_ID, acl)?;
                info!(kernel = %env.this(), %acl, %permissions_creator, "kernel initialized");
                abi::encode(&())
            }
            KernelCall::SetApp {
                namespace,
                app_id,
                app,
            } => {
                auth(env, *APP_MANAGER_ROLE, &[word(namespace), word(app_id)])?;
                set_app(env, namespace, app_id, app)?;
                abi::encode(&())
            }
            KernelCall::GetApp { namespace, app_id } => abi::encode(&get_app(env, namespace, app_id)?),
            KernelCall::Acl => abi::encode(&acl(env)?),
            KernelCall::HasPermission { who, app, role, how } => {
                abi::encode(&has_permission(env, who, app, role, how)?)
            }
            KernelCall::NewAppInstance {
                app_id,
                base,
                initialize_payload,
                set_default,
                kind,
            } => {
                auth(env, *APP_MANAGER_ROLE, &[word(*APP_BASES_NAMESPACE), word(app_id)])?;
                set_app_if_new(env, *APP_BASES_NAMESPACE, app_id, base)?;
                let proxy = new_app_proxy(env, app_id, initialize_payload, kind)?;
                if set_default {
                    auth(env, *APP_MANAGER_ROLE, &[word(*APP_ADDR_NAMESPACE), word(app_id)])?;
                    set_app(env, *APP_ADDR_NAMESPACE, app_id, proxy)?;
                }
                abi::encode(&proxy)
            }
        }
    }
}

fn get_app(env: &mut Env<'_>, namespace: B256, app_id: B256) -> Result<Address> {
    Ok(env.load(app_slot(namespace, app_id))?.unwrap_or_default())
}

fn acl(env: &mut Env<'_>) -> Result<Address> {
    get_app(env, *APP_ADDR_NAMESPACE, *ACL_APP_ID)
}

fn has_permission(
    env: &mut Env<'_>,
    who: Address,
    app: Address,
    role: B256,
    how: Vec<U256>,
) -> Result<bool> {
    let acl = acl(env)?;
    if acl.is_zero() {
        return Ok(false);
    }
    env.view(acl, &AclCall::HasPermission { who, app, role, how })
}

/// The kernel checks its own permissions directly against the ACL.
fn auth(env: &mut Env<'_>, role: B256, params: &[U256]) -> Result<()> {
    let sender = env.sender();
    let app = env.this();
    if !has_permission(env, sender, app, role, params.to_vec())? {
        return Err(Error::AuthFailed { role }.into());
    }
    Ok(())
}

fn set_app(env: &mut Env<'_>, namespace: B256, app_id: B256, app: Address) -> Result<()> {
    if !env.has_code(app)? {
        return Err(Error::NotAContract(app).into());
    }
    env.store(app_slot(namespace, app_id), &app)?;
    env.emit(EventKind::SetApp {
        namespace,
        app_id,
        app,
    })?;
    info!(kernel = %env.this(), %namespace, %app_id, %app, "app set");
    Ok(())
}

fn set_app_if_new(env: &mut Env<'_>, namespace: B256, app_id: B256, app: Address) -> Result<()> {
    let existing = get_app(env, namespace, app_id)?;
    if existing.is_zero() {
        return set_app(env, namespace, app_id, app);
    }
    if existing != app {
        return Err(Error::InvalidAppChange { app_id, existing }.into());
    }
    Ok(())
}

fn new_app_proxy(
    env: &mut Env<'_>,
    app_id: B256,
    initialize_payload: Bytes,
    kind: ProxyKind,
) -> Result<Address> {
    let args = abi::encode(&AppProxyArgs {
        kernel: env.this(),
        app_id,
        initialize_payload,
    })?;
    let code = match kind {
        ProxyKind::Upgradeable => codes::APP_PROXY_UPGRADEABLE,
        ProxyKind::Pinned => codes::APP_PROXY_PINNED,
    };
    let proxy = env.create(code, &args)?;
    env.emit(EventKind::NewAppProxy {
        proxy,
        upgradeable: kind == ProxyKind::Upgradeable,
        app_id,
    })?;
    info!(kernel = %env.this(), %proxy, ?kind, %app_id, "app proxy created");
    Ok(proxy)
}
