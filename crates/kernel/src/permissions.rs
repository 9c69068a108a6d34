//! The ACL app: the permission map and its managers.

use crate::app::{AppEnv, Dispatch, construct_base, decode_call};
use crate::ids::CREATE_PERMISSIONS_ROLE;
use crate::interface::{AclCall, OracleCall};
use crate::Error;
use acl::{
    BURN_ENTITY, OracleOutcome, Param, ParamContext, Permission, PermissionRequest,
    PermissionSource, empty_params_hash, params_hash, permission_hash, role_hash,
};
use alloy_primitives::{Address, B256, U256};
use runtime::{Component, Env, Result, abi};
use storage::{EventKind, Slot};
use tracing::{info, warn};

fn permission_slot(who: Address, app: Address, role: B256) -> Slot {
    Slot::named("acl.permissions").mapping(permission_hash(who, app, role))
}

fn params_slot(hash: B256) -> Slot {
    Slot::named("acl.permissionParams").mapping(hash)
}

fn manager_slot(app: Address, role: B256) -> Slot {
    Slot::named("acl.permissionManager").mapping(role_hash(app, role))
}

/// The permission engine as a deployable app.
///
/// Each permission slot holds the hash of its param list: zero when unset,
/// the empty-list hash for a plain grant, or the hash under which the list
/// itself is stored.
pub struct Acl;

impl Component for Acl {
    fn construct(&self, env: &mut Env<'_>, args: &[u8]) -> Result<()> {
        construct_base(env, args)
    }

    fn invoke(&self, env: &mut Env<'_>, data: &[u8]) -> Result<Vec<u8>> {
        let call = match decode_call::<AclCall>(data)? {
            Dispatch::App(call) => return env.app_call(call),
            Dispatch::Own(call) => call,
        };

        match call {
            AclCall::Initialize {
                permissions_creator,
            } => {
                env.initialized()?;
                if env.sender() != env.kernel()? {
                    return Err(Error::InitNotFromKernel.into());
                }
                let this = env.this();
                create_permission(
                    env,
                    permissions_creator,
                    this,
                    *CREATE_PERMISSIONS_ROLE,
                    permissions_creator,
                )?;
                abi::encode(&())
            }
            AclCall::CreatePermission {
                entity,
                app,
                role,
                manager,
            } => {
                env.auth(*CREATE_PERMISSIONS_ROLE)?;
                require_no_manager(env, app, role)?;
                create_permission(env, entity, app, role, manager)?;
                abi::encode(&())
            }
            AclCall::GrantPermission { entity, app, role } => {
                grant(env, entity, app, role, &[])?;
                abi::encode(&())
            }
            AclCall::GrantPermissionP {
                entity,
                app,
                role,
                params,
            } => {
                grant(env, entity, app, role, &params)?;
                abi::encode(&())
            }
            AclCall::RevokePermission { entity, app, role } => {
                require_manager(env, app, role)?;
                let current: Option<B256> = env.load(permission_slot(entity, app, role))?;
                if current.is_none_or(|hash| hash.is_zero()) {
                    return Err(Error::NonexistentPermission.into());
                }
                set_permission(env, entity, app, role, B256::ZERO)?;
                abi::encode(&())
            }
            AclCall::SetPermissionManager {
                new_manager,
                app,
                role,
            } => {
                require_manager(env, app, role)?;
                set_manager(env, new_manager, app, role)?;
                abi::encode(&())
            }
            AclCall::RemovePermissionManager { app, role } => {
                require_manager(env, app, role)?;
                set_manager(env, Address::ZERO, app, role)?;
                abi::encode(&())
            }
            AclCall::CreateBurnedPermission { app, role } => {
                env.auth(*CREATE_PERMISSIONS_ROLE)?;
                require_no_manager(env, app, role)?;
                set_manager(env, BURN_ENTITY, app, role)?;
                abi::encode(&())
            }
            AclCall::BurnPermissionManager { app, role } => {
                require_manager(env, app, role)?;
                set_manager(env, BURN_ENTITY, app, role)?;
                abi::encode(&())
            }
            AclCall::GetPermissionManager { app, role } => abi::encode(&manager(env, app, role)?),
            AclCall::GetPermissionParamsLength { entity, app, role } => {
                let len = match load_permission(env, entity, app, role)? {
                    Permission::GrantedWithParams(params) => params.len(),
                    _ => 0,
                };
                abi::encode(&(len as u32))
            }
            AclCall::GetPermissionParam {
                entity,
                app,
                role,
                index,
            } => {
                let param = match load_permission(env, entity, app, role)? {
                    Permission::GrantedWithParams(params) => params.get(index as usize).copied(),
                    _ => None,
                };
                let param = param.ok_or_else(|| runtime::Error::revert("param index out of range"))?;
                abi::encode(&param)
            }
            AclCall::GetPermission { entity, app, role } => {
                abi::encode(&load_permission(env, entity, app, role)?)
            }
            AclCall::HasPermission { who, app, role, how } => {
                abi::encode(&has_permission(env, who, app, role, &how)?)
            }
        }
    }
}

fn manager(env: &mut Env<'_>, app: Address, role: B256) -> Result<Address> {
    Ok(env.load(manager_slot(app, role))?.unwrap_or_default())
}

/// An unmanaged or burned role has no manager anyone can act as.
fn require_manager(env: &mut Env<'_>, app: Address, role: B256) -> Result<()> {
    let manager = manager(env, app, role)?;
    if manager.is_zero() || manager == BURN_ENTITY || env.sender() != manager {
        return Err(Error::NotManager { role }.into());
    }
    Ok(())
}

fn require_no_manager(env: &mut Env<'_>, app: Address, role: B256) -> Result<()> {
    if !manager(env, app, role)?.is_zero() {
        return Err(Error::ExistentManager { role }.into());
    }
    Ok(())
}

fn create_permission(
    env: &mut Env<'_>,
    entity: Address,
    app: Address,
    role: B256,
    manager: Address,
) -> Result<()> {
    set_permission(env, entity, app, role, empty_params_hash())?;
    set_manager(env, manager, app, role)
}

fn grant(env: &mut Env<'_>, entity: Address, app: Address, role: B256, params: &[Param]) -> Result<()> {
    require_manager(env, app, role)?;
    let hash = if params.is_empty() {
        empty_params_hash()
    } else {
        save_params(env, params)?
    };
    set_permission(env, entity, app, role, hash)
}

fn save_params(env: &mut Env<'_>, params: &[Param]) -> Result<B256> {
    for param in params {
        param.validate().map_err(Error::from)?;
    }
    let hash = params_hash(params);
    let slot = params_slot(hash);
    if env.load::<Vec<Param>>(slot)?.is_none() {
        env.store(slot, params)?;
    }
    Ok(hash)
}

fn set_permission(
    env: &mut Env<'_>,
    entity: Address,
    app: Address,
    role: B256,
    params_hash: B256,
) -> Result<()> {
    let slot = permission_slot(entity, app, role);
    if params_hash.is_zero() {
        env.clear(slot)?;
    } else {
        env.store(slot, &params_hash)?;
    }

    let allowed = !params_hash.is_zero();
    env.emit(EventKind::SetPermission {
        entity,
        app,
        role,
        allowed,
    })?;
    if allowed && params_hash != empty_params_hash() {
        env.emit(EventKind::SetPermissionParams {
            entity,
            app,
            role,
            params_hash,
        })?;
    }
    info!(%entity, %app, %role, allowed, "permission set");
    Ok(())
}

fn set_manager(env: &mut Env<'_>, manager: Address, app: Address, role: B256) -> Result<()> {
    env.store(manager_slot(app, role), &manager)?;
    env.emit(EventKind::ChangePermissionManager { app, role, manager })?;
    info!(%app, %role, %manager, "permission manager changed");
    Ok(())
}

fn load_permission(env: &mut Env<'_>, entity: Address, app: Address, role: B256) -> Result<Permission> {
    let hash: B256 = env.load(permission_slot(entity, app, role))?.unwrap_or_default();
    if hash.is_zero() {
        return Ok(Permission::Unset);
    }
    if hash == empty_params_hash() {
        return Ok(Permission::Granted);
    }
    let params: Vec<Param> = env.load(params_slot(hash))?.unwrap_or_default();
    Ok(Permission::GrantedWithParams(params))
}

fn has_permission(
    env: &mut Env<'_>,
    who: Address,
    app: Address,
    role: B256,
    how: &[U256],
) -> Result<bool> {
    let max_steps = env.config().max_param_evaluations;
    let request = PermissionRequest::new(who, app, role, how);
    let decision = acl::check(&mut Lookup { env }, &request, max_steps)?;
    Ok(decision.is_allowed())
}

/// Permission storage and oracles as seen from the running ACL frame.
struct Lookup<'e, 'rt> {
    env: &'e mut Env<'rt>,
}

impl PermissionSource for Lookup<'_, '_> {
    type Error = runtime::Error;

    fn permission(&mut self, entity: Address, app: Address, role: B256) -> Result<Permission> {
        load_permission(self.env, entity, app, role)
    }
}

impl ParamContext for Lookup<'_, '_> {
    fn block_number(&self) -> u64 {
        self.env.block().number
    }

    fn timestamp(&self) -> u64 {
        self.env.block().timestamp
    }

    fn check_oracle(&mut self, oracle: Address, request: &PermissionRequest<'_>) -> OracleOutcome {
        let call = OracleCall::CanPerform {
            who: request.who,
            app: request.app,
            role: request.role,
            how: request.how.to_vec(),
        };
        let Ok(data) = abi::encode(&call) else {
            return OracleOutcome::Inconclusive;
        };
        let cap = self.env.config().oracle_check_gas;
        match self.env.static_call_with_gas(oracle, &data, cap) {
            Ok(out) => match abi::decode::<bool>(&out) {
                Ok(true) => OracleOutcome::Allowed,
                Ok(false) => OracleOutcome::Denied,
                Err(_) => {
                    warn!(%oracle, "oracle returned a non-boolean answer");
                    OracleOutcome::Inconclusive
                }
            },
            Err(e) => {
                warn!(%oracle, error = %e, "oracle failed");
                OracleOutcome::Inconclusive
            }
        }
    }
}
