//! Permission lookup and precedence.

use crate::eval::{ParamContext, PermissionRequest, eval_params};
use crate::params::Param;
use alloy_primitives::{Address, B256, keccak256};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Grantee that matches every entity without a rule of its own.
pub const ANY_ENTITY: Address = Address::new([0xff; 20]);

/// Manager of permissions that can never change again.
pub const BURN_ENTITY: Address = Address::new(burn_bytes());

const fn burn_bytes() -> [u8; 20] {
    let mut bytes = [0u8; 20];
    bytes[19] = 1;
    bytes
}

/// The rule stored for one `(grantee, app, role)`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "params", rename_all = "snake_case")]
pub enum Permission {
    /// No rule: denied, and not eligible to shadow a wildcard rule.
    #[default]
    Unset,
    Granted,
    /// Granted only while every condition in the list holds.
    GrantedWithParams(Vec<Param>),
}

impl Permission {
    pub fn is_set(&self) -> bool {
        !matches!(self, Permission::Unset)
    }
}

/// Which stored rule produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// The rule stored for the requesting entity.
    Entity,
    /// The rule stored for [`ANY_ENTITY`].
    AnyEntity,
}

/// Result of a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allow { rule: Rule },
    Deny { rule: Option<Rule> },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }
}

/// Storage the permission engine reads rules from.
pub trait PermissionSource {
    type Error;

    fn permission(&mut self, entity: Address, app: Address, role: B256) -> Result<Permission, Self::Error>;
}

/// Decide `request`.
///
/// The requesting entity's own rule wins whenever it exists, whether it
/// allows or denies. Only when the entity has no rule at all is the
/// [`ANY_ENTITY`] rule consulted. This is what lets a specific entity be
/// denied while a wildcard grant stays active for everyone else.
pub fn check<S>(source: &mut S, request: &PermissionRequest<'_>, max_steps: usize) -> Result<Decision, S::Error>
where
    S: PermissionSource + ParamContext,
{
    let specific = source.permission(request.who, request.app, request.role)?;
    let (rule, permission) = if specific.is_set() {
        (Rule::Entity, specific)
    } else {
        let wildcard = source.permission(ANY_ENTITY, request.app, request.role)?;
        if !wildcard.is_set() {
            debug!(who = %request.who, app = %request.app, role = %request.role, "no rule");
            return Ok(Decision::Deny { rule: None });
        }
        (Rule::AnyEntity, wildcard)
    };

    let allowed = match &permission {
        Permission::Unset => false,
        Permission::Granted => true,
        Permission::GrantedWithParams(params) => eval_params(params, request, source, max_steps),
    };
    debug!(
        who = %request.who,
        app = %request.app,
        role = %request.role,
        ?rule,
        allowed,
        "permission decided"
    );

    Ok(if allowed {
        Decision::Allow { rule }
    } else {
        Decision::Deny { rule: Some(rule) }
    })
}

/// Storage key of the rule for `(who, app, role)`.
pub fn permission_hash(who: Address, app: Address, role: B256) -> B256 {
    let mut preimage = Vec::with_capacity(10 + 20 + 20 + 32);
    preimage.extend_from_slice(b"PERMISSION");
    preimage.extend_from_slice(who.as_slice());
    preimage.extend_from_slice(app.as_slice());
    preimage.extend_from_slice(role.as_slice());
    keccak256(preimage)
}

/// Storage key of the manager of `(app, role)`.
pub fn role_hash(app: Address, role: B256) -> B256 {
    let mut preimage = Vec::with_capacity(4 + 20 + 32);
    preimage.extend_from_slice(b"ROLE");
    preimage.extend_from_slice(app.as_slice());
    preimage.extend_from_slice(role.as_slice());
    keccak256(preimage)
}
