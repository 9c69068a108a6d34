//! External deciders for parameterized permissions.

use crate::interface::OracleCall;
use alloy_primitives::{Address, B256, U256};
use runtime::{Component, Env, Result, abi};

/// Decides whether `who` may perform `role` on `app` with arguments `how`.
///
/// Oracles are always consulted through a static, gas-capped call. Anything
/// other than a clean `Ok(bool)` denies the request.
pub trait PermissionOracle {
    fn can_perform(
        &self,
        env: &mut Env<'_>,
        who: Address,
        app: Address,
        role: B256,
        how: &[U256],
    ) -> Result<bool>;
}

/// Deployable wrapper answering [`OracleCall`]s with a [`PermissionOracle`].
#[derive(Debug, Clone, Default)]
pub struct OracleComponent<O>(pub O);

impl<O: PermissionOracle> Component for OracleComponent<O> {
    fn invoke(&self, env: &mut Env<'_>, data: &[u8]) -> Result<Vec<u8>> {
        let OracleCall::CanPerform { who, app, role, how } = abi::decode(data)?;
        abi::encode(&self.0.can_perform(env, who, app, role, &how)?)
    }
}
