//! Permission engine.
//!
//! Core principle: **every protected action names who, where and what.**
//!
//! A permission is the triple `(entity, app, role)`. It is either unset,
//! granted outright, or granted with a list of [`Param`]s that must all hold
//! for the request at hand. Params compare call arguments, the block number or
//! the timestamp against constants, combine each other with logic operators,
//! or defer to an oracle.
//!
//! This crate is pure: it knows nothing about where rules are stored or how
//! oracles are reached. Callers implement [`PermissionSource`] and
//! [`ParamContext`] and ask [`check`] for a [`Decision`].

mod error;
mod eval;
mod params;
mod permission;

pub use error::{Error, Result};
pub use eval::{OracleOutcome, ParamContext, PermissionRequest, eval_params};
pub use params::{
    BLOCK_NUMBER_PARAM_ID, LOGIC_OP_PARAM_ID, ORACLE_PARAM_ID, Op, PARAM_VALUE_PARAM_ID, Param,
    TIMESTAMP_PARAM_ID, decode_params_list, empty_params_hash, encode_params_list, params_hash,
    value_mask,
};
pub use permission::{
    ANY_ENTITY, BURN_ENTITY, Decision, Permission, PermissionSource, Rule, check, permission_hash,
    role_hash,
};
