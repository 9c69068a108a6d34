//! Command-line value parsers.

use acl::{
    BLOCK_NUMBER_PARAM_ID, LOGIC_OP_PARAM_ID, ORACLE_PARAM_ID, Op, PARAM_VALUE_PARAM_ID, Param,
    TIMESTAMP_PARAM_ID,
};
use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use evmscript::Action;
use kernel::ids::namehash;
use std::str::FromStr;

/// A role given as a `0x` hash or as its name, e.g. `APP_MANAGER_ROLE`.
pub fn role(s: &str) -> Result<B256, String> {
    if s.starts_with("0x") {
        return B256::from_str(s).map_err(|e| e.to_string());
    }
    Ok(keccak256(s.as_bytes()))
}

/// An app id given as a `0x` hash, a dotted name, or a bare package name
/// under `aragonpm.eth`.
pub fn app_id(s: &str) -> Result<B256, String> {
    if s.starts_with("0x") {
        return B256::from_str(s).map_err(|e| e.to_string());
    }
    if s.contains('.') {
        return Ok(namehash(s));
    }
    Ok(namehash(&format!("{s}.aragonpm.eth")))
}

/// A param as `<id>:<op>:<value>`, or `oracle:<address>`.
///
/// `id` is an argument index or one of `block`, `time`, `logic`, `value`.
/// `op` is an operator name such as `gt` or `if_else`.
pub fn param(s: &str) -> Result<Param, String> {
    let mut parts = s.splitn(3, ':');
    let id = parts.next().unwrap_or_default();
    if id == "oracle" {
        let oracle = parts.next().ok_or("missing oracle address")?;
        let oracle = Address::from_str(oracle).map_err(|e| e.to_string())?;
        return Ok(Param::oracle(oracle));
    }

    let (Some(op), Some(value)) = (parts.next(), parts.next()) else {
        return Err(format!("expected <id>:<op>:<value>, got '{s}'"));
    };
    let id = match id {
        "block" => BLOCK_NUMBER_PARAM_ID,
        "time" => TIMESTAMP_PARAM_ID,
        "logic" => LOGIC_OP_PARAM_ID,
        "value" => PARAM_VALUE_PARAM_ID,
        index => index
            .parse::<u8>()
            .map_err(|_| format!("unknown param id '{index}'"))?,
    };
    if id == ORACLE_PARAM_ID {
        return Err("use oracle:<address> for oracle params".to_string());
    }
    let op: Op = serde_json::from_value(serde_json::Value::String(op.to_uppercase()))
        .map_err(|_| format!("unknown operator '{op}'"))?;
    let value = U256::from_str(value).map_err(|e| e.to_string())?;
    Param::new(id, op, value).map_err(|e| e.to_string())
}

/// A script action as `<target>=<json payload>`.
pub fn action(s: &str) -> Result<Action, String> {
    let (target, payload) = s
        .split_once('=')
        .ok_or_else(|| format!("expected <target>=<payload>, got '{s}'"))?;
    let target = Address::from_str(target).map_err(|e| e.to_string())?;
    serde_json::from_str::<serde_json::Value>(payload).map_err(|e| e.to_string())?;
    Ok(Action::new(target, payload.as_bytes().to_vec()))
}

pub fn bytes(s: &str) -> Result<Bytes, String> {
    Bytes::from_str(s).map_err(|e| e.to_string())
}
