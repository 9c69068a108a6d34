//! Script encoding.
//!
//! A script is a 4-byte big-endian spec id followed by a body the matching
//! executor understands. The calls body is a sequence of actions, each
//! `target (20 bytes) | length (4 bytes, big-endian) | payload (length bytes)`,
//! and must be consumed exactly.

use crate::{Error, Result};
use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};

/// Spec id of the calls script.
pub const CALLS_SPEC_ID: u32 = 1;

const SPEC_ID_LEN: usize = 4;
const ACTION_HEADER_LEN: usize = 20 + 4;

/// One call in a calls script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub target: Address,
    pub payload: Bytes,
}

impl Action {
    pub fn new(target: Address, payload: impl Into<Bytes>) -> Self {
        Self {
            target,
            payload: payload.into(),
        }
    }
}

/// The spec id a script starts with.
pub fn spec_id(script: &[u8]) -> Result<u32> {
    let Some(tag) = script.get(..SPEC_ID_LEN) else {
        return Err(Error::ScriptTooShort(script.len()));
    };
    let mut bytes = [0u8; SPEC_ID_LEN];
    bytes.copy_from_slice(tag);
    Ok(u32::from_be_bytes(bytes))
}

/// Encode a calls script. Fails if a payload does not fit a 32-bit length.
pub fn encode_calls(actions: &[Action]) -> Result<Bytes> {
    let len = SPEC_ID_LEN
        + actions
            .iter()
            .map(|a| ACTION_HEADER_LEN + a.payload.len())
            .sum::<usize>();
    let mut script = Vec::with_capacity(len);
    script.extend_from_slice(&CALLS_SPEC_ID.to_be_bytes());
    for action in actions {
        script.extend_from_slice(action.target.as_slice());
        script.extend_from_slice(&payload_length(action.payload.len())?.to_be_bytes());
        script.extend_from_slice(&action.payload);
    }
    Ok(script.into())
}

fn payload_length(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::PayloadTooLong(len))
}

/// Decode a calls script, rejecting any other spec id.
pub fn decode_calls(script: &[u8]) -> Result<Vec<Action>> {
    let actual = spec_id(script)?;
    if actual != CALLS_SPEC_ID {
        return Err(Error::WrongSpecId {
            expected: CALLS_SPEC_ID,
            actual,
        });
    }

    let mut actions = Vec::new();
    let mut offset = SPEC_ID_LEN;
    while offset < script.len() {
        let remaining = script.len() - offset;
        if remaining < ACTION_HEADER_LEN {
            return Err(Error::TruncatedAction { offset, remaining });
        }
        let target = Address::from_slice(&script[offset..offset + 20]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&script[offset + 20..offset + ACTION_HEADER_LEN]);
        let length = u32::from_be_bytes(len);

        let start = offset + ACTION_HEADER_LEN;
        let end = start
            .checked_add(length as usize)
            .filter(|end| *end <= script.len())
            .ok_or(Error::LengthOverrun { offset, length })?;
        actions.push(Action::new(target, script[start..end].to_vec()));
        offset = end;
    }
    Ok(actions)
}
