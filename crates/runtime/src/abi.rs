//! Call payload encoding.
//!
//! A payload is a JSON envelope `{"method": ..., "params": ...}`, produced by
//! serializing a component's call enum with
//! `#[serde(tag = "method", content = "params")]`. Return data is the JSON
//! encoding of the returned value.

use crate::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Encode a call or a return value.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Decode a call or a return value.
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(data)?)
}

/// The method name of a payload, if it has one.
pub fn method_name(data: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(data).ok()?;
    value.get("method")?.as_str().map(str::to_string)
}
