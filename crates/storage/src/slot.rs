//! Fixed storage positions.
//!
//! Implementations are swapped in place behind proxies, so no component may
//! rely on declaration order for its state. Every value lives at a position
//! derived from a stable name, and mapping entries hash their key together
//! with the position of the mapping itself.

use alloy_primitives::{B256, keccak256};
use serde::{Deserialize, Serialize};

/// A position in a component's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot(pub B256);

impl Slot {
    /// Position derived from a well-known name, e.g. `"aragonOS.appStorage.kernel"`.
    pub fn named(name: &str) -> Self {
        Self(keccak256(name.as_bytes()))
    }

    /// Position of the entry for `key` in the mapping rooted at this slot.
    pub fn mapping(self, key: impl AsRef<[u8]>) -> Self {
        let key = key.as_ref();
        let mut preimage = Vec::with_capacity(key.len() + 32);
        preimage.extend_from_slice(key);
        preimage.extend_from_slice(self.0.as_slice());
        Self(keccak256(preimage))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
