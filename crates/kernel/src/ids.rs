//! Well-known identifiers: registry namespaces, app ids and roles.

use alloy_primitives::{B256, U256, keccak256};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;

/// Kernel implementation and other core components.
pub static CORE_NAMESPACE: LazyLock<B256> = LazyLock::new(|| keccak256("core"));
/// Base implementations that app proxies resolve to.
pub static APP_BASES_NAMESPACE: LazyLock<B256> = LazyLock::new(|| keccak256("base"));
/// Default app instances.
pub static APP_ADDR_NAMESPACE: LazyLock<B256> = LazyLock::new(|| keccak256("app"));

pub static KERNEL_APP_ID: LazyLock<B256> = LazyLock::new(|| namehash("kernel.aragonpm.eth"));
pub static ACL_APP_ID: LazyLock<B256> = LazyLock::new(|| namehash("acl.aragonpm.eth"));
pub static EVMSCRIPT_REGISTRY_APP_ID: LazyLock<B256> =
    LazyLock::new(|| namehash("evmreg.aragonpm.eth"));

/// Kernel: manage registry slots and create app instances.
pub static APP_MANAGER_ROLE: LazyLock<B256> = LazyLock::new(|| keccak256("APP_MANAGER_ROLE"));
/// ACL: create permissions nobody manages yet.
pub static CREATE_PERMISSIONS_ROLE: LazyLock<B256> =
    LazyLock::new(|| keccak256("CREATE_PERMISSIONS_ROLE"));

/// ENS namehash of a dotted name.
pub fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;
    if name.is_empty() {
        return node;
    }
    for label in name.rsplit('.') {
        let mut preimage = [0u8; 64];
        preimage[..32].copy_from_slice(node.as_slice());
        preimage[32..].copy_from_slice(keccak256(label.as_bytes()).as_slice());
        node = keccak256(preimage);
    }
    node
}

/// A 32-byte id as a param argument.
pub fn word(id: B256) -> U256 {
    U256::from_be_bytes(id.0)
}

/// The registry's three namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Core,
    #[serde(alias = "base")]
    AppBase,
    #[serde(alias = "app")]
    AppAddr,
}

impl Namespace {
    pub fn id(self) -> B256 {
        match self {
            Namespace::Core => *CORE_NAMESPACE,
            Namespace::AppBase => *APP_BASES_NAMESPACE,
            Namespace::AppAddr => *APP_ADDR_NAMESPACE,
        }
    }

    pub fn from_id(id: B256) -> Option<Self> {
        [Namespace::Core, Namespace::AppBase, Namespace::AppAddr]
            .into_iter()
            .find(|ns| ns.id() == id)
    }
}

impl FromStr for Namespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "core" => Ok(Namespace::Core),
            "base" | "app_base" => Ok(Namespace::AppBase),
            "app" | "app_addr" => Ok(Namespace::AppAddr),
            other => Err(format!("unknown namespace '{other}' (expected core, base or app)")),
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Namespace::Core => "core",
            Namespace::AppBase => "base",
            Namespace::AppAddr => "app",
        };
        f.write_str(name)
    }
}
