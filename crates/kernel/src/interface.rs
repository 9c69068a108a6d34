//! Call payloads understood by kernel components.
//!
//! Each enum serializes to the runtime's `{"method": ..., "params": ...}`
//! envelope. Return values are noted per variant.

use acl::Param;
use alloy_primitives::{Address, B256, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Calls every app answers, whether reached directly or through a proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "method",
    content = "params",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum AppCall {
    /// -> `Address`
    Kernel,
    /// -> `B256`
    AppId,
    /// -> `bool`
    HasInitialized,
    /// -> `u64`
    GetInitializationBlock,
    /// -> `bool`
    IsPetrified,
    /// -> `bool`
    CanPerform {
        sender: Address,
        role: B256,
        params: Vec<U256>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "method",
    content = "params",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum KernelCall {
    /// Install `base_acl`, create and initialize the ACL instance.
    Initialize {
        base_acl: Address,
        permissions_creator: Address,
    },
    SetApp {
        namespace: B256,
        app_id: B256,
        app: Address,
    },
    /// -> `Address`, zero when unset
    GetApp { namespace: B256, app_id: B256 },
    /// -> `Address` of the default ACL
    Acl,
    /// -> `bool`
    HasPermission {
        who: Address,
        app: Address,
        role: B256,
        how: Vec<U256>,
    },
    /// -> `Address` of the new proxy
    NewAppInstance {
        app_id: B256,
        base: Address,
        #[serde(default)]
        initialize_payload: Bytes,
        #[serde(default)]
        set_default: bool,
        #[serde(default)]
        kind: ProxyKind,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "method",
    content = "params",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum AclCall {
    /// Only the kernel may call this, once.
    Initialize { permissions_creator: Address },
    CreatePermission {
        entity: Address,
        app: Address,
        role: B256,
        manager: Address,
    },
    GrantPermission {
        entity: Address,
        app: Address,
        role: B256,
    },
    GrantPermissionP {
        entity: Address,
        app: Address,
        role: B256,
        params: Vec<Param>,
    },
    RevokePermission {
        entity: Address,
        app: Address,
        role: B256,
    },
    SetPermissionManager {
        new_manager: Address,
        app: Address,
        role: B256,
    },
    RemovePermissionManager { app: Address, role: B256 },
    /// Create `(app, role)` with no grantee and a burned manager.
    CreateBurnedPermission { app: Address, role: B256 },
    BurnPermissionManager { app: Address, role: B256 },
    /// -> `Address`, zero when unset
    GetPermissionManager { app: Address, role: B256 },
    /// -> `u32`
    GetPermissionParamsLength {
        entity: Address,
        app: Address,
        role: B256,
    },
    /// -> `Param`
    GetPermissionParam {
        entity: Address,
        app: Address,
        role: B256,
        index: u32,
    },
    /// -> `acl::Permission`
    GetPermission {
        entity: Address,
        app: Address,
        role: B256,
    },
    /// -> `bool`
    HasPermission {
        who: Address,
        app: Address,
        role: B256,
        #[serde(default)]
        how: Vec<U256>,
    },
}

/// Calls a proxy answers itself instead of forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum ProxyCall {
    /// -> `Address` calls are currently forwarded to
    Implementation,
    /// -> `ProxyKind`
    ProxyType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "method",
    content = "params",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum OracleCall {
    /// -> `bool`
    CanPerform {
        who: Address,
        app: Address,
        role: B256,
        how: Vec<U256>,
    },
}

/// How a proxy resolves its implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyKind {
    /// Re-read the app base from the kernel on every call.
    #[default]
    Upgradeable,
    /// Keep the base found at creation forever.
    Pinned,
}

/// Constructor arguments of app base implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseArgs {
    /// Make the deployed base permanently unusable on its own.
    #[serde(default = "petrify_by_default")]
    pub petrify: bool,
}

fn petrify_by_default() -> bool {
    true
}

impl Default for BaseArgs {
    fn default() -> Self {
        Self { petrify: true }
    }
}

impl BaseArgs {
    /// A base that can be initialized and used directly.
    pub fn live() -> Self {
        Self { petrify: false }
    }
}

/// Constructor arguments of app proxies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppProxyArgs {
    pub kernel: Address,
    pub app_id: B256,
    /// Delegated to the implementation right after construction.
    #[serde(default)]
    pub initialize_payload: Bytes,
}

/// Constructor arguments of the kernel proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelProxyArgs {
    pub kernel_impl: Address,
}
