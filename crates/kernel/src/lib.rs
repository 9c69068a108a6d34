//! Keel kernel: the registry, the ACL and the proxies in front of them.
//!
//! An organization is a set of components running on the keel runtime:
//!
//! - **Kernel**: maps `(namespace, app_id)` to addresses. The `base`
//!   namespace holds the implementations app proxies resolve to, the `app`
//!   namespace holds default instances (such as the ACL) and the `core`
//!   namespace holds the kernel's own implementation.
//! - **Acl**: the permission map. Every privileged entry point of every app
//!   asks it, through the kernel, whether the caller holds a role.
//! - **Proxies**: stable addresses that forward to an implementation, either
//!   re-resolved on every call (upgradeable) or fixed at creation (pinned).
//! - **Apps**: any component using [`AppEnv`] for its kernel binding,
//!   initialization and `auth` checks. Implementation bases are petrified at
//!   deployment so they can never be used directly.
//!
//! # Example
//!
//! ```ignore
//! use kernel::{Dao, ids::APP_MANAGER_ROLE};
//! use runtime::Runtime;
//!
//! let mut rt = Runtime::in_memory()?;
//! Dao::install(&mut rt);
//! let dao = Dao::create(&rt, root)?;
//! assert!(dao.has_permission(&rt, root, dao.kernel, *APP_MANAGER_ROLE, &[])?);
//! ```

mod app;
mod dao;
mod error;
pub mod ids;
pub mod interface;
mod kernel;
mod oracle;
mod permissions;
mod proxy;

pub use app::{AppEnv, Dispatch, PETRIFIED_BLOCK, construct_base, decode_call};
pub use dao::Dao;
pub use error::Error;
pub use ids::Namespace;
pub use interface::{
    AclCall, AppCall, AppProxyArgs, BaseArgs, KernelCall, KernelProxyArgs, OracleCall, ProxyCall,
    ProxyKind,
};
pub use kernel::Kernel;
pub use oracle::{OracleComponent, PermissionOracle};
pub use permissions::Acl;
pub use proxy::{AppProxy, KernelProxy};

/// Catalog names of the kernel components.
pub mod codes {
    pub const KERNEL: &str = "kernel";
    pub const ACL: &str = "acl";
    pub const KERNEL_PROXY: &str = "kernel-proxy";
    pub const APP_PROXY_UPGRADEABLE: &str = "app-proxy-upgradeable";
    pub const APP_PROXY_PINNED: &str = "app-proxy-pinned";
}
