//! Bootstrapping an organization: kernel, ACL and root permissions.

use crate::codes;
use crate::ids::APP_MANAGER_ROLE;
use crate::interface::{AclCall, BaseArgs, KernelCall, KernelProxyArgs, ProxyKind};
use crate::permissions::Acl;
use crate::proxy::{AppProxy, KernelProxy};
use crate::Kernel;
use alloy_primitives::{Address, B256, Bytes, U256};
use runtime::{Result, Runtime, abi};
use tracing::info;

/// Handles to a bootstrapped organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dao {
    /// Kernel proxy; the organization's stable address.
    pub kernel: Address,
    /// Default ACL instance.
    pub acl: Address,
}

impl Dao {
    /// Make the kernel components deployable on `runtime`.
    pub fn install(runtime: &mut Runtime) {
        runtime
            .install(codes::KERNEL, Kernel)
            .install(codes::ACL, Acl)
            .install(codes::KERNEL_PROXY, KernelProxy)
            .install(codes::APP_PROXY_UPGRADEABLE, AppProxy::upgradeable())
            .install(codes::APP_PROXY_PINNED, AppProxy::pinned());
    }

    /// Deploy petrified kernel and ACL bases, a kernel proxy over them, and
    /// initialize it with `root` as permissions creator. `root` also gets
    /// `APP_MANAGER_ROLE` on the kernel, managed by itself.
    pub fn create(runtime: &Runtime, root: Address) -> Result<Self> {
        let petrified = abi::encode(&BaseArgs::default())?;
        let kernel_base = runtime.deploy(root, codes::KERNEL, &petrified)?;
        let acl_base = runtime.deploy(root, codes::ACL, &petrified)?;

        let args = abi::encode(&KernelProxyArgs {
            kernel_impl: kernel_base,
        })?;
        let kernel = runtime.deploy(root, codes::KERNEL_PROXY, &args)?;
        runtime.send::<_, ()>(
            root,
            kernel,
            &KernelCall::Initialize {
                base_acl: acl_base,
                permissions_creator: root,
            },
        )?;

        let dao = Self::at(runtime, kernel)?;
        dao.create_permission(runtime, root, root, kernel, *APP_MANAGER_ROLE, root)?;
        info!(%kernel, acl = %dao.acl, %root, "organization created");
        Ok(dao)
    }

    /// Handles for the organization whose kernel proxy is `kernel`.
    pub fn at(runtime: &Runtime, kernel: Address) -> Result<Self> {
        let acl = runtime.view(Address::ZERO, kernel, &KernelCall::Acl)?;
        Ok(Self { kernel, acl })
    }

    pub fn create_permission(
        &self,
        runtime: &Runtime,
        sender: Address,
        entity: Address,
        app: Address,
        role: B256,
        manager: Address,
    ) -> Result<()> {
        runtime.send(
            sender,
            self.acl,
            &AclCall::CreatePermission {
                entity,
                app,
                role,
                manager,
            },
        )
    }

    pub fn has_permission(
        &self,
        runtime: &Runtime,
        who: Address,
        app: Address,
        role: B256,
        how: &[U256],
    ) -> Result<bool> {
        runtime.view(
            who,
            self.acl,
            &AclCall::HasPermission {
                who,
                app,
                role,
                how: how.to_vec(),
            },
        )
    }

    /// Deploy a live instance of `base` through the kernel.
    #[allow(clippy::too_many_arguments)]
    pub fn new_app_instance(
        &self,
        runtime: &Runtime,
        sender: Address,
        app_id: B256,
        base: Address,
        initialize_payload: Bytes,
        set_default: bool,
        kind: ProxyKind,
    ) -> Result<Address> {
        runtime.send(
            sender,
            self.kernel,
            &KernelCall::NewAppInstance {
                app_id,
                base,
                initialize_payload,
                set_default,
                kind,
            },
        )
    }
}
