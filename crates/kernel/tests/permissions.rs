mod common;

use acl::{ANY_ENTITY, BURN_ENTITY, Op, Param, Permission};
use alloy_primitives::{Address, B256, U256};
use common::*;
use kernel::{AclCall, Error, OracleComponent, PermissionOracle, ProxyKind};
use runtime::{Component, Env, Result, Runtime, abi};
use storage::{EventFilter, EventKind, Slot};

fn vault_setup() -> (Runtime, kernel::Dao, Address) {
    let (rt, dao) = setup();
    let base = vault_base(&rt, "vault-v1");
    let vault = new_vault(&rt, &dao, base, ProxyKind::Upgradeable);
    (rt, dao, vault)
}

fn create(rt: &Runtime, dao: &kernel::Dao, entity: Address, vault: Address, manager: Address) {
    dao.create_permission(rt, root(), entity, vault, *WITHDRAW_ROLE, manager)
        .unwrap();
}

fn allowed(rt: &Runtime, dao: &kernel::Dao, who: Address, vault: Address) -> bool {
    dao.has_permission(rt, who, vault, *WITHDRAW_ROLE, &[]).unwrap()
}

#[test]
fn grant_check_and_revoke_by_manager() {
    let (rt, dao, vault) = vault_setup();
    create(&rt, &dao, alice(), vault, bob());

    assert!(allowed(&rt, &dao, alice(), vault));
    assert!(!allowed(&rt, &dao, carol(), vault));
    assert_eq!(withdraw(&rt, alice(), vault, 7).unwrap(), 7);

    let revoke = AclCall::RevokePermission {
        entity: alice(),
        app: vault,
        role: *WITHDRAW_ROLE,
    };
    let err = acl_send(&rt, &dao, alice(), revoke.clone()).unwrap_err();
    assert_eq!(
        reason(err),
        Error::NotManager {
            role: *WITHDRAW_ROLE
        }
        .to_string()
    );
    assert!(allowed(&rt, &dao, alice(), vault));

    acl_send(&rt, &dao, bob(), revoke).unwrap();
    assert!(!allowed(&rt, &dao, alice(), vault));
    assert!(withdraw(&rt, alice(), vault, 1).is_err());
}

#[test]
fn revoking_one_grantee_leaves_others() {
    let (rt, dao, vault) = vault_setup();
    create(&rt, &dao, alice(), vault, root());
    acl_send(
        &rt,
        &dao,
        root(),
        AclCall::GrantPermission {
            entity: carol(),
            app: vault,
            role: *WITHDRAW_ROLE,
        },
    )
    .unwrap();

    acl_send(
        &rt,
        &dao,
        root(),
        AclCall::RevokePermission {
            entity: alice(),
            app: vault,
            role: *WITHDRAW_ROLE,
        },
    )
    .unwrap();
    assert!(!allowed(&rt, &dao, alice(), vault));
    assert!(allowed(&rt, &dao, carol(), vault));
}

#[test]
fn revoking_unset_permission_fails() {
    let (rt, dao, vault) = vault_setup();
    create(&rt, &dao, alice(), vault, root());
    let err = acl_send(
        &rt,
        &dao,
        root(),
        AclCall::RevokePermission {
            entity: carol(),
            app: vault,
            role: *WITHDRAW_ROLE,
        },
    )
    .unwrap_err();
    assert_eq!(reason(err), Error::NonexistentPermission.to_string());
}

#[test]
fn create_requires_authority_and_no_manager() {
    let (rt, dao, vault) = vault_setup();

    let err = dao
        .create_permission(&rt, alice(), alice(), vault, *WITHDRAW_ROLE, alice())
        .unwrap_err();
    assert!(reason(err).starts_with("auth failed"));

    create(&rt, &dao, alice(), vault, bob());
    let err = dao
        .create_permission(&rt, root(), carol(), vault, *WITHDRAW_ROLE, carol())
        .unwrap_err();
    assert_eq!(
        reason(err),
        Error::ExistentManager {
            role: *WITHDRAW_ROLE
        }
        .to_string()
    );
    assert!(!allowed(&rt, &dao, carol(), vault));
}

#[test]
fn parameterized_grant_compares_arguments() {
    let (rt, dao, vault) = vault_setup();
    create(&rt, &dao, alice(), vault, root());
    acl_send(
        &rt,
        &dao,
        root(),
        AclCall::GrantPermissionP {
            entity: alice(),
            app: vault,
            role: *WITHDRAW_ROLE,
            params: vec![Param::arg(0, Op::Gt, U256::from(5u64))],
        },
    )
    .unwrap();

    assert_eq!(withdraw(&rt, alice(), vault, 6).unwrap(), 6);
    for amount in [5, 4] {
        let err = withdraw(&rt, alice(), vault, amount).unwrap_err();
        assert!(reason(err).starts_with("auth failed"), "amount {amount}");
    }

    let length: u32 = rt
        .view(
            alice(),
            dao.acl,
            &AclCall::GetPermissionParamsLength {
                entity: alice(),
                app: vault,
                role: *WITHDRAW_ROLE,
            },
        )
        .unwrap();
    assert_eq!(length, 1);
    let param: Param = rt
        .view(
            alice(),
            dao.acl,
            &AclCall::GetPermissionParam {
                entity: alice(),
                app: vault,
                role: *WITHDRAW_ROLE,
                index: 0,
            },
        )
        .unwrap();
    assert_eq!(param, Param::arg(0, Op::Gt, U256::from(5u64)));
    let permission: Permission = rt
        .view(
            alice(),
            dao.acl,
            &AclCall::GetPermission {
                entity: alice(),
                app: vault,
                role: *WITHDRAW_ROLE,
            },
        )
        .unwrap();
    assert!(matches!(permission, Permission::GrantedWithParams(p) if p.len() == 1));
}

#[test]
fn over_wide_param_values_are_rejected() {
    let (rt, dao, vault) = vault_setup();
    create(&rt, &dao, alice(), vault, root());
    let err = acl_send(
        &rt,
        &dao,
        root(),
        AclCall::GrantPermissionP {
            entity: alice(),
            app: vault,
            role: *WITHDRAW_ROLE,
            params: vec![Param {
                id: 0,
                op: Op::Eq,
                value: U256::MAX,
            }],
        },
    )
    .unwrap_err();
    assert!(reason(err).starts_with("invalid param"));
}

#[test]
fn specific_rule_shadows_wildcard() {
    let (rt, dao, vault) = vault_setup();
    let mallory = Address::repeat_byte(0x66);
    create(&rt, &dao, ANY_ENTITY, vault, root());
    acl_send(
        &rt,
        &dao,
        root(),
        AclCall::GrantPermissionP {
            entity: mallory,
            app: vault,
            role: *WITHDRAW_ROLE,
            params: vec![Param::constant(false)],
        },
    )
    .unwrap();

    assert!(!allowed(&rt, &dao, mallory, vault));
    assert!(withdraw(&rt, mallory, vault, 1).is_err());
    assert!(allowed(&rt, &dao, carol(), vault));
    assert!(allowed(&rt, &dao, Address::repeat_byte(0x99), vault));
    assert_eq!(withdraw(&rt, carol(), vault, 2).unwrap(), 2);
}

#[test]
fn manager_transfer_and_burn() {
    let (rt, dao, vault) = vault_setup();
    create(&rt, &dao, alice(), vault, root());
    acl_send(
        &rt,
        &dao,
        root(),
        AclCall::SetPermissionManager {
            new_manager: bob(),
            app: vault,
            role: *WITHDRAW_ROLE,
        },
    )
    .unwrap();
    let grant_carol = AclCall::GrantPermission {
        entity: carol(),
        app: vault,
        role: *WITHDRAW_ROLE,
    };
    assert!(acl_send(&rt, &dao, root(), grant_carol.clone()).is_err());
    acl_send(&rt, &dao, bob(), grant_carol.clone()).unwrap();

    acl_send(
        &rt,
        &dao,
        bob(),
        AclCall::BurnPermissionManager {
            app: vault,
            role: *WITHDRAW_ROLE,
        },
    )
    .unwrap();
    let manager: Address = rt
        .view(
            bob(),
            dao.acl,
            &AclCall::GetPermissionManager {
                app: vault,
                role: *WITHDRAW_ROLE,
            },
        )
        .unwrap();
    assert_eq!(manager, BURN_ENTITY);
    assert!(acl_send(&rt, &dao, bob(), grant_carol).is_err());
    // Existing grants survive the burn.
    assert!(allowed(&rt, &dao, carol(), vault));
}

#[test]
fn burned_permission_can_never_be_granted() {
    let (rt, dao, vault) = vault_setup();
    acl_send(
        &rt,
        &dao,
        root(),
        AclCall::CreateBurnedPermission {
            app: vault,
            role: *WITHDRAW_ROLE,
        },
    )
    .unwrap();
    assert!(
        dao.create_permission(&rt, root(), alice(), vault, *WITHDRAW_ROLE, root())
            .is_err()
    );
    assert!(!allowed(&rt, &dao, alice(), vault));
}

#[test]
fn burned_permissions_cannot_be_managed_as_the_burn_entity() {
    let (rt, dao, vault) = vault_setup();
    acl_send(
        &rt,
        &dao,
        root(),
        AclCall::CreateBurnedPermission {
            app: vault,
            role: *WITHDRAW_ROLE,
        },
    )
    .unwrap();

    let attempts = [
        AclCall::GrantPermission {
            entity: carol(),
            app: vault,
            role: *WITHDRAW_ROLE,
        },
        AclCall::SetPermissionManager {
            new_manager: carol(),
            app: vault,
            role: *WITHDRAW_ROLE,
        },
        AclCall::RemovePermissionManager {
            app: vault,
            role: *WITHDRAW_ROLE,
        },
    ];
    for call in attempts {
        let err = acl_send(&rt, &dao, BURN_ENTITY, call).unwrap_err();
        assert_eq!(
            reason(err),
            Error::NotManager {
                role: *WITHDRAW_ROLE
            }
            .to_string()
        );
    }
    assert!(!allowed(&rt, &dao, carol(), vault));
    assert!(withdraw(&rt, carol(), vault, 1).is_err());
}

#[test]
fn unmanaged_roles_cannot_be_managed_from_the_zero_address() {
    let (rt, dao, vault) = vault_setup();
    let grant = AclCall::GrantPermission {
        entity: carol(),
        app: vault,
        role: *WITHDRAW_ROLE,
    };
    let err = acl_send(&rt, &dao, Address::ZERO, grant).unwrap_err();
    assert_eq!(
        reason(err),
        Error::NotManager {
            role: *WITHDRAW_ROLE
        }
        .to_string()
    );
    let err = acl_send(
        &rt,
        &dao,
        Address::ZERO,
        AclCall::SetPermissionManager {
            new_manager: carol(),
            app: vault,
            role: *WITHDRAW_ROLE,
        },
    )
    .unwrap_err();
    assert_eq!(
        reason(err),
        Error::NotManager {
            role: *WITHDRAW_ROLE
        }
        .to_string()
    );

    assert!(!allowed(&rt, &dao, carol(), vault));
    assert!(withdraw(&rt, carol(), vault, 1).is_err());
    // The role is still free to be created properly.
    create(&rt, &dao, alice(), vault, root());
    assert!(allowed(&rt, &dao, alice(), vault));
}

#[test]
fn grants_expire_with_block_height_and_time() {
    let (rt, dao, vault) = vault_setup();
    create(&rt, &dao, alice(), vault, root());
    let start = rt.block();
    acl_send(
        &rt,
        &dao,
        root(),
        AclCall::GrantPermissionP {
            entity: alice(),
            app: vault,
            role: *WITHDRAW_ROLE,
            params: vec![
                Param::and(1, 2),
                Param::block_number(Op::Lt, start.number + 10),
                Param::timestamp(Op::Lt, start.timestamp + 3600),
            ],
        },
    )
    .unwrap();
    assert_eq!(withdraw(&rt, alice(), vault, 1).unwrap(), 1);

    rt.advance(0, 7200).unwrap();
    assert!(withdraw(&rt, alice(), vault, 1).is_err());

    acl_send(
        &rt,
        &dao,
        root(),
        AclCall::GrantPermissionP {
            entity: alice(),
            app: vault,
            role: *WITHDRAW_ROLE,
            params: vec![Param::block_number(Op::Lt, rt.block().number + 10)],
        },
    )
    .unwrap();
    assert_eq!(withdraw(&rt, alice(), vault, 2).unwrap(), 2);
    rt.advance(20, 0).unwrap();
    assert!(withdraw(&rt, alice(), vault, 2).is_err());
}

#[test]
fn cyclic_params_deny() {
    let (rt, dao, vault) = vault_setup();
    create(&rt, &dao, alice(), vault, root());
    acl_send(
        &rt,
        &dao,
        root(),
        AclCall::GrantPermissionP {
            entity: alice(),
            app: vault,
            role: *WITHDRAW_ROLE,
            params: vec![
                Param::and(1, 2),
                Param::not(3),
                Param::not(2),
                Param::constant(false),
            ],
        },
    )
    .unwrap();
    assert!(!allowed(&rt, &dao, alice(), vault));
    assert!(withdraw(&rt, alice(), vault, 1).is_err());
}

#[test]
fn removed_manager_allows_fresh_create() {
    let (rt, dao, vault) = vault_setup();
    create(&rt, &dao, alice(), vault, bob());
    acl_send(
        &rt,
        &dao,
        bob(),
        AclCall::RemovePermissionManager {
            app: vault,
            role: *WITHDRAW_ROLE,
        },
    )
    .unwrap();
    create(&rt, &dao, carol(), vault, carol());
    assert!(allowed(&rt, &dao, alice(), vault));
    assert!(allowed(&rt, &dao, carol(), vault));
}

#[test]
fn permission_changes_are_logged() {
    let (rt, dao, vault) = vault_setup();
    create(&rt, &dao, alice(), vault, bob());

    let events = rt
        .events(&EventFilter::default().emitter(dao.acl).kind("set_permission"))
        .unwrap();
    assert!(events.iter().any(|e| matches!(
        e.kind,
        EventKind::SetPermission { entity, app, allowed: true, .. } if entity == alice() && app == vault
    )));
    let managers = rt
        .events(&EventFilter::default().kind("change_permission_manager"))
        .unwrap();
    assert!(managers.iter().any(|e| matches!(
        e.kind,
        EventKind::ChangePermissionManager { manager, app, .. } if manager == bob() && app == vault
    )));
}

#[test]
fn failed_mutation_leaves_no_events() {
    let (rt, dao, vault) = vault_setup();
    let before = rt.events(&EventFilter::default()).unwrap().len();
    assert!(
        dao.create_permission(&rt, alice(), alice(), vault, *WITHDRAW_ROLE, alice())
            .is_err()
    );
    assert_eq!(rt.events(&EventFilter::default()).unwrap().len(), before);
}

struct Answer(bool);

impl PermissionOracle for Answer {
    fn can_perform(&self, _: &mut Env<'_>, _: Address, _: Address, _: B256, _: &[U256]) -> Result<bool> {
        Ok(self.0)
    }
}

/// Allows only requests made by a fixed entity.
struct OnlyFrom(Address);

impl PermissionOracle for OnlyFrom {
    fn can_perform(&self, _: &mut Env<'_>, who: Address, _: Address, _: B256, _: &[U256]) -> Result<bool> {
        Ok(who == self.0)
    }
}

/// Reads storage until it runs out of gas.
struct Spin;

impl PermissionOracle for Spin {
    fn can_perform(&self, env: &mut Env<'_>, _: Address, _: Address, _: B256, _: &[U256]) -> Result<bool> {
        loop {
            env.load::<u64>(Slot::named("spin"))?;
        }
    }
}

/// Answers with something that is not a boolean.
struct Garbage;

impl Component for Garbage {
    fn invoke(&self, _: &mut Env<'_>, _: &[u8]) -> Result<Vec<u8>> {
        abi::encode("yes")
    }
}

fn oracle_runtime() -> (Runtime, kernel::Dao, Address) {
    let mut rt = Runtime::in_memory().unwrap();
    kernel::Dao::install(&mut rt);
    rt.install("vault-v1", Vault { version: 1 });
    rt.install("oracle-yes", OracleComponent(Answer(true)));
    rt.install("oracle-no", OracleComponent(Answer(false)));
    rt.install("oracle-alice", OracleComponent(OnlyFrom(alice())));
    rt.install("oracle-spin", OracleComponent(Spin));
    rt.install("oracle-garbage", Garbage);
    let dao = kernel::Dao::create(&rt, root()).unwrap();
    let base = vault_base(&rt, "vault-v1");
    let vault = new_vault(&rt, &dao, base, ProxyKind::Upgradeable);
    (rt, dao, vault)
}

fn grant_oracle(rt: &Runtime, dao: &kernel::Dao, entity: Address, vault: Address, code: &str) {
    let oracle = rt.deploy(root(), code, &[]).unwrap();
    create(rt, dao, entity, vault, root());
    acl_send(
        rt,
        dao,
        root(),
        AclCall::GrantPermissionP {
            entity,
            app: vault,
            role: *WITHDRAW_ROLE,
            params: vec![Param::oracle(oracle)],
        },
    )
    .unwrap();
}

#[test]
fn oracle_answers_decide() {
    let (rt, dao, vault) = oracle_runtime();
    grant_oracle(&rt, &dao, alice(), vault, "oracle-yes");
    grant_oracle(&rt, &dao, bob(), vault, "oracle-no");
    assert!(allowed(&rt, &dao, alice(), vault));
    assert!(!allowed(&rt, &dao, bob(), vault));
}

#[test]
fn failing_oracles_deny_without_aborting() {
    let (rt, dao, vault) = oracle_runtime();
    grant_oracle(&rt, &dao, alice(), vault, "oracle-spin");
    grant_oracle(&rt, &dao, bob(), vault, "oracle-garbage");

    assert!(!allowed(&rt, &dao, alice(), vault));
    assert!(!allowed(&rt, &dao, bob(), vault));

    // The exhausted oracle budget is not the caller's: the withdrawal fails
    // on auth, not on gas.
    let err = withdraw(&rt, alice(), vault, 1).unwrap_err();
    assert!(reason(err).starts_with("auth failed"));
}

#[test]
fn wildcard_oracle_sees_the_actual_caller() {
    let (rt, dao, vault) = oracle_runtime();
    grant_oracle(&rt, &dao, ANY_ENTITY, vault, "oracle-alice");
    assert!(allowed(&rt, &dao, alice(), vault));
    assert!(!allowed(&rt, &dao, carol(), vault));
}

#[test]
fn oracle_combined_with_argument_check() {
    let (rt, dao, vault) = oracle_runtime();
    let oracle = rt.deploy(root(), "oracle-yes", &[]).unwrap();
    create(&rt, &dao, alice(), vault, root());
    acl_send(
        &rt,
        &dao,
        root(),
        AclCall::GrantPermissionP {
            entity: alice(),
            app: vault,
            role: *WITHDRAW_ROLE,
            params: vec![Param::and(1, 2), Param::oracle(oracle), Param::arg(0, Op::Lte, U256::from(10u64))],
        },
    )
    .unwrap();
    assert_eq!(withdraw(&rt, alice(), vault, 10).unwrap(), 10);
    assert!(withdraw(&rt, alice(), vault, 11).is_err());
}
