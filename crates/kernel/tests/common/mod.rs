#![allow(dead_code)]

use alloy_primitives::{Address, B256, U256, keccak256};
use kernel::ids::namehash;
use kernel::{AclCall, AppEnv, Dao, Dispatch, ProxyKind, construct_base, decode_call};
use runtime::{Component, Env, Result, Runtime, abi};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use storage::Slot;

pub static WITHDRAW_ROLE: LazyLock<B256> = LazyLock::new(|| keccak256("WITHDRAW_ROLE"));
pub static VAULT_APP_ID: LazyLock<B256> = LazyLock::new(|| namehash("vault.aragonpm.eth"));

#[derive(Debug, Serialize, Deserialize)]
#[serde(
    tag = "method",
    content = "params",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum VaultCall {
    Initialize,
    Withdraw { amount: u64 },
    Withdrawn,
    Version,
}

/// Minimal app with one protected entry point.
pub struct Vault {
    pub version: u64,
}

fn withdrawn_slot() -> Slot {
    Slot::named("vault.withdrawn")
}

impl Component for Vault {
    fn construct(&self, env: &mut Env<'_>, args: &[u8]) -> Result<()> {
        construct_base(env, args)
    }

    fn invoke(&self, env: &mut Env<'_>, data: &[u8]) -> Result<Vec<u8>> {
        match decode_call::<VaultCall>(data)? {
            Dispatch::App(call) => env.app_call(call),
            Dispatch::Own(VaultCall::Initialize) => {
                env.initialized()?;
                abi::encode(&())
            }
            Dispatch::Own(VaultCall::Withdraw { amount }) => {
                env.auth_p(*WITHDRAW_ROLE, &[U256::from(amount)])?;
                let total: u64 = env.load(withdrawn_slot())?.unwrap_or(0);
                env.store(withdrawn_slot(), &(total + amount))?;
                abi::encode(&(total + amount))
            }
            Dispatch::Own(VaultCall::Withdrawn) => {
                abi::encode(&env.load::<u64>(withdrawn_slot())?.unwrap_or(0))
            }
            Dispatch::Own(VaultCall::Version) => abi::encode(&self.version),
        }
    }
}

pub fn root() -> Address {
    Address::repeat_byte(0x10)
}

pub fn alice() -> Address {
    Address::repeat_byte(0xa1)
}

pub fn bob() -> Address {
    Address::repeat_byte(0xb0)
}

pub fn carol() -> Address {
    Address::repeat_byte(0xc0)
}

pub fn setup() -> (Runtime, Dao) {
    let mut rt = Runtime::in_memory().unwrap();
    Dao::install(&mut rt);
    rt.install("vault-v1", Vault { version: 1 });
    rt.install("vault-v2", Vault { version: 2 });
    let dao = Dao::create(&rt, root()).unwrap();
    (rt, dao)
}

/// Petrified vault base.
pub fn vault_base(rt: &Runtime, code: &str) -> Address {
    rt.deploy(root(), code, &[]).unwrap()
}

/// Initialized vault instance created by root.
pub fn new_vault(rt: &Runtime, dao: &Dao, base: Address, kind: ProxyKind) -> Address {
    let init = abi::encode(&VaultCall::Initialize).unwrap();
    dao.new_app_instance(rt, root(), *VAULT_APP_ID, base, init.into(), false, kind)
        .unwrap()
}

pub fn acl_send(rt: &Runtime, dao: &Dao, sender: Address, call: AclCall) -> Result<()> {
    rt.send(sender, dao.acl, &call)
}

pub fn withdraw(rt: &Runtime, sender: Address, vault: Address, amount: u64) -> Result<u64> {
    rt.send(sender, vault, &VaultCall::Withdraw { amount })
}

pub fn reason(err: runtime::Error) -> String {
    err.reason().map(str::to_string).unwrap_or_else(|| err.to_string())
}
