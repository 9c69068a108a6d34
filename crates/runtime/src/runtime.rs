//! The host that runs transactions.

use crate::component::{Catalog, Component};
use crate::{Env, Error, Result, RuntimeConfig, abi};
use alloy_primitives::Address;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;
use storage::{Event, EventFilter, StateStore};
use tracing::{debug, warn};

const BLOCK_META_KEY: &str = "runtime.block";

/// Position of the chain of transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Block {
    pub number: u64,
    pub timestamp: u64,
}

/// Single-threaded host.
///
/// Transactions run one at a time to completion. A transaction that fails
/// anywhere leaves the store, and the block height, exactly as it found it.
/// Every successful transaction is mined into its own block.
pub struct Runtime {
    store: StateStore,
    catalog: Catalog,
    config: RuntimeConfig,
    block: Cell<Block>,
}

impl Runtime {
    /// Create a runtime over `store`, resuming its block height.
    pub fn new(store: StateStore, config: RuntimeConfig) -> Result<Self> {
        let block = store.meta::<Block>(BLOCK_META_KEY)?.unwrap_or(Block {
            number: 0,
            timestamp: now(),
        });
        Ok(Self {
            store,
            catalog: Catalog::new(),
            config,
            block: Cell::new(block),
        })
    }

    /// Runtime over a fresh in-memory store with default limits.
    pub fn in_memory() -> Result<Self> {
        Self::new(StateStore::in_memory()?, RuntimeConfig::default())
    }

    /// Make code deployable under `name`.
    pub fn install(&mut self, name: &str, component: impl Component + 'static) -> &mut Self {
        self.catalog.install(name, component);
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn block(&self) -> Block {
        self.block.get()
    }

    /// Move the chain forward without running anything.
    pub fn advance(&self, blocks: u64, seconds: u64) -> Result<Block> {
        let current = self.block.get();
        let next = Block {
            number: current.number + blocks,
            timestamp: current.timestamp + seconds,
        };
        self.set_block(next)?;
        Ok(next)
    }

    fn mine(&self) -> Result<Block> {
        let current = self.block.get();
        let next = Block {
            number: current.number + 1,
            timestamp: current.timestamp.max(now()),
        };
        self.set_block(next)?;
        Ok(next)
    }

    fn set_block(&self, block: Block) -> Result<()> {
        self.store.set_meta(BLOCK_META_KEY, &block)?;
        self.block.set(block);
        Ok(())
    }

    pub(crate) fn code_at(&self, address: Address) -> Result<Option<Rc<dyn Component>>> {
        let Some(name) = self.store.code_name(address)? else {
            return Ok(None);
        };
        self.catalog
            .get(&name)
            .map(Some)
            .ok_or(Error::UnknownCode(name))
    }

    /// Whether code is deployed at `address`.
    pub fn has_code(&self, address: Address) -> Result<bool> {
        Ok(self.store.code_name(address)?.is_some())
    }

    /// Name of the code deployed at `address`.
    pub fn code_name(&self, address: Address) -> Result<Option<String>> {
        Ok(self.store.code_name(address)?)
    }

    /// Run a state-changing call from an external account.
    pub fn transact(&self, sender: Address, target: Address, data: &[u8]) -> Result<Vec<u8>> {
        let method = abi::method_name(data);
        debug!(%sender, %target, method = ?method, "transaction");

        let result = self.top_level(sender, false, |env| env.call(target, data));
        if let Err(e) = &result {
            warn!(%sender, %target, method = ?method, error = %e, "transaction reverted");
        }
        result
    }

    /// Run a read-only call against the current state.
    pub fn query(&self, sender: Address, target: Address, data: &[u8]) -> Result<Vec<u8>> {
        self.top_level(sender, true, |env| env.call(target, data))
    }

    /// Deploy catalog code `name` from an external account.
    pub fn deploy(&self, deployer: Address, name: &str, args: &[u8]) -> Result<Address> {
        let result = self.top_level(deployer, false, |env| env.create(name, args));
        if let Err(e) = &result {
            warn!(%deployer, code = name, error = %e, "deployment reverted");
        }
        result
    }

    /// Typed [`Runtime::transact`].
    pub fn send<C: Serialize, R: DeserializeOwned>(
        &self,
        sender: Address,
        target: Address,
        call: &C,
    ) -> Result<R> {
        let data = abi::encode(call)?;
        abi::decode(&self.transact(sender, target, &data)?)
    }

    /// Typed [`Runtime::query`].
    pub fn view<C: Serialize, R: DeserializeOwned>(
        &self,
        sender: Address,
        target: Address,
        call: &C,
    ) -> Result<R> {
        let data = abi::encode(call)?;
        abi::decode(&self.query(sender, target, &data)?)
    }

    /// Events recorded so far.
    pub fn events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        Ok(self.store.load_events(filter)?)
    }

    /// State-changing calls are mined into a new block inside the same
    /// savepoint, so a reverted one leaves the height where it was.
    fn top_level<T>(
        &self,
        sender: Address,
        is_static: bool,
        body: impl FnOnce(&mut Env<'_>) -> Result<T>,
    ) -> Result<T> {
        let parent = self.block.get();
        let sp = self.store.savepoint()?;
        let mined = if is_static { Ok(parent) } else { self.mine() };
        let result = mined.and_then(|_| {
            let mut env = Env::origin(self, sender, is_static, self.config.tx_gas_limit);
            body(&mut env)
        });
        match result {
            Ok(value) if !is_static => {
                self.store.release(sp)?;
                Ok(value)
            }
            Ok(value) => {
                self.store.rollback(sp)?;
                Ok(value)
            }
            Err(e) => {
                self.store.rollback(sp)?;
                self.block.set(parent);
                Err(e)
            }
        }
    }
}

fn now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}
