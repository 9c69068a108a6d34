//! Call frames.

use crate::component::Component;
use crate::runtime::Block;
use crate::{Error, Result, Runtime, RuntimeConfig, abi, gas};
use alloy_primitives::{Address, keccak256};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::rc::Rc;
use storage::{Event, EventKind, Slot};
use tracing::debug;

/// Identity of a running frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Address whose storage this frame reads and writes.
    pub this: Address,
    /// Address whose code is running.
    pub code: Address,
    /// Immediate caller.
    pub sender: Address,
    /// Whether state changes are forbidden.
    pub is_static: bool,
    pub depth: usize,
}

/// Execution environment handed to a [`Component`].
///
/// Every call, delegate call and creation opens a child frame inside its own
/// savepoint. If the child fails its writes are rolled back before the error
/// reaches the caller.
pub struct Env<'rt> {
    rt: &'rt Runtime,
    frame: Frame,
    gas: u64,
}

fn nonce_slot() -> Slot {
    Slot::named("runtime.create.nonce")
}

impl<'rt> Env<'rt> {
    /// Frame of an external account starting a transaction.
    pub(crate) fn origin(rt: &'rt Runtime, sender: Address, is_static: bool, gas: u64) -> Self {
        Self {
            rt,
            frame: Frame {
                this: sender,
                code: Address::ZERO,
                sender: Address::ZERO,
                is_static,
                depth: 0,
            },
            gas,
        }
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn this(&self) -> Address {
        self.frame.this
    }

    pub fn sender(&self) -> Address {
        self.frame.sender
    }

    pub fn code_address(&self) -> Address {
        self.frame.code
    }

    pub fn is_static(&self) -> bool {
        self.frame.is_static
    }

    pub fn gas_left(&self) -> u64 {
        self.gas
    }

    pub fn block(&self) -> Block {
        self.rt.block()
    }

    pub fn config(&self) -> &RuntimeConfig {
        self.rt.config()
    }

    /// Consume gas, failing the frame when the budget runs out.
    pub fn charge(&mut self, amount: u64) -> Result<()> {
        if amount > self.gas {
            self.gas = 0;
            return Err(Error::OutOfGas);
        }
        self.gas -= amount;
        Ok(())
    }

    fn require_mutable(&self) -> Result<()> {
        if self.frame.is_static {
            return Err(Error::StaticViolation);
        }
        Ok(())
    }

    /// Read a value from this frame's storage.
    pub fn load<T: DeserializeOwned>(&mut self, slot: Slot) -> Result<Option<T>> {
        self.charge(gas::LOAD)?;
        match self.rt.store().load(self.frame.this, slot)? {
            Some(raw) => Ok(Some(abi::decode(&raw)?)),
            None => Ok(None),
        }
    }

    /// Write a value to this frame's storage.
    pub fn store<T: Serialize + ?Sized>(&mut self, slot: Slot, value: &T) -> Result<()> {
        self.require_mutable()?;
        self.charge(gas::STORE)?;
        let raw = abi::encode(value)?;
        self.rt.store().store(self.frame.this, slot, &raw)?;
        Ok(())
    }

    /// Remove a value from this frame's storage.
    pub fn clear(&mut self, slot: Slot) -> Result<()> {
        self.require_mutable()?;
        self.charge(gas::STORE)?;
        self.rt.store().clear(self.frame.this, slot)?;
        Ok(())
    }

    /// Append an event attributed to this frame's address.
    pub fn emit(&mut self, kind: EventKind) -> Result<()> {
        self.require_mutable()?;
        self.charge(gas::EMIT)?;
        let event = Event::new(self.frame.this, self.block().number, kind);
        self.rt.store().append(&event)?;
        Ok(())
    }

    /// Whether any code is deployed at `address`.
    pub fn has_code(&mut self, address: Address) -> Result<bool> {
        self.charge(gas::CODE_CHECK)?;
        self.rt.has_code(address)
    }

    /// Call `target` with the current frame as sender.
    ///
    /// Calling an address without code succeeds with empty return data.
    pub fn call(&mut self, target: Address, data: &[u8]) -> Result<Vec<u8>> {
        self.charge(gas::CALL)?;
        let Some(code) = self.rt.code_at(target)? else {
            return Ok(Vec::new());
        };
        let frame = Frame {
            this: target,
            code: target,
            sender: self.frame.this,
            is_static: self.frame.is_static,
            depth: self.frame.depth + 1,
        };
        self.run_frame(frame, None, code, |code, env| code.invoke(env, data))
    }

    /// Call `target` without allowing state changes.
    pub fn static_call(&mut self, target: Address, data: &[u8]) -> Result<Vec<u8>> {
        self.static_call_inner(target, data, None)
    }

    /// Static call limited to `gas_cap`. Running out inside the callee fails
    /// the callee only; this frame keeps whatever gas was not handed over.
    pub fn static_call_with_gas(
        &mut self,
        target: Address,
        data: &[u8],
        gas_cap: u64,
    ) -> Result<Vec<u8>> {
        self.static_call_inner(target, data, Some(gas_cap))
    }

    fn static_call_inner(
        &mut self,
        target: Address,
        data: &[u8],
        gas_cap: Option<u64>,
    ) -> Result<Vec<u8>> {
        self.charge(gas::CALL)?;
        let Some(code) = self.rt.code_at(target)? else {
            return Ok(Vec::new());
        };
        let frame = Frame {
            this: target,
            code: target,
            sender: self.frame.this,
            is_static: true,
            depth: self.frame.depth + 1,
        };
        self.run_frame(frame, gas_cap, code, |code, env| code.invoke(env, data))
    }

    /// Run the code at `code` against this frame's storage, keeping the
    /// current sender.
    pub fn delegate_call(&mut self, code: Address, data: &[u8]) -> Result<Vec<u8>> {
        self.charge(gas::CALL)?;
        let component = self.rt.code_at(code)?.ok_or(Error::NoCode(code))?;
        let frame = Frame {
            this: self.frame.this,
            code,
            sender: self.frame.sender,
            is_static: self.frame.is_static,
            depth: self.frame.depth + 1,
        };
        self.run_frame(frame, None, component, |component, env| {
            component.invoke(env, data)
        })
    }

    /// Deploy the catalog code `name` at a fresh address and run its
    /// constructor with this frame as sender.
    pub fn create(&mut self, name: &str, args: &[u8]) -> Result<Address> {
        self.require_mutable()?;
        self.charge(gas::CREATE)?;
        let component = self
            .rt
            .catalog()
            .get(name)
            .ok_or_else(|| Error::UnknownCode(name.to_string()))?;

        let nonce: u64 = self.load(nonce_slot())?.unwrap_or(0);
        self.store(nonce_slot(), &(nonce + 1))?;
        let address = derive_address(self.frame.this, nonce);

        let frame = Frame {
            this: address,
            code: address,
            sender: self.frame.this,
            is_static: false,
            depth: self.frame.depth + 1,
        };
        self.run_frame(frame, None, component, |component, env| {
            env.rt.store().set_code(address, name)?;
            component.construct(env, args)
        })?;
        debug!(%address, code = name, creator = %self.frame.this, "component created");
        Ok(address)
    }

    /// Typed [`Env::call`].
    pub fn send<C: Serialize, R: DeserializeOwned>(&mut self, target: Address, call: &C) -> Result<R> {
        let data = abi::encode(call)?;
        abi::decode(&self.call(target, &data)?)
    }

    /// Typed [`Env::static_call`].
    pub fn view<C: Serialize, R: DeserializeOwned>(&mut self, target: Address, call: &C) -> Result<R> {
        let data = abi::encode(call)?;
        abi::decode(&self.static_call(target, &data)?)
    }

    fn run_frame<T>(
        &mut self,
        frame: Frame,
        gas_cap: Option<u64>,
        component: Rc<dyn Component>,
        body: impl FnOnce(&dyn Component, &mut Env<'rt>) -> Result<T>,
    ) -> Result<T> {
        let max_depth = self.config().max_call_depth;
        if frame.depth > max_depth {
            return Err(Error::CallDepth(max_depth));
        }

        let allotted = gas_cap.map_or(self.gas, |cap| cap.min(self.gas));
        let sp = self.rt.store().savepoint()?;
        let mut child = Env {
            rt: self.rt,
            frame,
            gas: allotted,
        };
        debug!(
            this = %frame.this,
            code = %frame.code,
            sender = %frame.sender,
            depth = frame.depth,
            is_static = frame.is_static,
            "enter frame"
        );

        let result = body(component.as_ref(), &mut child);
        self.gas -= allotted - child.gas;

        match result {
            Ok(value) => {
                self.rt.store().release(sp)?;
                Ok(value)
            }
            Err(e) => {
                self.rt.store().rollback(sp)?;
                debug!(this = %frame.this, depth = frame.depth, error = %e, "frame reverted");
                Err(e)
            }
        }
    }
}

/// Address of the `nonce`-th component created by `creator`.
pub fn derive_address(creator: Address, nonce: u64) -> Address {
    let mut preimage = Vec::with_capacity(28);
    preimage.extend_from_slice(creator.as_slice());
    preimage.extend_from_slice(&nonce.to_be_bytes());
    Address::from_word(keccak256(preimage))
}
