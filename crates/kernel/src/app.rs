//! What every app shares: kernel binding, initialization and auth.

use crate::interface::{AppCall, BaseArgs, KernelCall};
use crate::Error;
use alloy_primitives::{Address, B256, U256};
use runtime::{Env, Result, abi};
use serde::de::DeserializeOwned;
use storage::Slot;
use tracing::debug;

/// Initialization block of a base that may never be initialized.
pub const PETRIFIED_BLOCK: u64 = u64::MAX;

pub(crate) fn kernel_slot() -> Slot {
    Slot::named("app.kernel")
}

pub(crate) fn app_id_slot() -> Slot {
    Slot::named("app.appId")
}

fn initialization_block_slot() -> Slot {
    Slot::named("app.initializationBlock")
}

/// App storage and permission helpers on top of [`Env`].
///
/// All state lives in the frame's own storage, so an implementation running
/// behind a proxy sees the proxy's kernel, app id and initialization block.
pub trait AppEnv {
    fn kernel(&mut self) -> Result<Address>;
    fn set_kernel(&mut self, kernel: Address) -> Result<()>;
    fn app_id(&mut self) -> Result<B256>;
    fn set_app_id(&mut self, app_id: B256) -> Result<()>;

    /// `0` until initialized, [`PETRIFIED_BLOCK`] when petrified.
    fn initialization_block(&mut self) -> Result<u64>;
    fn has_initialized(&mut self) -> Result<bool>;
    fn is_petrified(&mut self) -> Result<bool>;

    /// Mark initialized at the current block. Fails if already initialized or
    /// petrified.
    fn initialized(&mut self) -> Result<()>;
    fn petrify(&mut self) -> Result<()>;
    fn require_initialized(&mut self) -> Result<()>;

    /// Ask the kernel whether `sender` holds `role` on this app.
    ///
    /// False whenever the app is not initialized or has no kernel.
    fn can_perform(&mut self, sender: Address, role: B256, params: &[U256]) -> Result<bool>;
    /// Require the caller to hold `role` on this app.
    fn auth(&mut self, role: B256) -> Result<()>;
    fn auth_p(&mut self, role: B256, params: &[U256]) -> Result<()>;

    /// Answer one of the calls all apps share.
    fn app_call(&mut self, call: AppCall) -> Result<Vec<u8>>;
}

impl AppEnv for Env<'_> {
    fn kernel(&mut self) -> Result<Address> {
        Ok(self.load(kernel_slot())?.unwrap_or_default())
    }

    fn set_kernel(&mut self, kernel: Address) -> Result<()> {
        self.store(kernel_slot(), &kernel)
    }

    fn app_id(&mut self) -> Result<B256> {
        Ok(self.load(app_id_slot())?.unwrap_or_default())
    }

    fn set_app_id(&mut self, app_id: B256) -> Result<()> {
        self.store(app_id_slot(), &app_id)
    }

    fn initialization_block(&mut self) -> Result<u64> {
        Ok(self.load(initialization_block_slot())?.unwrap_or(0))
    }

    fn has_initialized(&mut self) -> Result<bool> {
        let block = self.initialization_block()?;
        Ok(block != 0 && self.block().number >= block)
    }

    fn is_petrified(&mut self) -> Result<bool> {
        Ok(self.initialization_block()? == PETRIFIED_BLOCK)
    }

    fn initialized(&mut self) -> Result<()> {
        if self.initialization_block()? != 0 {
            return Err(Error::AlreadyInitialized.into());
        }
        let number = self.block().number;
        self.store(initialization_block_slot(), &number)
    }

    fn petrify(&mut self) -> Result<()> {
        if self.initialization_block()? != 0 {
            return Err(Error::AlreadyInitialized.into());
        }
        debug!(app = %self.this(), "petrified");
        self.store(initialization_block_slot(), &PETRIFIED_BLOCK)
    }

    fn require_initialized(&mut self) -> Result<()> {
        if !self.has_initialized()? {
            return Err(Error::NotInitialized.into());
        }
        Ok(())
    }

    fn can_perform(&mut self, sender: Address, role: B256, params: &[U256]) -> Result<bool> {
        if !self.has_initialized()? {
            return Ok(false);
        }
        let kernel = self.kernel()?;
        if kernel.is_zero() {
            return Ok(false);
        }
        let call = KernelCall::HasPermission {
            who: sender,
            app: self.this(),
            role,
            how: params.to_vec(),
        };
        self.view(kernel, &call)
    }

    fn auth(&mut self, role: B256) -> Result<()> {
        self.auth_p(role, &[])
    }

    fn auth_p(&mut self, role: B256, params: &[U256]) -> Result<()> {
        let sender = self.sender();
        if !self.can_perform(sender, role, params)? {
            return Err(Error::AuthFailed { role }.into());
        }
        Ok(())
    }

    fn app_call(&mut self, call: AppCall) -> Result<Vec<u8>> {
        match call {
            AppCall::Kernel => abi::encode(&self.kernel()?),
            AppCall::AppId => abi::encode(&self.app_id()?),
            AppCall::HasInitialized => abi::encode(&self.has_initialized()?),
            AppCall::GetInitializationBlock => abi::encode(&self.initialization_block()?),
            AppCall::IsPetrified => abi::encode(&self.is_petrified()?),
            AppCall::CanPerform {
                sender,
                role,
                params,
            } => abi::encode(&self.can_perform(sender, role, &params)?),
        }
    }
}

/// A decoded payload: either the component's own call or a shared app call.
#[derive(Debug)]
pub enum Dispatch<C> {
    Own(C),
    App(AppCall),
}

/// Decode `data` for a component whose own calls are `C`.
pub fn decode_call<C: DeserializeOwned>(data: &[u8]) -> Result<Dispatch<C>> {
    match abi::decode::<AppCall>(data) {
        Ok(call) => Ok(Dispatch::App(call)),
        Err(_) => Ok(Dispatch::Own(abi::decode(data)?)),
    }
}

/// Constructor of app bases: petrify unless told otherwise.
pub fn construct_base(env: &mut Env<'_>, args: &[u8]) -> Result<()> {
    let args: BaseArgs = if args.is_empty() {
        BaseArgs::default()
    } else {
        abi::decode(args)?
    };
    if args.petrify {
        env.petrify()?;
    }
    Ok(())
}
