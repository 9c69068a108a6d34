//! Keel runtime: the host that components execute in.
//!
//! This crate provides a deterministic, single-threaded execution host for
//! components that keep all of their state in fixed storage slots. It is the
//! layer that makes proxies, permission checks and scripts possible:
//!
//! - **Runtime**: owns the state store and the code catalog, mines one block
//!   per transaction and rolls back everything a failed transaction touched.
//! - **Env**: what a component sees while running. It reads and writes the
//!   storage of the frame's address, emits events, and opens child frames
//!   with `call`, `static_call`, `delegate_call` and `create`.
//! - **Component**: the trait implemented by deployable code.
//! - **Gas**: every operation is metered, and sub-calls can be capped so a
//!   misbehaving callee cannot exhaust its caller's budget.
//!
//! # Example
//!
//! ```ignore
//! use runtime::{Component, Env, Result, Runtime, abi};
//!
//! struct Echo;
//!
//! impl Component for Echo {
//!     fn invoke(&self, _env: &mut Env<'_>, data: &[u8]) -> Result<Vec<u8>> {
//!         Ok(data.to_vec())
//!     }
//! }
//!
//! let mut rt = Runtime::in_memory()?;
//! rt.install("echo", Echo);
//! let echo = rt.deploy(deployer, "echo", &[])?;
//! let out = rt.transact(sender, echo, b"hello")?;
//! ```

pub mod abi;
mod component;
mod config;
mod env;
mod error;
pub mod gas;
mod runtime;

pub use component::{Catalog, Component};
pub use config::RuntimeConfig;
pub use env::{Env, Frame, derive_address};
pub use error::{Error, Result};
pub use runtime::{Block, Runtime};
