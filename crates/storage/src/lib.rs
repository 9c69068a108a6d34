//! SQLite-backed state for the keel runtime.
//!
//! This crate provides persistent storage for everything the runtime keeps
//! between invocations: the storage slots of every deployed component, the
//! table that says which code runs at which address, and the event log that
//! records every permission change, registry write and script execution.
//!
//! # Overview
//!
//! ## StateStore
//!
//! The [`StateStore`] wraps a SQLite database. Components never see it
//! directly; the runtime reads and writes slots on their behalf, always scoped
//! to the address a frame executes for.
//!
//! ## Slot
//!
//! A [`Slot`] is a 32-byte storage position. Positions are derived from
//! stable names (and hashed mapping keys), never from field order, which is
//! what lets an implementation be swapped under a proxy without corrupting the
//! proxy's state.
//!
//! ## Savepoints
//!
//! Every call frame opens a [`Savepoint`]. A failed frame rolls back its
//! slots, code deployments and events; a successful one releases into its
//! caller. Releasing the outermost savepoint commits.
//!
//! # Example
//!
//! ```no_run
//! use storage::{Slot, StateStore};
//! use alloy_primitives::Address;
//!
//! let store = StateStore::open("state.db")?;
//! let owner = Address::with_last_byte(1);
//!
//! let sp = store.savepoint()?;
//! store.store(owner, Slot::named("counter"), b"1")?;
//! store.rollback(sp)?;
//!
//! assert_eq!(store.load(owner, Slot::named("counter"))?, None);
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod event;
mod slot;
mod store;

pub use error::{Error, Result};
pub use event::{Event, EventFilter, EventKind};
pub use slot::Slot;
pub use store::{Savepoint, StateStore};
