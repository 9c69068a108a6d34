//! SQLite state store implementation.

use crate::{Error, Event, EventFilter, Result, Slot};
use alloy_primitives::Address;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cell::Cell;
use std::path::Path;

/// SQLite-backed state store.
///
/// Holds the storage slots of every component, the code table mapping
/// deployed addresses to code names, the event log and a small metadata
/// table. Writes are grouped with nested savepoints so that any call frame
/// can be undone without touching the work of its callers.
pub struct StateStore {
    conn: Connection,
    depth: Cell<usize>,
}

/// Handle to an open savepoint. Must be released or rolled back innermost first.
#[derive(Debug)]
#[must_use = "a savepoint must be released or rolled back"]
pub struct Savepoint {
    depth: usize,
}

impl StateStore {
    /// Open or create a state store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn,
            depth: Cell::new(0),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory state store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn,
            depth: Cell::new(0),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS slots (
                owner BLOB NOT NULL,
                slot BLOB NOT NULL,
                value BLOB NOT NULL,
                PRIMARY KEY (owner, slot)
            );
            CREATE TABLE IF NOT EXISTS codes (
                address BLOB PRIMARY KEY,
                name TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS events (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL,
                emitter BLOB NOT NULL,
                block INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                kind TEXT NOT NULL,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_events_emitter
                ON events(emitter, seq);
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Read the raw value stored at `slot` of `owner`.
    pub fn load(&self, owner: Address, slot: Slot) -> Result<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM slots WHERE owner = ?1 AND slot = ?2",
                params![owner.as_slice(), slot.as_bytes()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Write the raw value at `slot` of `owner`, replacing any previous value.
    pub fn store(&self, owner: Address, slot: Slot, value: &[u8]) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO slots (owner, slot, value) VALUES (?1, ?2, ?3)",
            params![owner.as_slice(), slot.as_bytes(), value],
        )?;
        Ok(())
    }

    /// Remove the value at `slot` of `owner`.
    pub fn clear(&self, owner: Address, slot: Slot) -> Result<()> {
        self.conn.execute(
            "DELETE FROM slots WHERE owner = ?1 AND slot = ?2",
            params![owner.as_slice(), slot.as_bytes()],
        )?;
        Ok(())
    }

    /// Name of the code deployed at `address`, if any.
    pub fn code_name(&self, address: Address) -> Result<Option<String>> {
        let name = self
            .conn
            .query_row(
                "SELECT name FROM codes WHERE address = ?1",
                [address.as_slice()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name)
    }

    /// Record that `address` runs the code called `name`.
    pub fn set_code(&self, address: Address, name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO codes (address, name) VALUES (?1, ?2)",
            params![address.as_slice(), name],
        )?;
        Ok(())
    }

    /// Append an event to the log.
    pub fn append(&self, event: &Event) -> Result<()> {
        self.conn.execute(
            "INSERT INTO events (id, emitter, block, timestamp, kind, data) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.id.to_string(),
                event.emitter.as_slice(),
                event.block as i64,
                event.timestamp.to_rfc3339(),
                event.kind.name(),
                serde_json::to_string(&event.kind)?,
            ],
        )?;
        Ok(())
    }

    /// Load events in emission order.
    ///
    /// With a limit, the most recent `limit` matching events are returned,
    /// still oldest first.
    pub fn load_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, emitter, block, timestamp, data FROM events
             WHERE (?1 IS NULL OR emitter = ?1) AND (?2 IS NULL OR kind = ?2)
             ORDER BY seq DESC LIMIT ?3",
        )?;

        let emitter = filter.emitter.map(|a| a.as_slice().to_vec());
        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);

        let rows = stmt.query_map(params![emitter, filter.kind, limit], |row| {
            let id: String = row.get(0)?;
            let emitter: Vec<u8> = row.get(1)?;
            let block: i64 = row.get(2)?;
            let timestamp: String = row.get(3)?;
            let data: String = row.get(4)?;
            Ok((id, emitter, block, timestamp, data))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, emitter, block, timestamp, data) = row?;
            if emitter.len() != 20 {
                return Err(Error::Corrupt(format!("emitter of event {id}")));
            }
            events.push(Event {
                id: id
                    .parse()
                    .map_err(|_| Error::Corrupt(format!("event id {id}")))?,
                emitter: Address::from_slice(&emitter),
                block: block as u64,
                timestamp: timestamp
                    .parse()
                    .map_err(|_| Error::Corrupt(format!("timestamp of event {id}")))?,
                kind: serde_json::from_str(&data)?,
            });
        }
        events.reverse();
        Ok(events)
    }

    /// Read a metadata value.
    pub fn meta<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        raw.map(|r| serde_json::from_str(&r))
            .transpose()
            .map_err(Error::from)
    }

    /// Write a metadata value.
    pub fn set_meta<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![key, serde_json::to_string(value)?],
        )?;
        Ok(())
    }

    /// Number of open savepoints.
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    /// Open a nested savepoint.
    pub fn savepoint(&self) -> Result<Savepoint> {
        let depth = self.depth.get() + 1;
        self.conn.execute_batch(&format!("SAVEPOINT sp_{depth}"))?;
        self.depth.set(depth);
        Ok(Savepoint { depth })
    }

    /// Keep everything written since `sp` was opened.
    ///
    /// Releasing the outermost savepoint commits to the database.
    pub fn release(&self, sp: Savepoint) -> Result<()> {
        self.check_innermost(&sp)?;
        self.conn.execute_batch(&format!("RELEASE sp_{}", sp.depth))?;
        self.depth.set(sp.depth - 1);
        Ok(())
    }

    /// Discard everything written since `sp` was opened.
    pub fn rollback(&self, sp: Savepoint) -> Result<()> {
        self.check_innermost(&sp)?;
        self.conn.execute_batch(&format!(
            "ROLLBACK TO sp_{depth}; RELEASE sp_{depth}",
            depth = sp.depth
        ))?;
        self.depth.set(sp.depth - 1);
        Ok(())
    }

    fn check_innermost(&self, sp: &Savepoint) -> Result<()> {
        let actual = self.depth.get();
        if sp.depth != actual {
            return Err(Error::SavepointOrder {
                expected: sp.depth,
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventKind;
    use alloy_primitives::B256;

    fn owner() -> Address {
        Address::with_last_byte(7)
    }

    #[test]
    fn store_and_load_slot() {
        let store = StateStore::in_memory().unwrap();
        let slot = Slot::named("x");
        assert_eq!(store.load(owner(), slot).unwrap(), None);

        store.store(owner(), slot, b"one").unwrap();
        store.store(owner(), slot, b"two").unwrap();
        assert_eq!(store.load(owner(), slot).unwrap(), Some(b"two".to_vec()));

        // Slots are per owner.
        assert_eq!(store.load(Address::ZERO, slot).unwrap(), None);

        store.clear(owner(), slot).unwrap();
        assert_eq!(store.load(owner(), slot).unwrap(), None);
    }

    #[test]
    fn nested_rollback_keeps_outer_writes() {
        let store = StateStore::in_memory().unwrap();
        let slot = Slot::named("x");

        let outer = store.savepoint().unwrap();
        store.store(owner(), slot, b"outer").unwrap();

        let inner = store.savepoint().unwrap();
        store.store(owner(), slot, b"inner").unwrap();
        store.set_code(owner(), "thing").unwrap();
        store.rollback(inner).unwrap();

        assert_eq!(store.load(owner(), slot).unwrap(), Some(b"outer".to_vec()));
        assert_eq!(store.code_name(owner()).unwrap(), None);

        store.release(outer).unwrap();
        assert_eq!(store.depth(), 0);
        assert_eq!(store.load(owner(), slot).unwrap(), Some(b"outer".to_vec()));
    }

    #[test]
    fn releasing_out_of_order_fails() {
        let store = StateStore::in_memory().unwrap();
        let outer = store.savepoint().unwrap();
        let inner = store.savepoint().unwrap();
        assert!(matches!(
            store.release(outer),
            Err(Error::SavepointOrder { expected: 1, actual: 2 })
        ));
        store.release(inner).unwrap();
    }

    #[test]
    fn events_filter_and_limit() {
        let store = StateStore::in_memory().unwrap();
        let other = Address::with_last_byte(9);
        for i in 0..3u8 {
            store
                .append(&Event::new(
                    owner(),
                    u64::from(i),
                    EventKind::SetApp {
                        namespace: B256::ZERO,
                        app_id: B256::with_last_byte(i),
                        app: other,
                    },
                ))
                .unwrap();
        }
        store
            .append(&Event::new(
                other,
                4,
                EventKind::ChangePermissionManager {
                    app: other,
                    role: B256::ZERO,
                    manager: owner(),
                },
            ))
            .unwrap();

        let all = store.load_events(&EventFilter::default()).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].block, 0);

        let mine = store
            .load_events(&EventFilter::default().emitter(owner()))
            .unwrap();
        assert_eq!(mine.len(), 3);

        let last_two = store
            .load_events(&EventFilter::default().kind("set_app").limit(2))
            .unwrap();
        assert_eq!(
            last_two.iter().map(|e| e.block).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn on_disk_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");
        {
            let store = StateStore::open(&path).unwrap();
            store.store(owner(), Slot::named("k"), b"v").unwrap();
            store.set_meta("kernel", &owner()).unwrap();
        }
        let store = StateStore::open(&path).unwrap();
        assert_eq!(
            store.load(owner(), Slot::named("k")).unwrap(),
            Some(b"v".to_vec())
        );
        assert_eq!(store.meta::<Address>("kernel").unwrap(), Some(owner()));
    }
}
