//! Event types for the event log.

use alloy_primitives::{Address, B256, Bytes};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of event that occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// A plain grant was set or cleared for `entity`.
    SetPermission {
        entity: Address,
        app: Address,
        role: B256,
        allowed: bool,
    },
    /// A grant now carries a parameter list.
    SetPermissionParams {
        entity: Address,
        app: Address,
        role: B256,
        params_hash: B256,
    },
    /// The manager of `(app, role)` changed. A zero manager means removed.
    ChangePermissionManager {
        app: Address,
        role: B256,
        manager: Address,
    },
    /// A registry slot was written.
    SetApp {
        namespace: B256,
        app_id: B256,
        app: Address,
    },
    /// A proxy instance was created.
    NewAppProxy {
        proxy: Address,
        upgradeable: bool,
        app_id: B256,
    },
    /// A script executor became active under `executor_id`.
    EnableExecutor { executor_id: u32, executor: Address },
    /// A script executor was switched off.
    DisableExecutor { executor_id: u32, executor: Address },
    /// A script action is about to be invoked.
    LogScriptCall {
        sender: Address,
        src: Address,
        dst: Address,
    },
    /// A script finished executing.
    ScriptResult {
        executor: Address,
        script_hash: B256,
        input: Bytes,
        return_data: Bytes,
    },
}

impl EventKind {
    /// Stable name used for filtering.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::SetPermission { .. } => "set_permission",
            EventKind::SetPermissionParams { .. } => "set_permission_params",
            EventKind::ChangePermissionManager { .. } => "change_permission_manager",
            EventKind::SetApp { .. } => "set_app",
            EventKind::NewAppProxy { .. } => "new_app_proxy",
            EventKind::EnableExecutor { .. } => "enable_executor",
            EventKind::DisableExecutor { .. } => "disable_executor",
            EventKind::LogScriptCall { .. } => "log_script_call",
            EventKind::ScriptResult { .. } => "script_result",
        }
    }
}

/// An event in the log, attributed to the component that emitted it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub emitter: Address,
    pub block: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
}

impl Event {
    pub fn new(emitter: Address, block: u64, kind: EventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            emitter,
            block,
            timestamp: Utc::now(),
            kind,
        }
    }
}

/// Filter for [`crate::StateStore::load_events`].
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub emitter: Option<Address>,
    pub kind: Option<String>,
    pub limit: Option<usize>,
}

impl EventFilter {
    pub fn emitter(mut self, emitter: Address) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
