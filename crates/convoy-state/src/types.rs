//! Domain types for the Convoy state store.
//!
//! Relations between records are plain identifier fields; callers resolve
//! them through the store on demand. All types are serializable to/from
//! JSON for storage in redb tables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type DeploymentId = String;
pub type ProcessId = String;
pub type AppId = String;
pub type RouteId = String;
pub type RouteBindingId = String;

// ── Deployment ─────────────────────────────────────────────────────

/// Rollout state as stored. Values written by older or foreign controllers
/// are kept verbatim in `Unrecognized`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeploymentState {
    Deploying,
    Deployed,
    Canceling,
    Canceled,
    Unrecognized(String),
}

impl DeploymentState {
    pub fn as_str(&self) -> &str {
        match self {
            DeploymentState::Deploying => "DEPLOYING",
            DeploymentState::Deployed => "DEPLOYED",
            DeploymentState::Canceling => "CANCELING",
            DeploymentState::Canceled => "CANCELED",
            DeploymentState::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for DeploymentState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "DEPLOYING" => DeploymentState::Deploying,
            "DEPLOYED" => DeploymentState::Deployed,
            "CANCELING" => DeploymentState::Canceling,
            "CANCELED" => DeploymentState::Canceled,
            _ => DeploymentState::Unrecognized(raw),
        }
    }
}

impl From<&str> for DeploymentState {
    fn from(raw: &str) -> Self {
        DeploymentState::from(raw.to_string())
    }
}

impl From<DeploymentState> for String {
    fn from(state: DeploymentState) -> Self {
        match state {
            DeploymentState::Unrecognized(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A rolling replacement of an app's processes with a new droplet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deployment {
    pub id: DeploymentId,
    pub state: DeploymentState,
    pub app_id: AppId,
    pub droplet_id: String,
    pub deploying_web_process_id: Option<ProcessId>,
    /// Unix timestamp (seconds) when the rollout started.
    pub created_at: u64,
    /// Unix timestamp (seconds) of the last state write.
    pub updated_at: u64,
}

/// Snapshot of one process that took part in a deployment.
///
/// `process_id` and `process_type` are copies, not references: the process
/// may have been deleted since the entry was written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeploymentHistoryEntry {
    pub deployment_id: DeploymentId,
    pub process_id: ProcessId,
    pub process_type: String,
    /// Insertion sequence, unique per store.
    pub seq: u64,
    pub created_at: u64,
}

// ── Processes & routes ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessState {
    Started,
    Stopped,
}

/// A live process of an app.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Process {
    pub id: ProcessId,
    pub app_id: AppId,
    pub process_type: String,
    pub state: ProcessState,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Active association between a route and one process type of an app.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteBinding {
    pub id: RouteBindingId,
    pub app_id: AppId,
    pub route_id: RouteId,
    pub process_id: ProcessId,
    pub process_type: String,
}

/// Routes currently bound to a process, as last published to the runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessRouteSet {
    pub process_id: ProcessId,
    /// Sorted, without duplicates.
    pub route_ids: Vec<RouteId>,
    /// Bumped on every recomputation.
    pub revision: u64,
    pub updated_at: u64,
}

// ── Audit ──────────────────────────────────────────────────────────

/// Identity of whoever triggered an audited action.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserAuditInfo {
    pub user_guid: String,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppEvent {
    pub id: String,
    /// e.g. `audit.app.unmap-route`
    pub event_type: String,
    pub actor: UserAuditInfo,
    /// App the event is about.
    pub actee: AppId,
    pub timestamp: u64,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Deployment {
    /// Key for the deployments table.
    pub fn table_key(&self) -> String {
        self.id.clone()
    }
}

impl DeploymentHistoryEntry {
    /// Composite key for the history table; prefix-scannable by deployment.
    pub fn table_key(&self) -> String {
        history_key(&self.deployment_id, self.seq)
    }
}

/// `{deployment_id}:{seq}` with a zero-padded sequence so keys sort numerically.
pub fn history_key(deployment_id: &str, seq: u64) -> String {
    format!("{}{seq:020}", history_prefix(deployment_id))
}

pub fn history_prefix(deployment_id: &str) -> String {
    format!("{deployment_id}:")
}
