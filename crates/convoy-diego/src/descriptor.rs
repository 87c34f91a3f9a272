//! Scheduler-facing descriptor types.

use serde::{Deserialize, Serialize};

/// An artifact the scheduler downloads once per cell and reuses by `cache_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedDependency {
    pub from: String,
    pub to: String,
    pub cache_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadAction {
    pub from: String,
    pub to: String,
    pub cache_key: String,
    pub user: String,
    pub checksum_algorithm: String,
    pub checksum_value: String,
}

/// Container actions, serialized as `{"<kind>_action": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    SerialAction { actions: Vec<Action> },
    DownloadAction(DownloadAction),
}

impl Action {
    pub fn serial(actions: Vec<Action>) -> Self {
        Action::SerialAction { actions }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
}

/// Everything the scheduler needs to place and start one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredStateDescriptor {
    pub stack: String,
    pub root_fs: String,
    pub cached_dependencies: Vec<CachedDependency>,
    pub setup: Action,
    pub ports: Vec<u16>,
    pub privileged: bool,
    pub user: String,
    pub env: Vec<EnvironmentVariable>,
}

impl DesiredStateDescriptor {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
