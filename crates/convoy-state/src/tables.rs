//! redb table definitions for the Convoy state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain
//! types), except `SEQUENCES` which stores raw counters.

use redb::TableDefinition;

/// Deployments keyed by `{deployment_id}`.
pub const DEPLOYMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("deployments");

/// Deployment history keyed by `{deployment_id}:{seq:020}`.
pub const DEPLOYMENT_PROCESSES: TableDefinition<&str, &[u8]> =
    TableDefinition::new("deployment_processes");

/// Live processes keyed by `{process_id}`.
pub const PROCESSES: TableDefinition<&str, &[u8]> = TableDefinition::new("processes");

/// Route bindings keyed by `{binding_id}`.
pub const ROUTE_BINDINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("route_bindings");

/// Published route sets keyed by `{process_id}`.
pub const PROCESS_ROUTES: TableDefinition<&str, &[u8]> = TableDefinition::new("process_routes");

/// Audit events keyed by `{seq:020}`.
pub const APP_EVENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("app_events");

/// Monotonic counters keyed by sequence name.
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");
