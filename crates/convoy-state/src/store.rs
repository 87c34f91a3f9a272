//! StateStore: redb-backed state persistence for Convoy.
//!
//! Reads go through `StateStore` directly. Every mutation runs inside
//! [`StateStore::transaction`], which hands the closure a [`StateTxn`] and
//! commits only if the closure succeeds; on error all of its writes are
//! rolled back. The store supports both on-disk and in-memory backends
//! (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

/// One open write transaction. Obtained from [`StateStore::transaction`].
pub struct StateTxn {
    txn: WriteTransaction,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        for table in [
            DEPLOYMENTS,
            DEPLOYMENT_PROCESSES,
            PROCESSES,
            ROUTE_BINDINGS,
            PROCESS_ROUTES,
            APP_EVENTS,
        ] {
            txn.open_table(table).map_err(map_err!(Table))?;
        }
        txn.open_table(SEQUENCES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Run `f` inside a single write transaction.
    ///
    /// Commits when `f` returns `Ok`; aborts otherwise, discarding every
    /// write `f` made. Re-running a failed closure is safe as long as it
    /// re-reads what it needs from `txn`.
    pub fn transaction<T, E>(&self, f: impl FnOnce(&StateTxn) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StateError>,
    {
        let txn = StateTxn {
            txn: self.db.begin_write().map_err(map_err!(Transaction))?,
        };
        match f(&txn) {
            Ok(value) => {
                txn.txn.commit().map_err(map_err!(Transaction))?;
                Ok(value)
            }
            Err(err) => {
                match txn.txn.abort() {
                    Ok(()) => debug!("transaction rolled back"),
                    Err(abort) => warn!(error = %abort, "transaction abort failed"),
                }
                Err(err)
            }
        }
    }

    // ── Deployments ────────────────────────────────────────────────

    /// Get a deployment by ID.
    pub fn get_deployment(&self, id: &str) -> StateResult<Option<Deployment>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
        read_json(&table, id)
    }

    /// List all deployments.
    pub fn list_deployments(&self) -> StateResult<Vec<Deployment>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
        scan_json(&table, "")
    }

    // ── Deployment history ─────────────────────────────────────────

    /// History entries for one deployment, in insertion order.
    pub fn list_history(&self, deployment_id: &str) -> StateResult<Vec<DeploymentHistoryEntry>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(DEPLOYMENT_PROCESSES).map_err(map_err!(Table))?;
        scan_json(&table, &history_prefix(deployment_id))
    }

    /// Number of history entries across all deployments.
    pub fn count_history(&self) -> StateResult<u64> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(DEPLOYMENT_PROCESSES).map_err(map_err!(Table))?;
        table.len().map_err(map_err!(Read))
    }

    // ── Processes ──────────────────────────────────────────────────

    /// Get a process by ID.
    pub fn get_process(&self, id: &str) -> StateResult<Option<Process>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(PROCESSES).map_err(map_err!(Table))?;
        read_json(&table, id)
    }

    /// Insert or update a process in its own transaction.
    pub fn put_process(&self, process: &Process) -> StateResult<()> {
        self.transaction(|txn| txn.put_process(process))
    }

    /// Get the published route set of a process.
    pub fn get_process_routes(&self, process_id: &str) -> StateResult<Option<ProcessRouteSet>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(PROCESS_ROUTES).map_err(map_err!(Table))?;
        read_json(&table, process_id)
    }

    // ── Route bindings ─────────────────────────────────────────────

    /// Get a route binding by ID.
    pub fn get_route_binding(&self, id: &str) -> StateResult<Option<RouteBinding>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(ROUTE_BINDINGS).map_err(map_err!(Table))?;
        read_json(&table, id)
    }

    /// List all route bindings.
    pub fn list_route_bindings(&self) -> StateResult<Vec<RouteBinding>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(ROUTE_BINDINGS).map_err(map_err!(Table))?;
        scan_json(&table, "")
    }

    /// Insert or update a route binding in its own transaction.
    pub fn put_route_binding(&self, binding: &RouteBinding) -> StateResult<()> {
        self.transaction(|txn| txn.put_route_binding(binding))
    }

    // ── Audit events ───────────────────────────────────────────────

    /// All audit events, oldest first.
    pub fn list_app_events(&self) -> StateResult<Vec<AppEvent>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(APP_EVENTS).map_err(map_err!(Table))?;
        scan_json(&table, "")
    }
}

impl StateTxn {
    /// Next value of a named monotonic counter, starting at 1.
    pub fn next_sequence(&self, name: &str) -> StateResult<u64> {
        let mut table = self.txn.open_table(SEQUENCES).map_err(map_err!(Table))?;
        let current = table
            .get(name)
            .map_err(map_err!(Read))?
            .map(|guard| guard.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(name, next).map_err(map_err!(Write))?;
        Ok(next)
    }

    // ── Deployments ────────────────────────────────────────────────

    /// Get a deployment by ID.
    pub fn get_deployment(&self, id: &str) -> StateResult<Option<Deployment>> {
        self.read(DEPLOYMENTS, id)
    }

    /// Insert or update a deployment.
    pub fn put_deployment(&self, deployment: &Deployment) -> StateResult<()> {
        self.write(DEPLOYMENTS, &deployment.table_key(), deployment)
    }

    /// Delete a deployment record only. Returns true if it existed.
    pub fn delete_deployment(&self, id: &str) -> StateResult<bool> {
        self.remove(DEPLOYMENTS, id)
    }

    // ── Deployment history ─────────────────────────────────────────

    /// Insert a history entry.
    pub fn put_history_entry(&self, entry: &DeploymentHistoryEntry) -> StateResult<()> {
        self.write(DEPLOYMENT_PROCESSES, &entry.table_key(), entry)
    }

    /// History entries for one deployment, in insertion order.
    pub fn list_history(&self, deployment_id: &str) -> StateResult<Vec<DeploymentHistoryEntry>> {
        let table = self
            .txn
            .open_table(DEPLOYMENT_PROCESSES)
            .map_err(map_err!(Table))?;
        scan_json(&table, &history_prefix(deployment_id))
    }

    /// Delete every history entry of one deployment. Returns number deleted.
    pub fn delete_history_for_deployment(&self, deployment_id: &str) -> StateResult<u32> {
        let prefix = history_prefix(deployment_id);
        let mut table = self
            .txn
            .open_table(DEPLOYMENT_PROCESSES)
            .map_err(map_err!(Table))?;
        let keys = scan_keys(&table, &prefix)?;
        for key in &keys {
            table.remove(key.as_str()).map_err(map_err!(Write))?;
        }
        Ok(keys.len() as u32)
    }

    // ── Processes ──────────────────────────────────────────────────

    /// Get a process by ID.
    pub fn get_process(&self, id: &str) -> StateResult<Option<Process>> {
        self.read(PROCESSES, id)
    }

    /// Insert or update a process.
    pub fn put_process(&self, process: &Process) -> StateResult<()> {
        self.write(PROCESSES, &process.id, process)
    }

    /// Get the published route set of a process.
    pub fn get_process_routes(&self, process_id: &str) -> StateResult<Option<ProcessRouteSet>> {
        self.read(PROCESS_ROUTES, process_id)
    }

    /// Insert or update the published route set of a process.
    pub fn put_process_routes(&self, routes: &ProcessRouteSet) -> StateResult<()> {
        self.write(PROCESS_ROUTES, &routes.process_id, routes)
    }

    // ── Route bindings ─────────────────────────────────────────────

    /// Get a route binding by ID.
    pub fn get_route_binding(&self, id: &str) -> StateResult<Option<RouteBinding>> {
        self.read(ROUTE_BINDINGS, id)
    }

    /// Insert or update a route binding.
    pub fn put_route_binding(&self, binding: &RouteBinding) -> StateResult<()> {
        self.write(ROUTE_BINDINGS, &binding.id, binding)
    }

    /// Delete a route binding. Returns true if it existed.
    pub fn delete_route_binding(&self, id: &str) -> StateResult<bool> {
        self.remove(ROUTE_BINDINGS, id)
    }

    /// List the route bindings of one process.
    pub fn list_route_bindings_for_process(&self, process_id: &str) -> StateResult<Vec<RouteBinding>> {
        let table = self.txn.open_table(ROUTE_BINDINGS).map_err(map_err!(Table))?;
        let all: Vec<RouteBinding> = scan_json(&table, "")?;
        Ok(all.into_iter().filter(|b| b.process_id == process_id).collect())
    }

    // ── Audit events ───────────────────────────────────────────────

    /// Append an audit event, assigning it the next id (`app-event-{seq}`).
    pub fn append_app_event(&self, mut event: AppEvent) -> StateResult<AppEvent> {
        let seq = self.next_sequence("app_events")?;
        event.id = format!("app-event-{seq}");
        self.write(APP_EVENTS, &format!("{seq:020}"), &event)?;
        Ok(event)
    }

    // ── Helpers ────────────────────────────────────────────────────

    fn read<T: DeserializeOwned>(&self, def: JsonTable, key: &str) -> StateResult<Option<T>> {
        let table = self.txn.open_table(def).map_err(map_err!(Table))?;
        read_json(&table, key)
    }

    fn write<T: Serialize>(&self, def: JsonTable, key: &str, value: &T) -> StateResult<()> {
        let bytes = serde_json::to_vec(value).map_err(map_err!(Serialize))?;
        let mut table = self.txn.open_table(def).map_err(map_err!(Table))?;
        table
            .insert(key, bytes.as_slice())
            .map_err(map_err!(Write))?;
        Ok(())
    }

    fn remove(&self, def: JsonTable, key: &str) -> StateResult<bool> {
        let mut table = self.txn.open_table(def).map_err(map_err!(Table))?;
        let existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        Ok(existed)
    }
}

fn read_json<T, R>(table: &R, key: &str) -> StateResult<Option<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key).map_err(map_err!(Read))? {
        Some(guard) => {
            let value = serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Decode every value whose key starts with `prefix` (all values for `""`).
fn scan_json<T, R>(table: &R, prefix: &str) -> StateResult<Vec<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    let mut results = Vec::new();
    for entry in table.range(prefix..).map_err(map_err!(Read))? {
        let (key, value) = entry.map_err(map_err!(Read))?;
        if !key.value().starts_with(prefix) {
            break;
        }
        results.push(serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?);
    }
    Ok(results)
}

fn scan_keys<R>(table: &R, prefix: &str) -> StateResult<Vec<String>>
where
    R: ReadableTable<&'static str, &'static [u8]>,
{
    let mut keys = Vec::new();
    for entry in table.range(prefix..).map_err(map_err!(Read))? {
        let (key, _) = entry.map_err(map_err!(Read))?;
        let key = key.value();
        if !key.starts_with(prefix) {
            break;
        }
        keys.push(key.to_string());
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_deployment(id: &str) -> Deployment {
        Deployment {
            id: id.to_string(),
            state: DeploymentState::Deploying,
            app_id: "app-1".to_string(),
            droplet_id: "droplet-1".to_string(),
            deploying_web_process_id: Some("proc-web".to_string()),
            created_at: 1000,
            updated_at: 1000,
        }
    }

    fn test_binding(id: &str, process_id: &str) -> RouteBinding {
        RouteBinding {
            id: id.to_string(),
            app_id: "app-1".to_string(),
            route_id: format!("route-{id}"),
            process_id: process_id.to_string(),
            process_type: "web".to_string(),
        }
    }

    fn history(deployment_id: &str, seq: u64) -> DeploymentHistoryEntry {
        DeploymentHistoryEntry {
            deployment_id: deployment_id.to_string(),
            process_id: format!("proc-{seq}"),
            process_type: "web".to_string(),
            seq,
            created_at: 1000,
        }
    }

    #[derive(Debug)]
    enum TestError {
        State(StateError),
        Boom,
    }

    impl From<StateError> for TestError {
        fn from(e: StateError) -> Self {
            TestError::State(e)
        }
    }

    // ── Transactions ───────────────────────────────────────────────

    #[test]
    fn committed_transaction_is_visible() {
        let store = StateStore::open_in_memory().unwrap();
        store
            .transaction(|txn| txn.put_deployment(&test_deployment("d1")))
            .unwrap();

        assert_eq!(store.get_deployment("d1").unwrap(), Some(test_deployment("d1")));
    }

    #[test]
    fn failed_transaction_rolls_back_every_write() {
        let store = StateStore::open_in_memory().unwrap();
        let result: Result<(), TestError> = store.transaction(|txn| {
            txn.put_deployment(&test_deployment("d1"))?;
            txn.put_route_binding(&test_binding("b1", "p1"))?;
            Err(TestError::Boom)
        });

        assert!(matches!(result, Err(TestError::Boom)));
        assert!(store.get_deployment("d1").unwrap().is_none());
        assert!(store.get_route_binding("b1").unwrap().is_none());
    }

    #[test]
    fn reads_inside_transaction_see_own_writes() {
        let store = StateStore::open_in_memory().unwrap();
        store
            .transaction(|txn| {
                txn.put_route_binding(&test_binding("b1", "p1"))?;
                assert!(txn.get_route_binding("b1")?.is_some());
                assert!(txn.delete_route_binding("b1")?);
                assert!(!txn.delete_route_binding("b1")?);
                Ok::<_, StateError>(())
            })
            .unwrap();
        assert!(store.get_route_binding("b1").unwrap().is_none());
    }

    #[test]
    fn sequences_are_monotonic_and_independent() {
        let store = StateStore::open_in_memory().unwrap();
        let (a1, a2, b1) = store
            .transaction(|txn| {
                Ok::<_, StateError>((
                    txn.next_sequence("a")?,
                    txn.next_sequence("a")?,
                    txn.next_sequence("b")?,
                ))
            })
            .unwrap();
        assert_eq!((a1, a2, b1), (1, 2, 1));
    }

    // ── History ────────────────────────────────────────────────────

    #[test]
    fn history_scan_is_scoped_to_deployment() {
        let store = StateStore::open_in_memory().unwrap();
        store
            .transaction(|txn| {
                txn.put_history_entry(&history("d1", 1))?;
                txn.put_history_entry(&history("d1", 2))?;
                // "d10" shares a textual prefix with "d1".
                txn.put_history_entry(&history("d10", 3))
            })
            .unwrap();

        assert_eq!(store.list_history("d1").unwrap().len(), 2);
        assert_eq!(store.list_history("d10").unwrap().len(), 1);
        assert_eq!(store.count_history().unwrap(), 3);
    }

    #[test]
    fn delete_history_leaves_other_deployments() {
        let store = StateStore::open_in_memory().unwrap();
        store
            .transaction(|txn| {
                txn.put_history_entry(&history("d1", 1))?;
                txn.put_history_entry(&history("d1", 2))?;
                txn.put_history_entry(&history("d2", 3))
            })
            .unwrap();

        let deleted = store
            .transaction(|txn| txn.delete_history_for_deployment("d1"))
            .unwrap();
        assert_eq!(deleted, 2);
        assert!(store.list_history("d1").unwrap().is_empty());
        assert_eq!(store.list_history("d2").unwrap().len(), 1);
    }

    // ── Route bindings ─────────────────────────────────────────────

    #[test]
    fn bindings_filter_by_process() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_route_binding(&test_binding("b1", "p1")).unwrap();
        store.put_route_binding(&test_binding("b2", "p1")).unwrap();
        store.put_route_binding(&test_binding("b3", "p2")).unwrap();

        let for_p1 = store
            .transaction(|txn| txn.list_route_bindings_for_process("p1"))
            .unwrap();
        assert_eq!(for_p1.len(), 2);
        assert_eq!(store.list_route_bindings().unwrap().len(), 3);
    }

    #[test]
    fn app_events_keep_insertion_order() {
        let store = StateStore::open_in_memory().unwrap();
        for i in 0..12 {
            let event = AppEvent {
                id: String::new(),
                event_type: "audit.app.unmap-route".to_string(),
                actor: UserAuditInfo::default(),
                actee: format!("app-{i}"),
                timestamp: 1000,
                metadata: Default::default(),
            };
            store.transaction(|txn| txn.append_app_event(event)).unwrap();
        }

        let events = store.list_app_events().unwrap();
        assert_eq!(events.len(), 12);
        assert_eq!((events[0].id.as_str(), events[0].actee.as_str()), ("app-event-1", "app-0"));
        assert_eq!((events[11].id.as_str(), events[11].actee.as_str()), ("app-event-12", "app-11"));
    }

    // ── Persistence (on-disk) ──────────────────────────────────────

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.redb");

        {
            let store = StateStore::open(&db_path).unwrap();
            store
                .transaction(|txn| txn.put_deployment(&test_deployment("d1")))
                .unwrap();
        }

        let store = StateStore::open(&db_path).unwrap();
        let deployment = store.get_deployment("d1").unwrap();
        assert_eq!(deployment.map(|d| d.droplet_id), Some("droplet-1".to_string()));
    }

    #[test]
    fn empty_store_operations() {
        let store = StateStore::open_in_memory().unwrap();

        assert!(store.list_deployments().unwrap().is_empty());
        assert!(store.list_history("any").unwrap().is_empty());
        assert!(store.list_route_bindings().unwrap().is_empty());
        assert!(store.list_app_events().unwrap().is_empty());
        assert!(store.get_process("nope").unwrap().is_none());
        assert!(store.get_process_routes("nope").unwrap().is_none());
        assert_eq!(store.count_history().unwrap(), 0);
    }
}
