//! Route recomputation. Keeps a process's published route set in step
//! with its route bindings.
//!
//! `ProcessRouteHandler` reads the bindings that remain for a process and
//! rewrites its `ProcessRouteSet`, bumping the revision and the process's
//! `updated_at` so the runtime layer picks up the change.

use convoy_state::{ProcessRouteSet, RouteBinding, StateTxn, epoch_secs};
use tracing::debug;

use crate::error::{RoutingError, RoutingResult};

/// Whether to validate the process and its bindings before publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Perform,
    Skip,
}

/// Recomputes and republishes the routes bound to a process.
pub trait RouteHandler: Send + Sync {
    fn update_route_information(
        &self,
        txn: &StateTxn,
        process_id: &str,
        validation: Validation,
    ) -> RoutingResult<ProcessRouteSet>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRouteHandler;

impl RouteHandler for ProcessRouteHandler {
    fn update_route_information(
        &self,
        txn: &StateTxn,
        process_id: &str,
        validation: Validation,
    ) -> RoutingResult<ProcessRouteSet> {
        let bindings = txn.list_route_bindings_for_process(process_id)?;
        if validation == Validation::Perform {
            validate(txn, process_id, &bindings)?;
        }

        let mut route_ids: Vec<String> = bindings.into_iter().map(|b| b.route_id).collect();
        route_ids.sort();
        route_ids.dedup();

        let now = epoch_secs();
        let revision = txn
            .get_process_routes(process_id)?
            .map_or(0, |previous| previous.revision)
            + 1;
        let routes = ProcessRouteSet {
            process_id: process_id.to_string(),
            route_ids,
            revision,
            updated_at: now,
        };
        txn.put_process_routes(&routes)?;

        if let Some(mut process) = txn.get_process(process_id)? {
            process.updated_at = now;
            txn.put_process(&process)?;
        }

        debug!(
            process = %process_id,
            routes = routes.route_ids.len(),
            revision,
            "route information updated"
        );
        Ok(routes)
    }
}

/// The process must exist and every binding must belong to its app.
fn validate(txn: &StateTxn, process_id: &str, bindings: &[RouteBinding]) -> RoutingResult<()> {
    let process = txn
        .get_process(process_id)?
        .ok_or_else(|| RoutingError::Validation {
            field: "process",
            message: format!("process {process_id} does not exist"),
        })?;

    if let Some(conflict) = bindings.iter().find(|b| b.app_id != process.app_id) {
        return Err(RoutingError::Validation {
            field: "route_binding",
            message: format!(
                "binding {} belongs to app {}, process {} to app {}",
                conflict.id, conflict.app_id, process.id, process.app_id
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoy_state::{Process, ProcessState, StateStore};

    fn process(id: &str, app_id: &str) -> Process {
        Process {
            id: id.to_string(),
            app_id: app_id.to_string(),
            process_type: "web".to_string(),
            state: ProcessState::Started,
            created_at: 1000,
            updated_at: 1000,
        }
    }

    fn binding(id: &str, app_id: &str, route_id: &str, process_id: &str) -> RouteBinding {
        RouteBinding {
            id: id.to_string(),
            app_id: app_id.to_string(),
            route_id: route_id.to_string(),
            process_id: process_id.to_string(),
            process_type: "web".to_string(),
        }
    }

    fn update(store: &StateStore, process_id: &str, validation: Validation) -> RoutingResult<ProcessRouteSet> {
        store.transaction(|txn| {
            ProcessRouteHandler.update_route_information(txn, process_id, validation)
        })
    }

    #[test]
    fn route_set_reflects_bindings() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_process(&process("p1", "app-1")).unwrap();
        store.put_route_binding(&binding("b1", "app-1", "route-b", "p1")).unwrap();
        store.put_route_binding(&binding("b2", "app-1", "route-a", "p1")).unwrap();
        store.put_route_binding(&binding("b3", "app-1", "route-a", "p1")).unwrap();
        store.put_route_binding(&binding("b4", "app-1", "route-c", "p2")).unwrap();

        let routes = update(&store, "p1", Validation::Perform).unwrap();
        assert_eq!(routes.route_ids, vec!["route-a", "route-b"]);
        assert_eq!(routes.revision, 1);
        assert_eq!(store.get_process_routes("p1").unwrap(), Some(routes));
        assert!(store.get_process("p1").unwrap().unwrap().updated_at > 1000);
    }

    #[test]
    fn revision_increments() {
        let store = StateStore::open_in_memory().unwrap();
        update(&store, "p1", Validation::Skip).unwrap();
        let second = update(&store, "p1", Validation::Skip).unwrap();
        assert_eq!(second.revision, 2);
        assert!(second.route_ids.is_empty());
    }

    #[test]
    fn validation_requires_existing_process() {
        let store = StateStore::open_in_memory().unwrap();
        let err = update(&store, "ghost", Validation::Perform).unwrap_err();
        assert!(matches!(err, RoutingError::Validation { field: "process", .. }));
        assert!(store.get_process_routes("ghost").unwrap().is_none());
    }

    #[test]
    fn validation_rejects_foreign_bindings() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_process(&process("p1", "app-1")).unwrap();
        store.put_route_binding(&binding("b1", "app-2", "route-a", "p1")).unwrap();

        let err = update(&store, "p1", Validation::Perform).unwrap_err();
        assert!(matches!(err, RoutingError::Validation { field: "route_binding", .. }));
    }

    #[test]
    fn skipping_validation_publishes_anyway() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_route_binding(&binding("b1", "app-2", "route-a", "ghost")).unwrap();

        let routes = update(&store, "ghost", Validation::Skip).unwrap();
        assert_eq!(routes.route_ids, vec!["route-a"]);
    }
}
