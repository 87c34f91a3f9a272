//! Audit events for route unmapping.

use std::collections::BTreeMap;

use convoy_state::{AppEvent, RouteBinding, StateResult, StateTxn, UserAuditInfo, epoch_secs};
use serde_json::Value;

pub const UNMAP_ROUTE_EVENT: &str = "audit.app.unmap-route";

/// What gets recorded when a route binding is removed.
#[derive(Debug, Clone, PartialEq)]
pub struct UnmapAudit<'a> {
    pub app_id: &'a str,
    pub route_id: &'a str,
    pub actor: &'a UserAuditInfo,
    pub binding_id: &'a str,
    pub process_type: &'a str,
    /// Removal came from a manifest apply rather than a direct API call.
    pub manifest_triggered: bool,
}

impl<'a> UnmapAudit<'a> {
    pub fn for_binding(
        binding: &'a RouteBinding,
        actor: &'a UserAuditInfo,
        manifest_triggered: bool,
    ) -> Self {
        Self {
            app_id: &binding.app_id,
            route_id: &binding.route_id,
            actor,
            binding_id: &binding.id,
            process_type: &binding.process_type,
            manifest_triggered,
        }
    }
}

/// Destination for audit events. Writes go through the caller's
/// transaction so they commit or roll back with the change they describe.
pub trait AuditSink: Send + Sync {
    fn record_unmap(&self, txn: &StateTxn, audit: &UnmapAudit<'_>) -> StateResult<AppEvent>;
}

/// Stores audit events in the `app_events` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppEventRepository;

impl AuditSink for AppEventRepository {
    fn record_unmap(&self, txn: &StateTxn, audit: &UnmapAudit<'_>) -> StateResult<AppEvent> {
        let mut metadata = BTreeMap::new();
        metadata.insert("route_guid".to_string(), Value::from(audit.route_id));
        metadata.insert("route_mapping_guid".to_string(), Value::from(audit.binding_id));
        metadata.insert("process_type".to_string(), Value::from(audit.process_type));
        if audit.manifest_triggered {
            metadata.insert("manifest_triggered".to_string(), Value::Bool(true));
        }

        txn.append_app_event(AppEvent {
            id: String::new(),
            event_type: UNMAP_ROUTE_EVENT.to_string(),
            actor: audit.actor.clone(),
            actee: audit.app_id.to_string(),
            timestamp: epoch_secs(),
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoy_state::StateStore;

    fn binding() -> RouteBinding {
        RouteBinding {
            id: "binding-1".to_string(),
            app_id: "app-1".to_string(),
            route_id: "route-1".to_string(),
            process_id: "proc-1".to_string(),
            process_type: "web".to_string(),
        }
    }

    fn actor() -> UserAuditInfo {
        UserAuditInfo {
            user_guid: "user_guid".to_string(),
            user_email: Some("user_email".to_string()),
            user_name: None,
        }
    }

    #[test]
    fn records_unmap_event() {
        let store = StateStore::open_in_memory().unwrap();
        let (binding, actor) = (binding(), actor());

        store
            .transaction(|txn| {
                AppEventRepository.record_unmap(txn, &UnmapAudit::for_binding(&binding, &actor, false))
            })
            .unwrap();

        let events = store.list_app_events().unwrap();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.event_type, UNMAP_ROUTE_EVENT);
        assert_eq!(event.actee, "app-1");
        assert_eq!(event.actor.user_guid, "user_guid");
        assert_eq!(event.metadata["route_guid"], "route-1");
        assert_eq!(event.metadata["route_mapping_guid"], "binding-1");
        assert_eq!(event.metadata["process_type"], "web");
        assert!(!event.metadata.contains_key("manifest_triggered"));
    }

    #[test]
    fn manifest_flag_is_recorded() {
        let store = StateStore::open_in_memory().unwrap();
        let (binding, actor) = (binding(), actor());

        let event = store
            .transaction(|txn| {
                AppEventRepository.record_unmap(txn, &UnmapAudit::for_binding(&binding, &actor, true))
            })
            .unwrap();

        assert_eq!(event.metadata["manifest_triggered"], Value::Bool(true));
    }
}
