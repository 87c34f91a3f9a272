//! Route binding removal.
//!
//! Each binding is removed in its own transaction, in this order:
//!
//! 1. record the unmap audit event,
//! 2. re-fetch the binding; stop here if it is already gone,
//! 3. delete the binding,
//! 4. recompute the process's routes without validation.
//!
//! The audit event is written before the existence check, so a binding
//! removed concurrently (or by an earlier attempt) still produces an event.
//! A failure rolls back that binding's transaction only; the rest of the
//! batch is still processed.

use std::sync::Arc;

use convoy_state::{ProcessRouteSet, RouteBinding, StateStore, UserAuditInfo};
use tracing::{debug, info, warn};

use crate::audit::{AppEventRepository, AuditSink, UnmapAudit};
use crate::error::{RoutingError, RoutingResult};
use crate::route_handler::{ProcessRouteHandler, RouteHandler, Validation};

#[derive(Debug, Clone, PartialEq)]
pub enum UnmapOutcome {
    /// The binding was deleted; carries the process's recomputed routes.
    Removed { routes: ProcessRouteSet },
    /// The binding no longer existed. Not an error.
    AlreadyRemoved,
}

#[derive(Debug)]
pub struct BindingResult {
    pub binding_id: String,
    pub outcome: RoutingResult<UnmapOutcome>,
}

/// Per-binding results of a batch, in input order.
#[derive(Debug, Default)]
pub struct UnmapReport {
    pub results: Vec<BindingResult>,
}

impl UnmapReport {
    pub fn removed(&self) -> usize {
        self.count(|o| matches!(o, Ok(UnmapOutcome::Removed { .. })))
    }

    pub fn already_removed(&self) -> usize {
        self.count(|o| matches!(o, Ok(UnmapOutcome::AlreadyRemoved)))
    }

    pub fn failed(&self) -> usize {
        self.count(Result::is_err)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &RoutingError)> {
        self.results
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|e| (r.binding_id.as_str(), e)))
    }

    fn count(&self, pred: impl Fn(&RoutingResult<UnmapOutcome>) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Removes route bindings on behalf of one actor.
pub struct RouteBindingDelete {
    store: StateStore,
    actor: UserAuditInfo,
    manifest_triggered: bool,
    audit: Arc<dyn AuditSink>,
    routes: Arc<dyn RouteHandler>,
}

impl RouteBindingDelete {
    pub fn new(store: StateStore, actor: UserAuditInfo) -> Self {
        Self {
            store,
            actor,
            manifest_triggered: false,
            audit: Arc::new(AppEventRepository),
            routes: Arc::new(ProcessRouteHandler),
        }
    }

    /// Mark removals as coming from a manifest apply.
    pub fn manifest_triggered(mut self, manifest_triggered: bool) -> Self {
        self.manifest_triggered = manifest_triggered;
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_route_handler(mut self, routes: Arc<dyn RouteHandler>) -> Self {
        self.routes = routes;
        self
    }

    /// Remove every binding, each in its own transaction.
    pub fn delete(&self, bindings: &[RouteBinding]) -> UnmapReport {
        let mut report = UnmapReport::default();
        for binding in bindings {
            let outcome = self.delete_one(binding);
            if let Err(e) = &outcome {
                warn!(
                    binding = %binding.id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "failed to remove route binding"
                );
            }
            report.results.push(BindingResult {
                binding_id: binding.id.clone(),
                outcome,
            });
        }

        info!(
            requested = bindings.len(),
            removed = report.removed(),
            already_removed = report.already_removed(),
            failed = report.failed(),
            "route bindings removed"
        );
        report
    }

    /// Remove one binding in a single transaction.
    ///
    /// Only the audit event uses the caller's copy of the binding; the rest
    /// is re-read from storage, so the call can be re-issued after a
    /// retryable error.
    pub fn delete_one(&self, binding: &RouteBinding) -> RoutingResult<UnmapOutcome> {
        debug!(
            binding = %binding.id,
            app = %binding.app_id,
            route = %binding.route_id,
            process = %binding.process_id,
            "removing route binding"
        );

        self.store.transaction(|txn| -> RoutingResult<UnmapOutcome> {
            let audit = UnmapAudit::for_binding(binding, &self.actor, self.manifest_triggered);
            self.audit.record_unmap(txn, &audit)?;

            let Some(current) = txn.get_route_binding(&binding.id)? else {
                debug!(binding = %binding.id, "route binding already removed");
                return Ok(UnmapOutcome::AlreadyRemoved);
            };
            txn.delete_route_binding(&current.id)?;

            let routes =
                self.routes
                    .update_route_information(txn, &current.process_id, Validation::Skip)?;
            Ok(UnmapOutcome::Removed { routes })
        })
    }
}
