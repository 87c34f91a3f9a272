use anyhow::bail;
use convoy_routing::{RouteBindingDelete, UnmapOutcome};
use convoy_state::{RouteBinding, StateStore, UserAuditInfo};
use tracing::warn;

use super::Context;

pub fn unmap(
    ctx: &Context,
    binding_ids: &[String],
    actor: UserAuditInfo,
    manifest_triggered: bool,
) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let bindings = lookup(&store, binding_ids)?;

    let report = RouteBindingDelete::new(store, actor)
        .manifest_triggered(manifest_triggered)
        .delete(&bindings);

    for result in &report.results {
        match &result.outcome {
            Ok(UnmapOutcome::Removed { routes }) => println!(
                "✓ Unmapped {} (process {} now has {} route(s))",
                result.binding_id,
                routes.process_id,
                routes.route_ids.len()
            ),
            Ok(UnmapOutcome::AlreadyRemoved) => {
                println!("- {} was already removed", result.binding_id)
            }
            Err(e) => eprintln!("✗ {}: {e}", result.binding_id),
        }
    }

    if report.failed() > 0 {
        bail!("{} of {} binding(s) failed", report.failed(), report.results.len());
    }
    Ok(())
}

/// Bindings that no longer exist are skipped; the audit event needs the
/// binding's app and route.
fn lookup(store: &StateStore, binding_ids: &[String]) -> anyhow::Result<Vec<RouteBinding>> {
    let mut bindings = Vec::with_capacity(binding_ids.len());
    for id in binding_ids {
        match store.get_route_binding(id)? {
            Some(binding) => bindings.push(binding),
            None => warn!(binding = %id, "route binding not found, skipping"),
        }
    }
    Ok(bindings)
}
