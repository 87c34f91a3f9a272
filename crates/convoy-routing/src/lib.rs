//! Convoy route bindings: audited removal and route recomputation.
//!
//! # Components
//!
//! - **`unmap`**: removes route bindings one transaction per binding
//! - **`audit`**: audit sink that records unmap events alongside the removal
//! - **`route_handler`**: recomputes and publishes a process's route set

pub mod audit;
pub mod error;
pub mod route_handler;
pub mod unmap;

pub use audit::{AppEventRepository, AuditSink, UNMAP_ROUTE_EVENT, UnmapAudit};
pub use error::{RoutingError, RoutingResult};
pub use route_handler::{ProcessRouteHandler, RouteHandler, Validation};
pub use unmap::{BindingResult, RouteBindingDelete, UnmapOutcome, UnmapReport};
