//! Convoy rollouts: deployment state and participation history.
//!
//! This crate keeps the records a rollout controller needs while it
//! replaces an app's running processes with a new droplet. Deciding *when*
//! to advance a rollout is up to the controller; this crate only stores
//! and answers questions about it.
//!
//! # Components
//!
//! - **`deployment`**: deployment repository and the `is_deploying` predicate
//! - **`history`**: which processes took part in a deployment
//! - **`list`**: filtered, paginated deployment listing

pub mod deployment;
pub mod error;
pub mod history;
pub mod list;

pub use deployment::{Deployments, NewDeployment, RolloutStatus, WEB_PROCESS_TYPE};
pub use error::{RolloutError, RolloutResult};
pub use history::{DeploymentHistory, Participant};
pub use list::{DeploymentListQuery, DeploymentPage, OrderBy};
