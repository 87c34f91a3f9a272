//! Deployment records and the rollout state predicate.
//!
//! A deployment starts in `DEPLOYING` and ends in `DEPLOYED`, or moves to
//! `CANCELING` and then `CANCELED`:
//!
//! ```text
//! DEPLOYING ──► DEPLOYED
//!     │
//!     └──────► CANCELING ──► CANCELED
//! ```
//!
//! The rollout controller drives these transitions with
//! [`Deployments::set_state`], which is a plain field write. Legality of a
//! transition is not checked and there is no concurrency token, so the last
//! writer wins.

use convoy_state::{Deployment, DeploymentState, StateStore, epoch_secs};
use tracing::{debug, info};

use crate::error::{RolloutError, RolloutResult};

/// Process type of a deployment's deploying web process.
pub const WEB_PROCESS_TYPE: &str = "web";

/// Rollout predicates over a stored state.
pub trait RolloutStatus {
    fn rollout_state(&self) -> &DeploymentState;

    /// True iff the stored state is exactly `DEPLOYING`.
    fn is_deploying(&self) -> bool {
        matches!(self.rollout_state(), DeploymentState::Deploying)
    }
}

impl RolloutStatus for DeploymentState {
    fn rollout_state(&self) -> &DeploymentState {
        self
    }
}

impl RolloutStatus for Deployment {
    fn rollout_state(&self) -> &DeploymentState {
        &self.state
    }
}

/// Input for [`Deployments::create`].
#[derive(Debug, Clone)]
pub struct NewDeployment {
    pub id: String,
    pub app_id: String,
    pub droplet_id: String,
    pub deploying_web_process_id: Option<String>,
}

/// Repository for deployment records.
#[derive(Clone)]
pub struct Deployments {
    store: StateStore,
}

impl Deployments {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Start a rollout in `DEPLOYING`.
    ///
    /// Only the deployment record is written. The deploying web process is
    /// a reference; its participation is recorded separately through
    /// [`DeploymentHistory::record_participation`](crate::DeploymentHistory::record_participation).
    pub fn create(&self, new: NewDeployment) -> RolloutResult<Deployment> {
        if new.id.is_empty() {
            return Err(RolloutError::validation("id", "must not be empty"));
        }
        let now = epoch_secs();
        let deployment = Deployment {
            id: new.id,
            state: DeploymentState::Deploying,
            app_id: new.app_id,
            droplet_id: new.droplet_id,
            deploying_web_process_id: new.deploying_web_process_id,
            created_at: now,
            updated_at: now,
        };

        self.store.transaction(|txn| {
            if txn.get_deployment(&deployment.id)?.is_some() {
                return Err(RolloutError::validation(
                    "id",
                    format!("deployment {} already exists", deployment.id),
                ));
            }
            txn.put_deployment(&deployment)?;
            Ok(())
        })?;

        info!(
            deployment = %deployment.id,
            app = %deployment.app_id,
            droplet = %deployment.droplet_id,
            "deployment created"
        );
        Ok(deployment)
    }

    pub fn get(&self, id: &str) -> RolloutResult<Option<Deployment>> {
        Ok(self.store.get_deployment(id)?)
    }

    /// Overwrite the stored state. Any value is accepted, including ones
    /// that are not a known state; those simply never count as deploying.
    pub fn set_state(
        &self,
        id: &str,
        state: impl Into<DeploymentState>,
    ) -> RolloutResult<Deployment> {
        let state = state.into();
        let deployment = self.store.transaction(|txn| {
            let mut deployment = txn
                .get_deployment(id)?
                .ok_or_else(|| RolloutError::DeploymentNotFound(id.to_string()))?;
            deployment.state = state;
            deployment.updated_at = epoch_secs();
            txn.put_deployment(&deployment)?;
            Ok::<_, RolloutError>(deployment)
        })?;

        debug!(deployment = %id, state = %deployment.state, "deployment state written");
        Ok(deployment)
    }

    /// Delete a deployment together with its history entries.
    ///
    /// Returns the number of history entries removed, or `None` if the
    /// deployment did not exist.
    pub fn destroy(&self, id: &str) -> RolloutResult<Option<u32>> {
        let removed = self.store.transaction(|txn| {
            if !txn.delete_deployment(id)? {
                return Ok::<_, RolloutError>(None);
            }
            Ok(Some(txn.delete_history_for_deployment(id)?))
        })?;

        match removed {
            Some(entries) => info!(deployment = %id, entries, "deployment destroyed"),
            None => debug!(deployment = %id, "deployment already gone"),
        }
        Ok(removed)
    }
}
