//! Deployment participation history.
//!
//! Each entry is an append-only snapshot of a process that took part in a
//! rollout. Entries copy the process id and type instead of referencing the
//! live process, so they outlive it; they are removed only together with
//! their deployment (see [`Deployments::destroy`](crate::Deployments::destroy)).

use convoy_state::{DeploymentHistoryEntry, Process, StateStore, epoch_secs};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RolloutError, RolloutResult};

pub(crate) const HISTORY_SEQUENCE: &str = "deployment_processes";

/// A process that took part in a deployment, as recorded at the time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub process_id: String,
    pub process_type: String,
}

impl From<DeploymentHistoryEntry> for Participant {
    fn from(entry: DeploymentHistoryEntry) -> Self {
        Self {
            process_id: entry.process_id,
            process_type: entry.process_type,
        }
    }
}

#[derive(Clone)]
pub struct DeploymentHistory {
    store: StateStore,
}

impl DeploymentHistory {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    /// Append one history entry.
    ///
    /// Not idempotent: recording the same pair twice yields two entries.
    pub fn record_participation(
        &self,
        deployment_id: &str,
        process_id: &str,
        process_type: &str,
    ) -> RolloutResult<DeploymentHistoryEntry> {
        validate_process_type(process_type)?;

        let entry = self.store.transaction(|txn| {
            if txn.get_deployment(deployment_id)?.is_none() {
                return Err(RolloutError::DeploymentNotFound(deployment_id.to_string()));
            }
            let entry = DeploymentHistoryEntry {
                deployment_id: deployment_id.to_string(),
                process_id: process_id.to_string(),
                process_type: process_type.to_string(),
                seq: txn.next_sequence(HISTORY_SEQUENCE)?,
                created_at: epoch_secs(),
            };
            txn.put_history_entry(&entry)?;
            Ok(entry)
        })?;

        debug!(
            deployment = %deployment_id,
            process = %process_id,
            process_type,
            "recorded deployment participation"
        );
        Ok(entry)
    }

    /// Every process ever recorded for the deployment, whether or not it
    /// still exists.
    pub fn historical_participants(&self, deployment_id: &str) -> RolloutResult<Vec<Participant>> {
        let entries = self.store.list_history(deployment_id)?;
        Ok(entries.into_iter().map(Participant::from).collect())
    }

    /// Resolve a participant to its live process, if it still exists.
    pub fn live_process(&self, participant: &Participant) -> RolloutResult<Option<Process>> {
        Ok(self.store.get_process(&participant.process_id)?)
    }
}

fn validate_process_type(process_type: &str) -> RolloutResult<()> {
    if process_type.trim().is_empty() {
        return Err(RolloutError::validation("process_type", "must not be empty"));
    }
    Ok(())
}
