//! Flat upsert-by-external-id reconciliation.

use std::future::Future;

use serde::Serialize;
use tracing::warn;

use crate::store::{StoreResult, Upserted};

/// Per-entity counters for one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileCounts {
    pub created: u64,
    pub updated: u64,
    /// Deleted upstream or unresolvable; not written.
    pub skipped: u64,
    pub failed: u64,
}

impl ReconcileCounts {
    pub fn record(&mut self, created: bool) {
        if created {
            self.created += 1;
        } else {
            self.updated += 1;
        }
    }

    pub fn merge(&mut self, other: ReconcileCounts) {
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    pub fn written(&self) -> u64 {
        self.created + self.updated
    }
}

/// A single record that failed to write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordError {
    pub external_id: String,
    pub message: String,
}

impl RecordError {
    pub fn new(external_id: &str, message: impl Into<String>) -> Self {
        Self {
            external_id: external_id.to_string(),
            message: message.into(),
        }
    }
}

/// Outcome of a flat batch.
#[derive(Debug, Clone)]
pub struct FlatOutcome<E> {
    pub entities: Vec<E>,
    pub counts: ReconcileCounts,
    pub errors: Vec<RecordError>,
}

impl<E> Default for FlatOutcome<E> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            counts: ReconcileCounts::default(),
            errors: Vec::new(),
        }
    }
}

/// Upsert each record in order, catching per-record failures.
///
/// Records run one at a time so repeated external ids in a batch are applied
/// in input order and the last one wins.
pub async fn reconcile_flat<R, E, K, F, Fut>(
    entity: &str,
    records: Vec<R>,
    key: K,
    mut upsert: F,
) -> FlatOutcome<E>
where
    K: Fn(&R) -> String,
    F: FnMut(R) -> Fut,
    Fut: Future<Output = StoreResult<Upserted<E>>>,
{
    let mut outcome = FlatOutcome::default();

    for record in records {
        let external_id = key(&record);
        match upsert(record).await {
            Ok(upserted) => {
                outcome.counts.record(upserted.created);
                outcome.entities.push(upserted.entity);
            }
            Err(e) => {
                warn!(
                    entity = entity,
                    external_id = %external_id,
                    error = %e,
                    "Failed to upsert record"
                );
                outcome.counts.failed += 1;
                outcome.errors.push(RecordError::new(&external_id, e.to_string()));
            }
        }
    }

    outcome
}
