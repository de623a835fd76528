//! Menu group hierarchy reconciliation.
//!
//! Remote groups arrive in arbitrary order with parents referenced by external
//! id. The batch is loaded into an arena where each node's parent is an index
//! into the same arena, roots are written first, and children are resolved in
//! bounded passes over a worklist until a pass makes no progress.

use std::collections::HashMap;

use tracing::{debug, warn};
use uuid::Uuid;

use super::pos::RemoteGroup;
use super::reconcile::{RecordError, ReconcileCounts};
use crate::models::GroupRecord;
use crate::store::CatalogStore;

pub const DEFAULT_MAX_PASSES: usize = 10;

/// Why a group could not be attached to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// The parent never appears in the batch.
    Orphan,
    /// Following parents leads back to the group itself.
    Cycle,
    /// An ancestor failed to upsert.
    ParentFailed,
    /// Still unresolved when the pass cap was reached.
    PassLimit,
}

impl std::fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnresolvedReason::Orphan => write!(f, "orphan"),
            UnresolvedReason::Cycle => write!(f, "cycle"),
            UnresolvedReason::ParentFailed => write!(f, "parent_failed"),
            UnresolvedReason::PassLimit => write!(f, "pass_limit"),
        }
    }
}

/// A group dropped from the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyWarning {
    pub external_id: String,
    pub parent_external_id: Option<String>,
    pub reason: UnresolvedReason,
}

impl std::fmt::Display for HierarchyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "group {} skipped ({}), parent {}",
            self.external_id,
            self.reason,
            self.parent_external_id.as_deref().unwrap_or("-")
        )
    }
}

/// Result of reconciling one organization's groups.
#[derive(Debug, Clone, Default)]
pub struct HierarchyOutcome {
    /// External id to local id for every group written in this run.
    pub mapping: HashMap<String, Uuid>,
    pub counts: ReconcileCounts,
    pub passes: usize,
    pub warnings: Vec<HierarchyWarning>,
    pub errors: Vec<RecordError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Pending,
    Written(Uuid),
    Failed,
}

struct Node<'a> {
    remote: &'a RemoteGroup,
    parent: Option<usize>,
    state: NodeState,
}

/// Reconciles a group forest into the store.
#[derive(Debug, Clone, Copy)]
pub struct HierarchyReconciler {
    max_passes: usize,
}

impl Default for HierarchyReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PASSES)
    }
}

impl HierarchyReconciler {
    pub fn new(max_passes: usize) -> Self {
        Self {
            max_passes: max_passes.max(1),
        }
    }

    pub fn max_passes(&self) -> usize {
        self.max_passes
    }

    /// Write `groups` for one organization.
    ///
    /// Deleted groups are skipped without touching stored rows. Groups that
    /// cannot be attached are reported as warnings; store failures on single
    /// records are reported as errors. Neither aborts the run.
    pub async fn reconcile(
        &self,
        store: &dyn CatalogStore,
        organization_id: Uuid,
        groups: &[RemoteGroup],
    ) -> HierarchyOutcome {
        let mut outcome = HierarchyOutcome::default();

        let live: Vec<&RemoteGroup> = groups
            .iter()
            .filter(|g| {
                if g.is_deleted() {
                    outcome.counts.skipped += 1;
                    false
                } else {
                    true
                }
            })
            .collect();

        let index: HashMap<&str, usize> = live
            .iter()
            .enumerate()
            .map(|(i, g)| (g.id.as_str(), i))
            .collect();

        let mut arena: Vec<Node<'_>> = live
            .iter()
            .map(|g| Node {
                remote: g,
                parent: g.parent_id().and_then(|p| index.get(p).copied()),
                state: NodeState::Pending,
            })
            .collect();

        let mut worklist = Vec::new();
        for i in 0..arena.len() {
            if arena[i].remote.parent_id().is_none() {
                self.write(store, organization_id, &mut arena, i, None, &mut outcome)
                    .await;
            } else {
                worklist.push(i);
            }
        }

        while !worklist.is_empty() && outcome.passes < self.max_passes {
            outcome.passes += 1;
            let mut deferred = Vec::with_capacity(worklist.len());
            let mut progressed = 0usize;

            for i in worklist {
                let parent_id = match arena[i].parent.map(|p| arena[p].state) {
                    Some(NodeState::Written(id)) => id,
                    _ => {
                        deferred.push(i);
                        continue;
                    }
                };
                self.write(store, organization_id, &mut arena, i, Some(parent_id), &mut outcome)
                    .await;
                progressed += 1;
            }

            debug!(
                organization_id = %organization_id,
                pass = outcome.passes,
                resolved = progressed,
                deferred = deferred.len(),
                "Group resolution pass finished"
            );

            worklist = deferred;
            if progressed == 0 {
                break;
            }
        }

        for i in worklist {
            let warning = HierarchyWarning {
                external_id: arena[i].remote.id.clone(),
                parent_external_id: arena[i].remote.parent_id().map(str::to_string),
                reason: classify(&arena, i),
            };
            warn!(
                organization_id = %organization_id,
                external_id = %warning.external_id,
                parent = ?warning.parent_external_id,
                reason = %warning.reason,
                "Dropping unresolved group"
            );
            outcome.counts.skipped += 1;
            outcome.warnings.push(warning);
        }

        outcome
    }

    async fn write(
        &self,
        store: &dyn CatalogStore,
        organization_id: Uuid,
        arena: &mut [Node<'_>],
        i: usize,
        parent_group_id: Option<Uuid>,
        outcome: &mut HierarchyOutcome,
    ) {
        let remote = arena[i].remote;
        let record = GroupRecord {
            external_id: remote.id.clone(),
            organization_id,
            parent_group_id,
            name: remote.display_name(),
            description: remote.display_description(),
            display_order: remote.order.unwrap_or(0),
            is_included_in_menu: remote.is_included_in_menu.unwrap_or(true),
        };

        match store.upsert_group(record).await {
            Ok(upserted) => {
                outcome.counts.record(upserted.created);
                outcome
                    .mapping
                    .insert(remote.id.clone(), upserted.entity.id);
                arena[i].state = NodeState::Written(upserted.entity.id);
            }
            Err(e) => {
                warn!(
                    organization_id = %organization_id,
                    external_id = %remote.id,
                    error = %e,
                    "Failed to upsert group"
                );
                outcome.counts.failed += 1;
                outcome.errors.push(RecordError::new(&remote.id, e.to_string()));
                arena[i].state = NodeState::Failed;
            }
        }
    }
}

/// Walk the parent chain of a leftover node to explain why it never resolved.
fn classify(arena: &[Node<'_>], start: usize) -> UnresolvedReason {
    let mut current = start;
    for _ in 0..=arena.len() {
        match arena[current].parent {
            None => return UnresolvedReason::Orphan,
            Some(parent) if parent == start => return UnresolvedReason::Cycle,
            Some(parent) => match arena[parent].state {
                NodeState::Failed => return UnresolvedReason::ParentFailed,
                NodeState::Written(_) => return UnresolvedReason::PassLimit,
                NodeState::Pending => current = parent,
            },
        }
    }
    // The chain loops without passing through `start`: the node hangs off a cycle.
    UnresolvedReason::Cycle
}
