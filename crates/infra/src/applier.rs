//! Reconciliation applier: drives the pure engine against the store.
//!
//! One inbound consumption event becomes one read-modify-write cycle: load a
//! snapshot of the order's assembly groups, run the engine, reallocate any
//! production batches fed by the newly attended instances, and commit every
//! changed document as a single all-or-nothing write set. A revision conflict
//! retries the whole cycle; exhausted retries surface an error so the
//! platform redelivers the message.

use std::collections::HashMap;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use printops_assembly::{
    AssemblyGroup, AssemblyInstanceId, ConsumptionEvent, HierarchyResolver, ReconciliationEngine,
    ReconciliationState, ResolvedNode,
};
use printops_core::EventId;
use printops_events::MessageEnvelope;
use printops_production::{ProductionGroup, ProductionGroupReallocator};

use crate::catalog_store::StoreCatalog;
use crate::document_store::{
    DocumentStore, DocumentStoreError, DocumentWrite, Expected, collections,
};

#[derive(Debug, Error)]
pub enum ApplierError {
    #[error(transparent)]
    Store(#[from] DocumentStoreError),

    #[error("gave up after {attempts} conflicting attempts; awaiting redelivery")]
    RetryExhausted { attempts: u32 },
}

/// What one event application changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppliedSummary {
    pub changed_groups: usize,
    pub completed_instances: Vec<AssemblyInstanceId>,
    pub reallocated_groups: usize,
    pub warning_count: usize,
}

/// Applies consumption events transactionally.
pub struct ReconciliationApplier<S> {
    store: S,
    max_attempts: u32,
}

impl<S: DocumentStore> ReconciliationApplier<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_attempts: 5,
        }
    }

    /// Process one delivered event envelope.
    ///
    /// The envelope's message id is the ledger event identity, so redelivery
    /// of the same publication reapplies as a no-op.
    #[instrument(
        skip(self, envelope),
        fields(order = %envelope.payload().order_id, message_id = %envelope.message_id()),
        err
    )]
    pub fn handle(
        &self,
        envelope: &MessageEnvelope<ConsumptionEvent>,
    ) -> Result<AppliedSummary, ApplierError> {
        let event_id = EventId::from_uuid(envelope.message_id());
        let mut event = envelope.payload().clone();

        if event.needs_flattening() {
            let resolver = HierarchyResolver::new(StoreCatalog::new(&self.store));
            match resolver.resolve(&event.order_id, &event.root) {
                Ok(nodes) => {
                    event.consumed = nodes.iter().map(ResolvedNode::to_consumed).collect();
                }
                Err(e) => {
                    // Missing catalog data is non-fatal: warn and finish.
                    warn!(error = %e, "could not flatten consumption event; dropped");
                    return Ok(AppliedSummary::default());
                }
            }
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_apply(&event, event_id) {
                Ok(summary) => return Ok(summary),
                Err(ApplierError::Store(e)) if e.is_transient() => {
                    if attempt >= self.max_attempts {
                        return Err(ApplierError::RetryExhausted { attempts: attempt });
                    }
                    warn!(attempt, error = %e, "transient store failure; retrying whole event");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One optimistic attempt: snapshot → pure apply → commit.
    fn try_apply(
        &self,
        event: &ConsumptionEvent,
        event_id: EventId,
    ) -> Result<AppliedSummary, ApplierError> {
        let now = Utc::now();

        let mut revisions: HashMap<AssemblyInstanceId, u64> = HashMap::new();
        let mut groups: Vec<AssemblyGroup> = Vec::new();
        for doc in self.store.list(collections::ASSEMBLY_GROUPS)? {
            let group: AssemblyGroup = match doc.decode() {
                Ok(g) => g,
                Err(e) => {
                    warn!(id = %doc.id, error = %e, "undecodable assembly group skipped");
                    continue;
                }
            };
            if group.order_id == event.order_id {
                revisions.insert(group.id.clone(), doc.revision);
                groups.push(group);
            }
        }

        let state = ReconciliationState::from_groups(groups);
        let result = ReconciliationEngine::apply(&state, event, event_id, now);

        for warning in &result.warnings {
            warn!(%warning, "reconciliation warning");
        }

        let mut writes = Vec::with_capacity(result.groups.len());
        for (id, group) in &result.groups {
            let expected = revisions
                .get(id)
                .map(|r| Expected::Revision(*r))
                .unwrap_or(Expected::Missing);
            writes.push(DocumentWrite::put(
                collections::ASSEMBLY_GROUPS,
                id.as_str(),
                expected,
                group,
            )?);
        }

        let mut reallocated = 0;
        if !result.newly_completed.is_empty() {
            for doc in self.store.list(collections::PRODUCTION_GROUPS)? {
                let group: ProductionGroup = match doc.decode() {
                    Ok(g) => g,
                    Err(e) => {
                        warn!(id = %doc.id, error = %e, "undecodable production group skipped");
                        continue;
                    }
                };
                if group.status.is_terminal() {
                    continue;
                }
                if !result
                    .newly_completed
                    .iter()
                    .any(|i| group.contains_instance(i))
                {
                    continue;
                }

                let outcome =
                    ProductionGroupReallocator::reallocate(&group, &result.newly_completed);
                debug!(
                    group = %group.id,
                    proportion = outcome.proportion_attended,
                    "production group reallocation"
                );
                if outcome.changed {
                    writes.push(DocumentWrite::put(
                        collections::PRODUCTION_GROUPS,
                        group.id.clone(),
                        Expected::Revision(doc.revision),
                        &outcome.group,
                    )?);
                    reallocated += 1;
                }
            }
        }

        let changed_groups = result.groups.len();
        if !writes.is_empty() {
            self.store.commit(writes)?;
        }

        Ok(AppliedSummary {
            changed_groups,
            completed_instances: result.newly_completed,
            reallocated_groups: reallocated,
            warning_count: result.warnings.len(),
        })
    }
}
