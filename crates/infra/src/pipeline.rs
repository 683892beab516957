//! Cascade pipeline: executes stage signals against the store.
//!
//! Stage order is fixed by the signal chain (filament aggregation → piece →
//! model → kit); every stage is a full recompute, so replaying a signal is
//! harmless. Runs for one target id are serialized through a keyed-lock
//! registry — concurrent re-entrant runs for the same id are the correctness
//! hazard this module exists to prevent.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{info, instrument, warn};

use printops_catalog::{CatalogReader, ProductNode};
use printops_core::{FilamentGroupId, InsumoId, ProductId};
use printops_costing::{
    AggregationOutcome, CascadeSignal, CascadeStage, FilamentGroup, Insumo, ServiceRates, Spool,
    aggregate_filament_group, kit_cost, model_cost, piece_cost,
};
use printops_events::{MessageEnvelope, MessageTopic};

use crate::catalog_store::StoreCatalog;
use crate::document_store::{
    DocumentStore, DocumentStoreError, DocumentWrite, Expected, RATES_DOC_ID, collections,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] DocumentStoreError),

    #[error("successor publication failed: {0}")]
    Publish(String),
}

/// Outcome of one stage execution.
#[derive(Debug, Clone, PartialEq)]
pub struct StageRun {
    pub stage: CascadeStage,
    pub target_id: String,
    /// Successor signals enqueued by this run.
    pub enqueued: usize,
}

/// Counts from a manual full catalog walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkSummary {
    pub filament_groups: usize,
    pub pieces: usize,
    pub models: usize,
    pub kits: usize,
}

/// Per-key lock registry serializing stage runs per target id.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn for_key(&self, key: &str) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Executes cascade signals and publishes the successor stages.
pub struct CascadePipeline<S, T> {
    store: S,
    topic: T,
    locks: KeyedLocks,
}

impl<S, T> CascadePipeline<S, T>
where
    S: DocumentStore,
    T: MessageTopic<MessageEnvelope<CascadeSignal>>,
{
    pub fn new(store: S, topic: T) -> Self {
        Self {
            store,
            topic,
            locks: KeyedLocks::default(),
        }
    }

    /// Execute one delivered stage signal, then enqueue its successors.
    #[instrument(
        skip(self, envelope),
        fields(stage = envelope.payload().stage.wire_name(), target = %envelope.payload().target_id),
        err
    )]
    pub fn handle(
        &self,
        envelope: &MessageEnvelope<CascadeSignal>,
    ) -> Result<StageRun, PipelineError> {
        let signal = envelope.payload();

        let lock = self.locks.for_key(&signal.target_id);
        let _guard = lock.lock().unwrap_or_else(|p| p.into_inner());

        let successors = self.run_stage(signal)?;
        let enqueued = successors.len();
        for successor in successors {
            self.topic
                .publish(MessageEnvelope::wrap(successor))
                .map_err(|e| PipelineError::Publish(format!("{e:?}")))?;
        }

        Ok(StageRun {
            stage: signal.stage,
            target_id: signal.target_id.clone(),
            enqueued,
        })
    }

    /// Manual backfill/repair: run all four stages unconditionally over the
    /// whole catalog, in stage order, without successor messages.
    #[instrument(skip(self), err)]
    pub fn full_walk(&self) -> Result<WalkSummary, PipelineError> {
        let mut summary = WalkSummary::default();

        for id in self.known_filament_group_ids()? {
            let lock = self.locks.for_key(id.as_str());
            let _guard = lock.lock().unwrap_or_else(|p| p.into_inner());
            self.run_filament_aggregation(id.as_str())?;
            summary.filament_groups += 1;
        }

        let catalog = StoreCatalog::new(&self.store);
        for piece in catalog.pieces() {
            self.run_piece_cost(piece.id.as_str())?;
            summary.pieces += 1;
        }
        for model in catalog.models() {
            self.run_model_cost(model.id.as_str())?;
            summary.models += 1;
        }
        for kit in catalog.kits() {
            self.run_kit_cost(kit.id.as_str())?;
            summary.kits += 1;
        }

        info!(?summary, "full cascade walk finished");
        Ok(summary)
    }

    fn run_stage(&self, signal: &CascadeSignal) -> Result<Vec<CascadeSignal>, PipelineError> {
        match signal.stage {
            CascadeStage::FilamentGroupAggregation => {
                self.run_filament_aggregation(&signal.target_id)
            }
            CascadeStage::PieceCost => self.run_piece_cost(&signal.target_id),
            CascadeStage::ModelCost => self.run_model_cost(&signal.target_id),
            CascadeStage::KitCost => self.run_kit_cost(&signal.target_id),
        }
    }

    fn run_filament_aggregation(&self, target: &str) -> Result<Vec<CascadeSignal>, PipelineError> {
        let Ok(id) = FilamentGroupId::new(target) else {
            warn!(target, "blank filament group id; signal dropped");
            return Ok(vec![]);
        };

        let mut spools: Vec<Spool> = Vec::new();
        for doc in self.store.list(collections::SPOOLS)? {
            match doc.decode::<Spool>() {
                Ok(s) => spools.push(s),
                Err(e) => warn!(id = %doc.id, error = %e, "undecodable spool skipped"),
            }
        }

        let prior = self
            .store
            .get(collections::FILAMENT_GROUPS, target)?
            .and_then(|doc| doc.decode::<FilamentGroup>().ok());
        let prior_name = prior.and_then(|g| g.name);

        match aggregate_filament_group(&id, prior_name, &spools) {
            AggregationOutcome::Updated(group) => {
                self.store.commit(vec![DocumentWrite::put(
                    collections::FILAMENT_GROUPS,
                    target,
                    Expected::Any,
                    &group,
                )?])?;
            }
            AggregationOutcome::Deleted => {
                if self.store.get(collections::FILAMENT_GROUPS, target)?.is_some() {
                    self.store.commit(vec![DocumentWrite::delete(
                        collections::FILAMENT_GROUPS,
                        target,
                        Expected::Any,
                    )])?;
                }
            }
        }

        let catalog = StoreCatalog::new(&self.store);
        Ok(catalog
            .pieces_using_filament_group(&id)
            .into_iter()
            .map(|p| CascadeSignal::new(CascadeStage::PieceCost, p.id.as_str()))
            .collect())
    }

    fn run_piece_cost(&self, target: &str) -> Result<Vec<CascadeSignal>, PipelineError> {
        let catalog = StoreCatalog::new(&self.store);
        let Some(id) = product_id(target) else {
            return Ok(vec![]);
        };
        let Some(piece) = catalog.piece(&id) else {
            warn!(target, "piece not in catalog; signal dropped");
            return Ok(vec![]);
        };

        let rates = self.load_rates()?;
        let filament_costs = self.load_filament_costs()?;
        let insumo_costs = self.load_insumo_costs()?;

        let cost = piece_cost(&piece, &filament_costs, &insumo_costs, &rates);
        self.write_computed_cost(&id, cost)?;

        let mut successors: Vec<CascadeSignal> = catalog
            .models_containing_piece(&id)
            .into_iter()
            .map(|m| CascadeSignal::new(CascadeStage::ModelCost, m.id.as_str()))
            .collect();
        successors.extend(
            catalog
                .kits_with_loose_piece(&id)
                .into_iter()
                .map(|k| CascadeSignal::new(CascadeStage::KitCost, k.id.as_str())),
        );
        Ok(successors)
    }

    fn run_model_cost(&self, target: &str) -> Result<Vec<CascadeSignal>, PipelineError> {
        let catalog = StoreCatalog::new(&self.store);
        let Some(id) = product_id(target) else {
            return Ok(vec![]);
        };
        let Some(model) = catalog.model(&id) else {
            warn!(target, "model not in catalog; signal dropped");
            return Ok(vec![]);
        };

        let rates = self.load_rates()?;
        let cost = model_cost(
            &model,
            |pid| catalog.piece(pid).and_then(|p| p.computed_cost),
            &rates,
        );
        self.write_computed_cost(&id, cost)?;

        Ok(catalog
            .kits_containing_model(&id)
            .into_iter()
            .map(|k| CascadeSignal::new(CascadeStage::KitCost, k.id.as_str()))
            .collect())
    }

    fn run_kit_cost(&self, target: &str) -> Result<Vec<CascadeSignal>, PipelineError> {
        let catalog = StoreCatalog::new(&self.store);
        let Some(id) = product_id(target) else {
            return Ok(vec![]);
        };
        let Some(kit) = catalog.kit(&id) else {
            warn!(target, "kit not in catalog; signal dropped");
            return Ok(vec![]);
        };

        let rates = self.load_rates()?;
        let cost = kit_cost(
            &kit,
            |mid| catalog.model(mid).and_then(|m| m.computed_cost),
            |pid| catalog.piece(pid).and_then(|p| p.computed_cost),
            &rates,
        );
        self.write_computed_cost(&id, cost)?;

        // The kit is the top of the cascade.
        Ok(vec![])
    }

    /// Rates are read once per stage run and passed through explicitly.
    fn load_rates(&self) -> Result<ServiceRates, PipelineError> {
        Ok(self
            .store
            .get(collections::CONFIG, RATES_DOC_ID)?
            .and_then(|doc| doc.decode::<ServiceRates>().ok())
            .unwrap_or_default())
    }

    fn load_filament_costs(&self) -> Result<HashMap<FilamentGroupId, f64>, PipelineError> {
        let mut costs = HashMap::new();
        for doc in self.store.list(collections::FILAMENT_GROUPS)? {
            match doc.decode::<FilamentGroup>() {
                Ok(group) => {
                    costs.insert(group.id, group.weighted_average_cost);
                }
                Err(e) => warn!(id = %doc.id, error = %e, "undecodable filament group skipped"),
            }
        }
        Ok(costs)
    }

    fn load_insumo_costs(&self) -> Result<HashMap<InsumoId, f64>, PipelineError> {
        let mut costs = HashMap::new();
        for doc in self.store.list(collections::INSUMOS)? {
            match doc.decode::<Insumo>() {
                Ok(insumo) => {
                    costs.insert(insumo.id, insumo.unit_cost);
                }
                Err(e) => warn!(id = %doc.id, error = %e, "undecodable insumo skipped"),
            }
        }
        Ok(costs)
    }

    /// Write `custoCalculado` back onto the product document.
    ///
    /// Revision-checked so a concurrent catalog edit is never overwritten with
    /// a stale body; on conflict the node is re-read and the cost re-applied.
    fn write_computed_cost(&self, id: &ProductId, cost: f64) -> Result<(), PipelineError> {
        const ATTEMPTS: u32 = 3;

        for attempt in 1..=ATTEMPTS {
            let Some(doc) = self.store.get(collections::PRODUCTS, id.as_str())? else {
                warn!(id = %id, "product vanished before cost write");
                return Ok(());
            };

            let mut node: ProductNode = match doc.decode() {
                Ok(n) => n,
                Err(e) => {
                    warn!(id = %id, error = %e, "undecodable product; cost not written");
                    return Ok(());
                }
            };

            match &mut node {
                ProductNode::Kit(k) => k.computed_cost = Some(cost),
                ProductNode::Model(m) => m.computed_cost = Some(cost),
                ProductNode::Piece(p) => p.computed_cost = Some(cost),
                ProductNode::Part(_) => return Ok(()),
            }

            match self.store.commit(vec![DocumentWrite::put(
                collections::PRODUCTS,
                id.as_str(),
                Expected::Revision(doc.revision),
                &node,
            )?]) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < ATTEMPTS => {
                    warn!(id = %id, attempt, error = %e, "cost write conflict; re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    /// Distinct filament-group ids: existing aggregates plus any group a
    /// spool references (covers groups whose aggregate was deleted).
    pub fn known_filament_group_ids(&self) -> Result<Vec<FilamentGroupId>, PipelineError> {
        let mut ids: HashSet<FilamentGroupId> = HashSet::new();

        for doc in self.store.list(collections::FILAMENT_GROUPS)? {
            if let Ok(group) = doc.decode::<FilamentGroup>() {
                ids.insert(group.id);
            }
        }
        for doc in self.store.list(collections::SPOOLS)? {
            if let Ok(spool) = doc.decode::<Spool>() {
                ids.insert(spool.filament_group_id);
            }
        }

        let mut ids: Vec<FilamentGroupId> = ids.into_iter().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }
}

fn product_id(target: &str) -> Option<ProductId> {
    match ProductId::new(target) {
        Ok(id) => Some(id),
        Err(_) => {
            warn!(target, "blank product id; signal dropped");
            None
        }
    }
}
