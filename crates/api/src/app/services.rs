//! Infrastructure wiring: store, topics, workers, pipeline.

use std::sync::Arc;

use printops_assembly::ConsumptionEvent;
use printops_costing::CascadeSignal;
use printops_events::{InMemoryTopic, MessageEnvelope, MessageTopic};
use printops_infra::applier::ReconciliationApplier;
use printops_infra::document_store::InMemoryDocumentStore;
use printops_infra::pipeline::CascadePipeline;
use printops_infra::workers::{Worker, WorkerHandle};

pub type ConsumptionTopic = Arc<InMemoryTopic<MessageEnvelope<ConsumptionEvent>>>;
pub type CascadeTopic = Arc<InMemoryTopic<MessageEnvelope<CascadeSignal>>>;
pub type Pipeline = CascadePipeline<Arc<InMemoryDocumentStore>, CascadeTopic>;

/// Composed runtime services behind the HTTP surface.
///
/// The store and topics stand in for the managed substrate; swapping in the
/// Postgres store and a broker-backed topic changes this wiring only.
pub struct AppServices {
    store: Arc<InMemoryDocumentStore>,
    consumption_topic: ConsumptionTopic,
    cascade_topic: CascadeTopic,
    pipeline: Arc<Pipeline>,
    workers: Vec<WorkerHandle>,
}

impl AppServices {
    /// In-memory wiring: store, both topics, and one worker per topic.
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryDocumentStore::new());
        let consumption_topic: ConsumptionTopic = Arc::new(InMemoryTopic::new());
        let cascade_topic: CascadeTopic = Arc::new(InMemoryTopic::new());

        let pipeline = Arc::new(CascadePipeline::new(store.clone(), cascade_topic.clone()));

        let applier = ReconciliationApplier::new(store.clone());
        let consumption_worker = Worker::spawn(
            "consumption-worker",
            consumption_topic.clone(),
            move |envelope: MessageEnvelope<ConsumptionEvent>| {
                applier.handle(&envelope).map(|_| ())
            },
        );

        let pipeline_for_worker = pipeline.clone();
        let cascade_worker = Worker::spawn(
            "cascade-worker",
            cascade_topic.clone(),
            move |envelope: MessageEnvelope<CascadeSignal>| {
                pipeline_for_worker.handle(&envelope).map(|_| ())
            },
        );

        Self {
            store,
            consumption_topic,
            cascade_topic,
            pipeline,
            workers: vec![consumption_worker, cascade_worker],
        }
    }

    pub fn store(&self) -> Arc<InMemoryDocumentStore> {
        self.store.clone()
    }

    pub fn consumption_topic(&self) -> ConsumptionTopic {
        self.consumption_topic.clone()
    }

    pub fn pipeline(&self) -> Arc<Pipeline> {
        self.pipeline.clone()
    }

    /// Enqueue a cascade signal (what every admin route boils down to).
    pub fn enqueue_cascade(&self, signal: CascadeSignal) -> Result<(), String> {
        self.cascade_topic
            .publish(MessageEnvelope::wrap(signal))
            .map_err(|e| format!("{e:?}"))
    }

    /// Stop the background workers (used by tests; main never shuts down).
    pub fn shutdown(mut self) {
        for worker in self.workers.drain(..) {
            worker.shutdown();
        }
    }
}
