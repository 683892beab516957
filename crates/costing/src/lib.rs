//! Costing domain module: filament aggregation and the cost cascade.
//!
//! The four stages (filament aggregation → piece cost → model cost → kit
//! cost) are pure computations here; ordering, successor fan-out, and storage
//! belong to the infra pipeline. Cost lookups are injected (traits/closures),
//! never resolved through ambient state.

pub mod cascade;
pub mod filament;
pub mod rates;
pub mod sources;
pub mod stages;

pub use cascade::{CascadeSignal, CascadeStage};
pub use filament::{AggregationOutcome, FilamentGroup, Spool, aggregate_filament_group};
pub use rates::ServiceRates;
pub use sources::{FilamentCostSource, Insumo, InsumoCostSource};
pub use stages::{kit_cost, model_cost, piece_cost};
