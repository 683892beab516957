//! Assembly domain module: order-tree expansion and stock reconciliation.
//!
//! Business rules only, implemented as deterministic domain logic (no IO, no
//! HTTP, no storage). The engine consumes immutable snapshots and returns the
//! changed documents; the infra layer owns transactions and retries.

pub mod consumption;
pub mod group;
pub mod path;
pub mod reconcile;
pub mod resolver;

pub use consumption::{ConsumedProduct, ConsumptionEvent, RootProduct};
pub use group::{
    AssemblyGroup, AssemblyGroupStatus, AppendOutcome, LedgerEntry, ModelRequirement, Requirement,
};
pub use path::{AssemblyInstanceId, AssemblyPath, PathSegment};
pub use reconcile::{
    AppliedResult, ReconcileWarning, ReconciliationEngine, ReconciliationState,
};
pub use resolver::{
    HierarchyResolver, ResolvedNode, LEVEL_MODEL, LEVEL_PART, LEVEL_PIECE, LEVEL_ROOT,
};
