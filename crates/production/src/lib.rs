//! Production domain module: shared batch-production groups.
//!
//! A production group aggregates identical leaf-level demand across orders so
//! parts can be printed in one run. When stock substitutes for production, the
//! group shrinks proportionally — quantities only ever move toward zero.

pub mod group;
pub mod reallocate;

pub use group::{
    FilamentNeed, OrderOrigin, PartInGroup, ProductionGroup, ProductionGroupStatus,
};
pub use reallocate::{ProductionGroupReallocator, ReallocationOutcome};
