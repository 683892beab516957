//! Proportional reallocation of shared production batches.
//!
//! When assembly positions are satisfied from finished-goods stock instead of
//! being produced, the batch shrinks by the attended share. The reallocator is
//! pure; callers pass only the instances that *newly* became attended, so
//! message replay (which produces no new instances) cannot shrink a group
//! twice.

use std::collections::HashSet;

use printops_assembly::AssemblyInstanceId;
use printops_core::{round_half_up, round_half_up_u32};

use crate::group::{ProductionGroup, ProductionGroupStatus};

/// Result of one reallocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReallocationOutcome {
    pub group: ProductionGroup,
    /// Share of the group's instances attended by this call (0.0 ..= 1.0).
    pub proportion_attended: f64,
    /// False when the call left the group untouched.
    pub changed: bool,
}

/// Shrinks production groups when stock substitutes for production.
pub struct ProductionGroupReallocator;

impl ProductionGroupReallocator {
    /// Reduce `group` by the share of its instances present in `attended`.
    ///
    /// `totalPartsQuantity`, every filament need, the print time, and each
    /// part's quantity are scaled by `1 − proportion` with round-half-up. A
    /// group recording no origin instances yields proportion 0: no data means
    /// no reduction.
    pub fn reallocate(
        group: &ProductionGroup,
        attended: &[AssemblyInstanceId],
    ) -> ReallocationOutcome {
        let total = group.total_instances();
        if total == 0 {
            return ReallocationOutcome {
                group: group.clone(),
                proportion_attended: 0.0,
                changed: false,
            };
        }

        let attended_set: HashSet<&AssemblyInstanceId> = attended.iter().collect();
        let attended_count = group
            .origins
            .iter()
            .flat_map(|o| o.assembly_instances.iter())
            .filter(|i| attended_set.contains(i))
            .count();

        let proportion = attended_count as f64 / total as f64;
        if attended_count == 0 {
            return ReallocationOutcome {
                group: group.clone(),
                proportion_attended: 0.0,
                changed: false,
            };
        }

        let factor = 1.0 - proportion;
        let mut next = group.clone();

        next.total_parts_quantity = round_half_up_u32(group.total_parts_quantity as f64 * factor);
        for filament in &mut next.filaments {
            // min() keeps sub-gram values monotonic: rounding half up must
            // never push a quantity above what the group already records.
            filament.quantity = round_half_up(filament.quantity * factor).min(filament.quantity);
        }
        next.print_minutes = round_half_up(group.print_minutes * factor).min(group.print_minutes);
        for part in next.parts.values_mut() {
            part.quantity = round_half_up_u32(part.quantity as f64 * factor);
        }

        let changed = next.total_parts_quantity != group.total_parts_quantity
            || next.print_minutes != group.print_minutes
            || next.filaments != group.filaments
            || next.parts != group.parts;

        let all_parts_zero =
            next.total_parts_quantity == 0 && next.parts.values().all(|p| p.quantity == 0);

        next.status = if all_parts_zero {
            ProductionGroupStatus::FulfilledFromStock
        } else if changed && next.total_parts_quantity < group.original_quantity {
            ProductionGroupStatus::InProduction
        } else {
            group.status
        };

        ReallocationOutcome {
            group: next,
            proportion_attended: proportion,
            changed,
        }
    }
}
