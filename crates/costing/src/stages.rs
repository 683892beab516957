//! Pure cost computations for the piece → model → kit stages.
//!
//! Every function is a full recompute from current inputs, never an
//! incremental delta, so replaying a stage signal lands on the same number.
//! Upstream costs arrive as injected lookups; a missing lookup contributes
//! zero (the next cascade run picks the value up once it exists).

use printops_catalog::{Kit, Model, Piece};
use printops_core::ProductId;

use crate::rates::ServiceRates;
use crate::sources::{FilamentCostSource, InsumoCostSource};

/// Piece cost: filament + other insumos + printer time + the piece's own
/// assembly time.
pub fn piece_cost(
    piece: &Piece,
    filaments: impl FilamentCostSource,
    insumos: impl InsumoCostSource,
    rates: &ServiceRates,
) -> f64 {
    let filament: f64 = piece
        .print_groups
        .iter()
        .flat_map(|g| g.filaments.iter())
        .map(|f| f.grams * filaments.cost_per_gram(&f.filament_group_id).unwrap_or(0.0))
        .sum();

    let insumo: f64 = piece
        .other_insumos
        .iter()
        .map(|i| i.quantity * insumos.unit_cost(&i.insumo_id).unwrap_or(0.0))
        .sum();

    let printing = print_minutes(piece) * rates.cost_per_minute_3d_print;
    let assembly = piece.assembly_minutes * rates.cost_per_minute_assembly;

    filament + insumo + printing + assembly
}

/// The piece's own impression minutes win; print-group times are the
/// fallback for documents that only record per-plate durations.
fn print_minutes(piece: &Piece) -> f64 {
    if piece.print_minutes > 0.0 {
        piece.print_minutes
    } else {
        piece.print_groups.iter().map(|g| g.print_minutes).sum()
    }
}

/// Model cost: component pieces plus the model's **own** assembly minutes.
///
/// Piece assembly minutes are already inside each piece cost; adding them
/// again here was a real duplication defect and must not come back.
pub fn model_cost(
    model: &Model,
    piece_cost_of: impl Fn(&ProductId) -> Option<f64>,
    rates: &ServiceRates,
) -> f64 {
    let pieces: f64 = model
        .pieces
        .iter()
        .map(|r| piece_cost_of(&r.piece_id).unwrap_or(0.0) * r.quantity as f64)
        .sum();

    pieces + model.assembly_minutes * rates.cost_per_minute_assembly
}

/// Kit cost: component models, direct pieces, and the kit's own assembly
/// minutes.
pub fn kit_cost(
    kit: &Kit,
    model_cost_of: impl Fn(&ProductId) -> Option<f64>,
    piece_cost_of: impl Fn(&ProductId) -> Option<f64>,
    rates: &ServiceRates,
) -> f64 {
    let models: f64 = kit
        .models
        .iter()
        .map(|r| model_cost_of(&r.model_id).unwrap_or(0.0) * r.quantity as f64)
        .sum();

    let pieces: f64 = kit
        .loose_pieces
        .iter()
        .map(|r| piece_cost_of(&r.piece_id).unwrap_or(0.0) * r.quantity as f64)
        .sum();

    models + pieces + kit.assembly_minutes * rates.cost_per_minute_assembly
}
