//! Filament stock aggregates.
//!
//! One `FilamentGroup` document aggregates every spool of one filament
//! specification. The aggregate is recomputed in full whenever any spool
//! changes, which makes the stage idempotent under message replay.

use serde::{Deserialize, Serialize};

use printops_core::{FilamentGroupId, SpoolId};

/// One physical spool in stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spool {
    pub id: SpoolId,
    #[serde(rename = "grupoFilamentoId")]
    pub filament_group_id: FilamentGroupId,
    #[serde(rename = "custoPorGrama", default)]
    pub cost_per_gram: f64,
    /// Grams remaining on the spool.
    #[serde(rename = "estoqueAtual", default)]
    pub current_stock: f64,
    #[serde(rename = "consumoProducao", default)]
    pub production_consumption: f64,
    #[serde(rename = "consumoReal", default)]
    pub actual_consumption: f64,
}

/// Aggregate over all spools of one filament group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilamentGroup {
    pub id: FilamentGroupId,
    #[serde(rename = "nome", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "custoMedioPonderado", default)]
    pub weighted_average_cost: f64,
    #[serde(rename = "estoqueTotalGramas", default)]
    pub total_stock_grams: f64,
    #[serde(rename = "spoolsEmEstoqueIds", default)]
    pub in_stock_spool_ids: Vec<SpoolId>,
    /// Monotonically-increasing consumption counters, summed over all spools
    /// regardless of remaining stock.
    #[serde(rename = "consumoProducao", default)]
    pub production_consumption: f64,
    #[serde(rename = "consumoReal", default)]
    pub actual_consumption: f64,
}

/// What the aggregation stage decided about the group document.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationOutcome {
    /// Write (upsert) this aggregate.
    Updated(FilamentGroup),
    /// No spools reference the group anymore: delete the document, do not
    /// zero it.
    Deleted,
}

/// Recompute one filament-group aggregate from its spools.
///
/// The weighted average covers only spools with stock; the consumption
/// counters cover every spool. Spools belonging to other groups are ignored.
pub fn aggregate_filament_group(
    id: &FilamentGroupId,
    name: Option<String>,
    spools: &[Spool],
) -> AggregationOutcome {
    let mine: Vec<&Spool> = spools
        .iter()
        .filter(|s| &s.filament_group_id == id)
        .collect();

    if mine.is_empty() {
        return AggregationOutcome::Deleted;
    }

    let in_stock: Vec<&&Spool> = mine.iter().filter(|s| s.current_stock > 0.0).collect();
    let total_stock: f64 = in_stock.iter().map(|s| s.current_stock).sum();
    let weighted_average_cost = if total_stock > 0.0 {
        in_stock
            .iter()
            .map(|s| s.cost_per_gram * s.current_stock)
            .sum::<f64>()
            / total_stock
    } else {
        0.0
    };

    AggregationOutcome::Updated(FilamentGroup {
        id: id.clone(),
        name,
        weighted_average_cost,
        total_stock_grams: total_stock,
        in_stock_spool_ids: in_stock.iter().map(|s| s.id.clone()).collect(),
        production_consumption: mine.iter().map(|s| s.production_consumption).sum(),
        actual_consumption: mine.iter().map(|s| s.actual_consumption).sum(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gid(s: &str) -> FilamentGroupId {
        FilamentGroupId::new(s).unwrap()
    }

    fn spool(id: &str, group: &str, cost: f64, stock: f64) -> Spool {
        Spool {
            id: SpoolId::new(id).unwrap(),
            filament_group_id: gid(group),
            cost_per_gram: cost,
            current_stock: stock,
            production_consumption: 10.0,
            actual_consumption: 8.0,
        }
    }

    #[test]
    fn weighted_average_covers_only_spools_with_stock() {
        let spools = vec![
            spool("s1", "pla-verde", 0.10, 600.0),
            spool("s2", "pla-verde", 0.20, 200.0),
            spool("s3", "pla-verde", 0.90, 0.0), // empty: excluded from the average
        ];

        let AggregationOutcome::Updated(group) =
            aggregate_filament_group(&gid("pla-verde"), None, &spools)
        else {
            panic!("expected an update")
        };

        // (0.10*600 + 0.20*200) / 800 = 0.125
        assert!((group.weighted_average_cost - 0.125).abs() < 1e-9);
        assert_eq!(group.total_stock_grams, 800.0);
        assert_eq!(group.in_stock_spool_ids.len(), 2);
        // Counters cover all three spools.
        assert_eq!(group.production_consumption, 30.0);
        assert_eq!(group.actual_consumption, 24.0);
    }

    #[test]
    fn group_with_no_spools_is_deleted_not_zeroed() {
        let spools = vec![spool("s1", "pla-azul", 0.10, 100.0)];
        let outcome = aggregate_filament_group(&gid("pla-verde"), None, &spools);
        assert_eq!(outcome, AggregationOutcome::Deleted);
    }

    #[test]
    fn all_empty_spools_keep_the_document_with_zero_average() {
        let spools = vec![spool("s1", "pla-verde", 0.10, 0.0)];
        let AggregationOutcome::Updated(group) =
            aggregate_filament_group(&gid("pla-verde"), None, &spools)
        else {
            panic!("expected an update")
        };
        assert_eq!(group.weighted_average_cost, 0.0);
        assert_eq!(group.total_stock_grams, 0.0);
        assert!(group.in_stock_spool_ids.is_empty());
        assert_eq!(group.production_consumption, 10.0);
    }

    #[test]
    fn recomputation_is_idempotent() {
        let spools = vec![
            spool("s1", "pla-verde", 0.10, 600.0),
            spool("s2", "pla-verde", 0.20, 200.0),
        ];
        let once = aggregate_filament_group(&gid("pla-verde"), None, &spools);
        let twice = aggregate_filament_group(&gid("pla-verde"), None, &spools);
        assert_eq!(once, twice);
    }
}
