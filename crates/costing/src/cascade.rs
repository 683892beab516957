//! Cascade-stage signal contract.
//!
//! Stages are driven by explicit successor messages, never by raw write
//! triggers on the store: that keeps the filament → piece → model → kit order
//! fixed and prevents self-triggering recomputation storms. Signals for one
//! target id share an ordering key so the platform (and our workers) can
//! serialize them.

use serde::{Deserialize, Serialize};

use printops_events::Message;

/// The four strictly-ordered recomputation stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CascadeStage {
    #[serde(rename = "filament_group_aggregation")]
    FilamentGroupAggregation,
    #[serde(rename = "piece_cost")]
    PieceCost,
    #[serde(rename = "model_cost")]
    ModelCost,
    #[serde(rename = "kit_cost")]
    KitCost,
}

impl CascadeStage {
    /// Position in the fixed stage order (lower runs first in a full walk).
    pub fn order(self) -> u8 {
        match self {
            CascadeStage::FilamentGroupAggregation => 0,
            CascadeStage::PieceCost => 1,
            CascadeStage::ModelCost => 2,
            CascadeStage::KitCost => 3,
        }
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            CascadeStage::FilamentGroupAggregation => "filament_group_aggregation",
            CascadeStage::PieceCost => "piece_cost",
            CascadeStage::ModelCost => "model_cost",
            CascadeStage::KitCost => "kit_cost",
        }
    }
}

/// One stage-execution request: `{stage, targetId}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeSignal {
    pub stage: CascadeStage,
    #[serde(rename = "targetId")]
    pub target_id: String,
}

impl CascadeSignal {
    pub fn new(stage: CascadeStage, target_id: impl Into<String>) -> Self {
        Self {
            stage,
            target_id: target_id.into(),
        }
    }
}

impl Message for CascadeSignal {
    fn message_type(&self) -> &'static str {
        "custo.cascata"
    }

    /// Serialize all stage runs for one target id.
    fn ordering_key(&self) -> Option<String> {
        Some(self.target_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_wire_shape_is_stage_plus_target_id() {
        let signal = CascadeSignal::new(CascadeStage::PieceCost, "pecaC");
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json, serde_json::json!({ "stage": "piece_cost", "targetId": "pecaC" }));

        let back: CascadeSignal = serde_json::from_value(json).unwrap();
        assert_eq!(back, signal);
    }

    #[test]
    fn stage_order_is_filament_piece_model_kit() {
        let mut stages = [
            CascadeStage::KitCost,
            CascadeStage::FilamentGroupAggregation,
            CascadeStage::ModelCost,
            CascadeStage::PieceCost,
        ];
        stages.sort_by_key(|s| s.order());
        assert_eq!(
            stages,
            [
                CascadeStage::FilamentGroupAggregation,
                CascadeStage::PieceCost,
                CascadeStage::ModelCost,
                CascadeStage::KitCost,
            ]
        );
    }

    #[test]
    fn signals_for_one_target_share_an_ordering_key() {
        let a = CascadeSignal::new(CascadeStage::PieceCost, "pecaC");
        let b = CascadeSignal::new(CascadeStage::ModelCost, "pecaC");
        assert_eq!(a.ordering_key(), b.ordering_key());
    }
}
