//! Production-group documents.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use printops_assembly::AssemblyInstanceId;
use printops_core::{FilamentGroupId, OrderId};

/// Lifecycle of a production group: `aguardando → em_producao →
/// atendido_por_estoque` (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProductionGroupStatus {
    #[default]
    #[serde(rename = "aguardando")]
    Waiting,
    #[serde(rename = "em_producao")]
    InProduction,
    #[serde(rename = "atendido_por_estoque")]
    FulfilledFromStock,
}

impl ProductionGroupStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProductionGroupStatus::FulfilledFromStock)
    }
}

/// Aggregated demand for one part inside the group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartInGroup {
    #[serde(rename = "quantidade")]
    pub quantity: u32,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "temMontagem", default)]
    pub has_assembly: bool,
}

/// Filament demand of the whole group, in grams of one filament group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilamentNeed {
    #[serde(rename = "grupoFilamentoId")]
    pub filament_group_id: FilamentGroupId,
    #[serde(rename = "quantidade")]
    pub quantity: f64,
}

/// Back-link from the group to the assembly positions it feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderOrigin {
    #[serde(rename = "pedidoId")]
    pub order_id: OrderId,
    #[serde(rename = "assemblyInstances", default)]
    pub assembly_instances: Vec<AssemblyInstanceId>,
}

/// A batch of identical leaf production demand aggregated across orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionGroup {
    pub id: String,
    #[serde(rename = "nome", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub status: ProductionGroupStatus,
    /// Parts in the batch, keyed by part id.
    #[serde(rename = "partesNoGrupo", default)]
    pub parts: BTreeMap<String, PartInGroup>,
    #[serde(rename = "totalPartsQuantity", default)]
    pub total_parts_quantity: u32,
    /// Baseline quantity at group creation; never rewritten.
    #[serde(rename = "quantidadeOriginalGrupo", default)]
    pub original_quantity: u32,
    #[serde(rename = "filamentosNecessarios", default)]
    pub filaments: Vec<FilamentNeed>,
    #[serde(rename = "tempoImpressaoGrupo", default)]
    pub print_minutes: f64,
    #[serde(rename = "pedidosOrigem", default)]
    pub origins: Vec<OrderOrigin>,
}

impl ProductionGroup {
    /// Total assembly instances the group feeds, across all orders.
    pub fn total_instances(&self) -> usize {
        self.origins.iter().map(|o| o.assembly_instances.len()).sum()
    }

    pub fn contains_instance(&self, instance: &AssemblyInstanceId) -> bool {
        self.origins
            .iter()
            .any(|o| o.assembly_instances.contains(instance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_round_trips_with_store_field_names() {
        let raw = serde_json::json!({
            "id": "grupo-pla-01",
            "status": "aguardando",
            "partesNoGrupo": {
                "parteX": { "quantidade": 3, "nome": "Galho", "temMontagem": true }
            },
            "totalPartsQuantity": 3,
            "quantidadeOriginalGrupo": 3,
            "filamentosNecessarios": [
                { "grupoFilamentoId": "pla-verde", "quantidade": 60.0 }
            ],
            "tempoImpressaoGrupo": 60.0,
            "pedidosOrigem": [
                { "pedidoId": "ped1", "assemblyInstances": ["ped1-kitA-1", "ped1-kitA-2"] },
                { "pedidoId": "ped2", "assemblyInstances": ["ped2-kitA-1"] }
            ]
        });

        let group: ProductionGroup = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(group.total_instances(), 3);
        assert!(group.contains_instance(&AssemblyInstanceId::from_raw("ped2-kitA-1")));
        assert_eq!(group.status, ProductionGroupStatus::Waiting);

        let back = serde_json::to_value(&group).unwrap();
        assert_eq!(back["partesNoGrupo"]["parteX"]["quantidade"], 3);
        assert_eq!(back["quantidadeOriginalGrupo"], 3);
    }
}
