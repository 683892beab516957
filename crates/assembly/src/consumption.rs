//! Consumption-event wire contract.
//!
//! A consumption event records stock being used to fulfill (part of) an
//! order. It is immutable input: the engine only reads it. The payload
//! arrives over the platform topic with at-least-once delivery; the envelope
//! message id doubles as the ledger event identity.

use serde::{Deserialize, Serialize};

use printops_core::{OrderId, ProductId, ProductKind};
use printops_events::Message;

use crate::path::AssemblyInstanceId;

/// The root product the consumption was registered against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootProduct {
    pub id: ProductId,
    #[serde(rename = "tipo")]
    pub kind: ProductKind,
    #[serde(rename = "quantidade")]
    pub quantity: u32,
}

/// One consumed position of the expanded tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumedProduct {
    #[serde(rename = "produtoId")]
    pub product_id: ProductId,
    #[serde(rename = "produtoTipo")]
    pub kind: ProductKind,
    #[serde(rename = "quantidade")]
    pub quantity: u32,
    #[serde(rename = "nivel")]
    pub level: u32,
    #[serde(rename = "parentModeloId", default, skip_serializing_if = "Option::is_none")]
    pub parent_model_id: Option<ProductId>,
    #[serde(rename = "parentKitId", default, skip_serializing_if = "Option::is_none")]
    pub parent_kit_id: Option<ProductId>,
    #[serde(
        rename = "assemblyInstanceId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub assembly_instance_id: Option<AssemblyInstanceId>,
}

/// Stock-consumption event, as delivered by the platform topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionEvent {
    #[serde(rename = "pedidoId")]
    pub order_id: OrderId,
    #[serde(rename = "nivelUsado")]
    pub level_used: u32,
    #[serde(rename = "produtoRaiz")]
    pub root: RootProduct,
    #[serde(rename = "produtosConsumidos", default)]
    pub consumed: Vec<ConsumedProduct>,
}

impl ConsumptionEvent {
    /// True when the caller did not flatten the tree; the applier runs the
    /// hierarchy resolver before reconciling.
    pub fn needs_flattening(&self) -> bool {
        self.consumed.is_empty()
    }
}

impl Message for ConsumptionEvent {
    fn message_type(&self) -> &'static str {
        "estoque.consumo"
    }

    /// Events of one order are serialized; different orders may interleave.
    fn ordering_key(&self) -> Option<String> {
        Some(self.order_id.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_the_store_payload_shape() {
        let raw = serde_json::json!({
            "pedidoId": "ped1",
            "nivelUsado": 3,
            "produtoRaiz": { "id": "kitA", "tipo": "kit", "quantidade": 1 },
            "produtosConsumidos": [
                {
                    "produtoId": "pecaC",
                    "produtoTipo": "peca",
                    "quantidade": 2,
                    "nivel": 7,
                    "parentModeloId": "modB",
                    "parentKitId": "kitA",
                    "assemblyInstanceId": "ped1-kitA-1-modB-1-pecaC-1"
                }
            ]
        });

        let event: ConsumptionEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.root.kind, ProductKind::Kit);
        assert_eq!(event.consumed[0].level, 7);
        assert_eq!(
            event.consumed[0].assembly_instance_id.as_ref().unwrap().as_str(),
            "ped1-kitA-1-modB-1-pecaC-1"
        );
        assert!(!event.needs_flattening());
    }

    #[test]
    fn missing_consumed_list_means_the_caller_did_not_flatten() {
        let raw = serde_json::json!({
            "pedidoId": "ped1",
            "nivelUsado": 3,
            "produtoRaiz": { "id": "kitA", "tipo": "kit", "quantidade": 2 }
        });

        let event: ConsumptionEvent = serde_json::from_value(raw).unwrap();
        assert!(event.needs_flattening());
        assert_eq!(event.ordering_key().as_deref(), Some("ped1"));
    }
}
