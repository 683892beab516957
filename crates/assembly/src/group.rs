//! Assembly-group documents: required vs fulfilled quantities per position.
//!
//! One document exists per (target product type, assembly instance). The only
//! mutation primitive is a ledger append; `quantidadeAtendida` is always the
//! ledger sum, never incremented directly, which keeps re-application of a
//! message idempotent. Documents keep the store's legacy field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use printops_core::{EventId, OrderId, ProductId, ProductKind};

use crate::path::AssemblyInstanceId;

/// Lifecycle of an assembly group.
///
/// `aguardando_montagem → em_montagem → concluido_por_estoque /
/// atendido_por_estoque` (terminal) `→ finalizado` (set by the packaging
/// collaborator, outside this core). Terminal states never regress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AssemblyGroupStatus {
    #[default]
    #[serde(rename = "aguardando_montagem")]
    WaitingAssembly,
    #[serde(rename = "em_montagem")]
    InAssembly,
    #[serde(rename = "concluido_por_estoque")]
    CompletedFromStock,
    #[serde(rename = "atendido_por_estoque")]
    FulfilledFromStock,
    #[serde(rename = "finalizado")]
    Finalized,
}

impl AssemblyGroupStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AssemblyGroupStatus::CompletedFromStock
                | AssemblyGroupStatus::FulfilledFromStock
                | AssemblyGroupStatus::Finalized
        )
    }
}

/// One append-only fulfillment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Source of the fulfillment, e.g. `estoque_peca`.
    #[serde(rename = "origem")]
    pub origin: String,
    #[serde(rename = "quantidade")]
    pub quantity: u32,
    #[serde(rename = "timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Identity of the consumption event that produced this entry. Legacy
    /// documents predate the field, so it stays optional on the wire.
    #[serde(rename = "eventId", default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
}

/// Outcome of a ledger append attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Appended; carries the quantity actually credited.
    Applied(u32),
    /// Appended with the quantity clamped to the remaining need; carries the
    /// surplus that was cut off.
    Clamped { applied: u32, surplus: u32 },
    /// Nothing appended: the node was already fully attended.
    AlreadyFull { surplus: u32 },
    /// Nothing appended: this event already has an entry on this node.
    Duplicate,
}

impl AppendOutcome {
    pub fn surplus(self) -> u32 {
        match self {
            AppendOutcome::Clamped { surplus, .. } | AppendOutcome::AlreadyFull { surplus } => {
                surplus
            }
            _ => 0,
        }
    }

    pub fn changed(self) -> bool {
        matches!(
            self,
            AppendOutcome::Applied(_) | AppendOutcome::Clamped { .. }
        )
    }
}

/// Requirement for one sub-product of a group, with its own ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(rename = "produtoId")]
    pub product_id: ProductId,
    #[serde(rename = "nome", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "quantidadeNecessaria")]
    pub required: u32,
    #[serde(rename = "quantidadeAtendida", default)]
    pub attended: u32,
    #[serde(rename = "atendimentoDetalhado", default)]
    pub ledger: Vec<LedgerEntry>,
}

impl Requirement {
    pub fn new(product_id: ProductId, required: u32) -> Self {
        Self {
            product_id,
            name: None,
            required,
            attended: 0,
            ledger: Vec::new(),
        }
    }

    pub fn ledger_sum(&self) -> u32 {
        self.ledger.iter().map(|e| e.quantity).sum()
    }

    pub fn is_fulfilled(&self) -> bool {
        self.attended >= self.required
    }

    fn has_event(&self, event_id: EventId) -> bool {
        self.ledger.iter().any(|e| e.event_id == Some(event_id))
    }

    /// Append a fulfillment entry, clamping at the required quantity and
    /// skipping events already recorded on this node.
    pub fn append(
        &mut self,
        origin: &str,
        quantity: u32,
        timestamp: DateTime<Utc>,
        event_id: EventId,
    ) -> AppendOutcome {
        if self.has_event(event_id) {
            return AppendOutcome::Duplicate;
        }
        append_to_ledger(
            &mut self.ledger,
            &mut self.attended,
            self.required,
            origin,
            quantity,
            timestamp,
            event_id,
        )
    }
}

/// Requirement for a model, carrying its nested piece requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequirement {
    #[serde(rename = "produtoId")]
    pub product_id: ProductId,
    #[serde(rename = "nome", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "quantidadeNecessaria")]
    pub required: u32,
    #[serde(rename = "quantidadeAtendida", default)]
    pub attended: u32,
    #[serde(rename = "atendimentoDetalhado", default)]
    pub ledger: Vec<LedgerEntry>,
    #[serde(rename = "pecasNecessarias", default)]
    pub pieces: Vec<Requirement>,
}

impl ModelRequirement {
    pub fn new(product_id: ProductId, required: u32, pieces: Vec<Requirement>) -> Self {
        Self {
            product_id,
            name: None,
            required,
            attended: 0,
            ledger: Vec::new(),
            pieces,
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        self.attended >= self.required && self.pieces.iter().all(Requirement::is_fulfilled)
    }

    fn has_event(&self, event_id: EventId) -> bool {
        self.ledger.iter().any(|e| e.event_id == Some(event_id))
    }

    pub fn append(
        &mut self,
        origin: &str,
        quantity: u32,
        timestamp: DateTime<Utc>,
        event_id: EventId,
    ) -> AppendOutcome {
        if self.has_event(event_id) {
            return AppendOutcome::Duplicate;
        }
        append_to_ledger(
            &mut self.ledger,
            &mut self.attended,
            self.required,
            origin,
            quantity,
            timestamp,
            event_id,
        )
    }
}

fn append_to_ledger(
    ledger: &mut Vec<LedgerEntry>,
    attended: &mut u32,
    required: u32,
    origin: &str,
    quantity: u32,
    timestamp: DateTime<Utc>,
    event_id: EventId,
) -> AppendOutcome {
    // Derive from the ledger, not the cached field: the two must agree and the
    // ledger wins.
    let current = ledger.iter().map(|e| e.quantity).sum::<u32>();
    let headroom = required.saturating_sub(current);

    if headroom == 0 {
        *attended = current;
        return AppendOutcome::AlreadyFull { surplus: quantity };
    }

    let applied = quantity.min(headroom);
    ledger.push(LedgerEntry {
        origin: origin.to_string(),
        quantity: applied,
        timestamp,
        event_id: Some(event_id),
    });
    *attended = current + applied;

    if applied < quantity {
        AppendOutcome::Clamped {
            applied,
            surplus: quantity - applied,
        }
    } else {
        AppendOutcome::Applied(applied)
    }
}

/// Assembly group document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyGroup {
    /// Document id: the assembly-instance key of the addressed position.
    pub id: AssemblyInstanceId,
    #[serde(rename = "pedidoId")]
    pub order_id: OrderId,
    #[serde(rename = "produtoId")]
    pub product_id: ProductId,
    #[serde(rename = "tipoProdutoAlvo")]
    pub target_kind: ProductKind,
    #[serde(rename = "quantidadeNecessaria")]
    pub required: u32,
    #[serde(rename = "quantidadeAtendida", default)]
    pub attended: u32,
    #[serde(default)]
    pub status: AssemblyGroupStatus,
    #[serde(rename = "atendimentoDetalhado", default)]
    pub ledger: Vec<LedgerEntry>,
    #[serde(rename = "modelosNecessarios", default)]
    pub models: Vec<ModelRequirement>,
    #[serde(rename = "pecasNecessarias", default)]
    pub pieces: Vec<Requirement>,
    #[serde(rename = "partesNecessarias", default)]
    pub parts: Vec<Requirement>,
}

impl AssemblyGroup {
    pub fn new(
        id: AssemblyInstanceId,
        order_id: OrderId,
        product_id: ProductId,
        target_kind: ProductKind,
        required: u32,
    ) -> Self {
        Self {
            id,
            order_id,
            product_id,
            target_kind,
            required,
            attended: 0,
            status: AssemblyGroupStatus::default(),
            ledger: Vec::new(),
            models: Vec::new(),
            pieces: Vec::new(),
            parts: Vec::new(),
        }
    }

    fn has_event(&self, event_id: EventId) -> bool {
        self.ledger.iter().any(|e| e.event_id == Some(event_id))
    }

    /// Append to the group's own ledger (root-level fulfillment).
    pub fn append_own(
        &mut self,
        origin: &str,
        quantity: u32,
        timestamp: DateTime<Utc>,
        event_id: EventId,
    ) -> AppendOutcome {
        if self.has_event(event_id) {
            return AppendOutcome::Duplicate;
        }
        append_to_ledger(
            &mut self.ledger,
            &mut self.attended,
            self.required,
            origin,
            quantity,
            timestamp,
            event_id,
        )
    }

    /// Completion predicate, recursive through model → piece nesting.
    ///
    /// Groups with sub-requirements complete when every entry is fulfilled;
    /// leaf groups (no sub-lists) complete on their own quantity.
    pub fn is_complete(&self) -> bool {
        let has_subs = !self.models.is_empty() || !self.pieces.is_empty() || !self.parts.is_empty();
        if !has_subs {
            return self.required > 0 && self.attended >= self.required;
        }
        self.models.iter().all(ModelRequirement::is_fulfilled)
            && self.pieces.iter().all(Requirement::is_fulfilled)
            && self.parts.iter().all(Requirement::is_fulfilled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> ProductId {
        ProductId::new(s).unwrap()
    }

    fn group() -> AssemblyGroup {
        AssemblyGroup::new(
            AssemblyInstanceId::from_raw("ped1-kitA-1"),
            OrderId::new("ped1").unwrap(),
            pid("kitA"),
            ProductKind::Kit,
            1,
        )
    }

    #[test]
    fn attended_always_equals_the_ledger_sum() {
        let mut req = Requirement::new(pid("pecaA"), 5);
        req.append("estoque_peca", 2, Utc::now(), EventId::new());
        req.append("estoque_peca", 1, Utc::now(), EventId::new());
        assert_eq!(req.attended, 3);
        assert_eq!(req.attended, req.ledger_sum());
    }

    #[test]
    fn appends_beyond_the_need_are_clamped_not_dropped() {
        let mut req = Requirement::new(pid("pecaA"), 3);
        let out = req.append("estoque_peca", 5, Utc::now(), EventId::new());
        assert_eq!(out, AppendOutcome::Clamped { applied: 3, surplus: 2 });
        assert_eq!(req.attended, 3);

        let out = req.append("estoque_peca", 1, Utc::now(), EventId::new());
        assert_eq!(out, AppendOutcome::AlreadyFull { surplus: 1 });
        assert_eq!(req.ledger.len(), 1);
    }

    #[test]
    fn replaying_the_same_event_is_a_no_op() {
        let event = EventId::new();
        let mut req = Requirement::new(pid("pecaA"), 4);
        assert_eq!(
            req.append("estoque_peca", 2, Utc::now(), event),
            AppendOutcome::Applied(2)
        );
        assert_eq!(
            req.append("estoque_peca", 2, Utc::now(), event),
            AppendOutcome::Duplicate
        );
        assert_eq!(req.attended, 2);
        assert_eq!(req.ledger.len(), 1);
    }

    #[test]
    fn legacy_entries_without_event_id_still_count_in_the_sum() {
        let raw = serde_json::json!({
            "produtoId": "pecaA",
            "quantidadeNecessaria": 4,
            "atendimentoDetalhado": [
                { "origem": "estoque_peca", "quantidade": 3, "timestamp": "2024-05-01T12:00:00Z" }
            ]
        });
        let mut req: Requirement = serde_json::from_value(raw).unwrap();
        assert_eq!(req.ledger_sum(), 3);

        let out = req.append("estoque_peca", 2, Utc::now(), EventId::new());
        assert_eq!(out, AppendOutcome::Clamped { applied: 1, surplus: 1 });
        assert_eq!(req.attended, 4);
    }

    #[test]
    fn leaf_group_completes_on_its_own_quantity() {
        let mut g = group();
        assert!(!g.is_complete());
        g.append_own("estoque_kit", 1, Utc::now(), EventId::new());
        assert!(g.is_complete());
    }

    #[test]
    fn nested_completion_requires_every_piece_of_every_model() {
        let mut g = group();
        g.models.push(ModelRequirement::new(
            pid("modB"),
            1,
            vec![Requirement::new(pid("pecaC"), 2)],
        ));

        let event = EventId::new();
        g.models[0].append("estoque_modelo", 1, Utc::now(), event);
        assert!(!g.is_complete());

        g.models[0].pieces[0].append("estoque_peca", 2, Utc::now(), event);
        assert!(g.is_complete());
    }

    #[test]
    fn group_document_round_trips_with_store_field_names() {
        let mut g = group();
        g.pieces.push(Requirement::new(pid("pecaC"), 2));
        g.pieces[0].append("estoque_peca", 1, Utc::now(), EventId::new());

        let json = serde_json::to_value(&g).unwrap();
        assert_eq!(json["pedidoId"], "ped1");
        assert_eq!(json["tipoProdutoAlvo"], "kit");
        assert_eq!(json["status"], "aguardando_montagem");
        assert_eq!(json["pecasNecessarias"][0]["quantidadeAtendida"], 1);
        assert_eq!(
            json["pecasNecessarias"][0]["atendimentoDetalhado"][0]["origem"],
            "estoque_peca"
        );

        let back: AssemblyGroup = serde_json::from_value(json).unwrap();
        assert_eq!(back, g);
    }
}
