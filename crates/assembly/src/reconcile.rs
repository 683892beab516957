//! Stock-consumption reconciliation.
//!
//! `ReconciliationEngine::apply` is a pure function over an immutable snapshot
//! of the affected assembly-group documents. It returns only the documents it
//! changed plus structured warnings; the infra applier owns the transaction
//! and re-runs the whole apply on a store conflict. Non-fatal problems
//! (unknown level, missing target, clamped surplus) become warnings and the
//! event still counts as processed.

use std::collections::{BTreeMap, HashSet, btree_map::Entry};

use chrono::{DateTime, Utc};
use thiserror::Error;

use printops_core::{EventId, ProductId, ProductKind, round_half_up_u32};

use crate::consumption::{ConsumedProduct, ConsumptionEvent};
use crate::group::{AppendOutcome, AssemblyGroup, AssemblyGroupStatus};
use crate::path::AssemblyInstanceId;
use crate::resolver::{LEVEL_MODEL, LEVEL_PART, LEVEL_PIECE, LEVEL_ROOT};

/// Immutable snapshot of the assembly groups an event may touch.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationState {
    groups: BTreeMap<AssemblyInstanceId, AssemblyGroup>,
}

impl ReconciliationState {
    pub fn from_groups(groups: impl IntoIterator<Item = AssemblyGroup>) -> Self {
        Self {
            groups: groups.into_iter().map(|g| (g.id.clone(), g)).collect(),
        }
    }

    pub fn get(&self, id: &AssemblyInstanceId) -> Option<&AssemblyGroup> {
        self.groups.get(id)
    }

    pub fn groups(&self) -> impl Iterator<Item = &AssemblyGroup> {
        self.groups.values()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// New snapshot with the given documents replacing their predecessors
    /// (how tests and replays advance the state between applies).
    pub fn updated(&self, changed: BTreeMap<AssemblyInstanceId, AssemblyGroup>) -> Self {
        let mut groups = self.groups.clone();
        groups.extend(changed);
        Self { groups }
    }
}

/// Non-fatal reconciliation outcomes, surfaced as structured logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileWarning {
    #[error("malformed assembly key '{key}' on entry for {product}")]
    MalformedKey { key: String, product: ProductId },

    #[error("unknown level {level} on entry for {product}; entry skipped")]
    UnresolvedLevel { level: u32, product: ProductId },

    #[error("no assembly group matches entry for {product} (level {level}); entry skipped")]
    TargetNotFound { product: ProductId, level: u32 },

    #[error("fulfillment of {product} in group {group} exceeded the need by {surplus}; clamped")]
    Overflow {
        group: AssemblyInstanceId,
        product: ProductId,
        surplus: u32,
    },
}

/// Result of applying one consumption event.
#[derive(Debug, Clone, Default)]
pub struct AppliedResult {
    /// Documents that changed, keyed by document id. Commit as one unit.
    pub groups: BTreeMap<AssemblyInstanceId, AssemblyGroup>,
    pub warnings: Vec<ReconcileWarning>,
    /// Groups that reached a terminal status in this apply; production-group
    /// reallocation consumes these instances.
    pub newly_completed: Vec<AssemblyInstanceId>,
}

/// Applies consumption events to assembly-group snapshots.
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    /// Apply one event. Pure: same snapshot + same event (and event id) give
    /// the same result, and re-applying a previously applied event id yields
    /// no changes.
    pub fn apply(
        state: &ReconciliationState,
        event: &ConsumptionEvent,
        event_id: EventId,
        now: DateTime<Utc>,
    ) -> AppliedResult {
        let mut touched: BTreeMap<AssemblyInstanceId, AssemblyGroup> = BTreeMap::new();
        let mut warnings: Vec<ReconcileWarning> = Vec::new();
        // Piece ids already covered through a model cascade in this event;
        // identical ids listed directly under the kit are shadowed.
        let mut covered_by_model: HashSet<ProductId> = HashSet::new();
        // Groups whose own ledger took a root-level append from this event.
        let mut root_attended: HashSet<AssemblyInstanceId> = HashSet::new();

        for entry in &event.consumed {
            let targets = resolve_targets(state, event, entry, &mut warnings);
            if targets.is_empty() {
                warnings.push(ReconcileWarning::TargetNotFound {
                    product: entry.product_id.clone(),
                    level: entry.level,
                });
                continue;
            }

            for target_id in targets {
                let group = match touched.entry(target_id.clone()) {
                    Entry::Occupied(e) => e.into_mut(),
                    Entry::Vacant(v) => match state.get(&target_id) {
                        Some(orig) => v.insert(orig.clone()),
                        None => continue,
                    },
                };

                apply_entry(
                    group,
                    entry,
                    event_id,
                    now,
                    &mut covered_by_model,
                    &mut root_attended,
                    &mut warnings,
                );
            }
        }

        // Completion pass: terminal statuses are set once and never regress.
        let mut newly_completed = Vec::new();
        for (id, group) in &mut touched {
            if !group.status.is_terminal() && group.is_complete() {
                group.status = if root_attended.contains(id) {
                    AssemblyGroupStatus::FulfilledFromStock
                } else {
                    AssemblyGroupStatus::CompletedFromStock
                };
                newly_completed.push(id.clone());
            }
        }

        // Only documents that actually changed go to the commit set.
        touched.retain(|id, g| state.get(id).is_none_or(|orig| orig != &*g));

        AppliedResult {
            groups: touched,
            warnings,
            newly_completed,
        }
    }
}

/// Resolve the group documents an entry addresses.
///
/// Priority: exact instance-key match, then the key's root-prefix document
/// (sub-positions live inside their root group), then — for malformed or
/// absent keys — reconstruction from `(nivel, produtoRaiz)`: every group of
/// this order whose target is the event's root product.
fn resolve_targets(
    state: &ReconciliationState,
    event: &ConsumptionEvent,
    entry: &ConsumedProduct,
    warnings: &mut Vec<ReconcileWarning>,
) -> Vec<AssemblyInstanceId> {
    if let Some(key) = &entry.assembly_instance_id {
        if state.get(key).is_some() {
            return vec![key.clone()];
        }

        match key.parse() {
            Ok(path) => {
                let root_key = path.root_prefix().encode();
                if state.get(&root_key).is_some() {
                    return vec![root_key];
                }
                // Valid key, no document: let the caller warn TargetNotFound.
                return Vec::new();
            }
            Err(_) => {
                warnings.push(ReconcileWarning::MalformedKey {
                    key: key.as_str().to_string(),
                    product: entry.product_id.clone(),
                });
                // Fall through to reconstruction.
            }
        }
    }

    state
        .groups()
        .filter(|g| g.order_id == event.order_id && g.product_id == event.root.id)
        .map(|g| g.id.clone())
        .collect()
}

/// Cascade scaling: `entry_quantity` units of the group's target cover
/// `required / group_required` of a child requirement per unit.
fn scaled(entry_quantity: u32, required: u32, group_required: u32) -> u32 {
    if group_required == 0 {
        return required;
    }
    round_half_up_u32(entry_quantity as f64 * required as f64 / group_required as f64)
}

fn note(outcome: AppendOutcome, group: &AssemblyInstanceId, product: &ProductId, warnings: &mut Vec<ReconcileWarning>) {
    let surplus = outcome.surplus();
    if surplus > 0 {
        warnings.push(ReconcileWarning::Overflow {
            group: group.clone(),
            product: product.clone(),
            surplus,
        });
    }
}

fn apply_entry(
    group: &mut AssemblyGroup,
    entry: &ConsumedProduct,
    event_id: EventId,
    now: DateTime<Utc>,
    covered_by_model: &mut HashSet<ProductId>,
    root_attended: &mut HashSet<AssemblyInstanceId>,
    warnings: &mut Vec<ReconcileWarning>,
) {
    let origin = entry.kind.stock_origin();
    let group_id = group.id.clone();

    match entry.level {
        LEVEL_PART => {
            let Some(part) = group
                .parts
                .iter_mut()
                .find(|p| p.product_id == entry.product_id)
            else {
                warnings.push(ReconcileWarning::TargetNotFound {
                    product: entry.product_id.clone(),
                    level: entry.level,
                });
                return;
            };
            let out = part.append(origin, entry.quantity, now, event_id);
            note(out, &group_id, &entry.product_id, warnings);
        }

        LEVEL_ROOT => {
            // The group itself was fulfilled from stock...
            let out = group.append_own(origin, entry.quantity, now, event_id);
            if out.changed() {
                root_attended.insert(group_id.clone());
            }
            note(out, &group_id, &entry.product_id, warnings);

            // ...so everything it owns is covered too. Models first; their
            // piece ids shadow identical direct entries.
            let group_required = group.required;
            for model in &mut group.models {
                let qty = scaled(entry.quantity, model.required, group_required);
                let out = model.append(ProductKind::Model.stock_origin(), qty, now, event_id);
                note(out, &group_id, &model.product_id.clone(), warnings);

                for piece in &mut model.pieces {
                    let qty = scaled(entry.quantity, piece.required, group_required);
                    let out = piece.append(ProductKind::Piece.stock_origin(), qty, now, event_id);
                    note(out, &group_id, &piece.product_id.clone(), warnings);
                    covered_by_model.insert(piece.product_id.clone());
                }
            }

            for piece in &mut group.pieces {
                if covered_by_model.contains(&piece.product_id) {
                    // Shadowed: already covered through a model in this event.
                    continue;
                }
                let qty = scaled(entry.quantity, piece.required, group_required);
                let out = piece.append(ProductKind::Piece.stock_origin(), qty, now, event_id);
                note(out, &group_id, &piece.product_id.clone(), warnings);
            }
        }

        LEVEL_MODEL => match entry.kind {
            // A model consumed from stock covers itself and its pieces.
            ProductKind::Model => {
                if group.target_kind == ProductKind::Model && group.product_id == entry.product_id
                {
                    let out = group.append_own(origin, entry.quantity, now, event_id);
                    if out.changed() {
                        root_attended.insert(group_id.clone());
                    }
                    note(out, &group_id, &entry.product_id, warnings);

                    let group_required = group.required;
                    for piece in &mut group.pieces {
                        let qty = scaled(entry.quantity, piece.required, group_required);
                        let out =
                            piece.append(ProductKind::Piece.stock_origin(), qty, now, event_id);
                        note(out, &group_id, &piece.product_id.clone(), warnings);
                        covered_by_model.insert(piece.product_id.clone());
                    }
                    return;
                }

                let Some(model) = group
                    .models
                    .iter_mut()
                    .find(|m| m.product_id == entry.product_id)
                else {
                    warnings.push(ReconcileWarning::TargetNotFound {
                        product: entry.product_id.clone(),
                        level: entry.level,
                    });
                    return;
                };

                let out = model.append(origin, entry.quantity, now, event_id);
                note(out, &group_id, &entry.product_id, warnings);

                let model_required = model.required;
                for piece in &mut model.pieces {
                    let qty = scaled(entry.quantity, piece.required, model_required);
                    let out = piece.append(ProductKind::Piece.stock_origin(), qty, now, event_id);
                    note(out, &group_id, &piece.product_id.clone(), warnings);
                    covered_by_model.insert(piece.product_id.clone());
                }
            }
            // A loose piece sits at model level in the kit's expansion.
            ProductKind::Piece => {
                if group.target_kind == ProductKind::Piece && group.product_id == entry.product_id
                {
                    let out = group.append_own(origin, entry.quantity, now, event_id);
                    if out.changed() {
                        root_attended.insert(group_id.clone());
                    }
                    note(out, &group_id, &entry.product_id, warnings);
                    return;
                }

                let Some(piece) = group
                    .pieces
                    .iter_mut()
                    .find(|p| p.product_id == entry.product_id)
                else {
                    warnings.push(ReconcileWarning::TargetNotFound {
                        product: entry.product_id.clone(),
                        level: entry.level,
                    });
                    return;
                };
                let out = piece.append(origin, entry.quantity, now, event_id);
                note(out, &group_id, &entry.product_id, warnings);
            }
            _ => {
                warnings.push(ReconcileWarning::TargetNotFound {
                    product: entry.product_id.clone(),
                    level: entry.level,
                });
            }
        },

        LEVEL_PIECE => {
            // Only the specific piece entry named; nothing cascades.
            if group.target_kind == ProductKind::Piece && group.product_id == entry.product_id {
                let out = group.append_own(origin, entry.quantity, now, event_id);
                if out.changed() {
                    root_attended.insert(group_id.clone());
                }
                note(out, &group_id, &entry.product_id, warnings);
                return;
            }

            let piece = match &entry.parent_model_id {
                Some(model_id) => group
                    .models
                    .iter_mut()
                    .find(|m| &m.product_id == model_id)
                    .and_then(|m| {
                        m.pieces
                            .iter_mut()
                            .find(|p| p.product_id == entry.product_id)
                    }),
                None => {
                    let nested = group.models.iter().any(|m| {
                        m.pieces.iter().any(|p| p.product_id == entry.product_id)
                    });
                    if nested {
                        group.models.iter_mut().find_map(|m| {
                            m.pieces
                                .iter_mut()
                                .find(|p| p.product_id == entry.product_id)
                        })
                    } else {
                        group
                            .pieces
                            .iter_mut()
                            .find(|p| p.product_id == entry.product_id)
                    }
                }
            };

            let Some(piece) = piece else {
                warnings.push(ReconcileWarning::TargetNotFound {
                    product: entry.product_id.clone(),
                    level: entry.level,
                });
                return;
            };
            let out = piece.append(origin, entry.quantity, now, event_id);
            note(out, &group_id, &entry.product_id, warnings);
        }

        level => {
            warnings.push(ReconcileWarning::UnresolvedLevel {
                level,
                product: entry.product_id.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{ModelRequirement, Requirement};
    use printops_core::OrderId;

    fn pid(s: &str) -> ProductId {
        ProductId::new(s).unwrap()
    }

    fn oid(s: &str) -> OrderId {
        OrderId::new(s).unwrap()
    }

    fn iid(s: &str) -> AssemblyInstanceId {
        AssemblyInstanceId::from_raw(s)
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    /// Kit group for "ped1": one model (modB) with pieces {A, B}, plus the
    /// given direct pieces.
    fn kit_group(direct: &[&str]) -> AssemblyGroup {
        let mut g = AssemblyGroup::new(
            iid("ped1-kitA-1"),
            oid("ped1"),
            pid("kitA"),
            ProductKind::Kit,
            1,
        );
        g.models.push(ModelRequirement::new(
            pid("modB"),
            1,
            vec![
                Requirement::new(pid("pecaA"), 1),
                Requirement::new(pid("pecaB"), 1),
            ],
        ));
        for d in direct {
            g.pieces.push(Requirement::new(pid(d), 1));
        }
        g
    }

    fn kit_event(quantity: u32) -> ConsumptionEvent {
        ConsumptionEvent {
            order_id: oid("ped1"),
            level_used: LEVEL_ROOT,
            root: crate::consumption::RootProduct {
                id: pid("kitA"),
                kind: ProductKind::Kit,
                quantity,
            },
            consumed: vec![ConsumedProduct {
                product_id: pid("kitA"),
                kind: ProductKind::Kit,
                quantity,
                level: LEVEL_ROOT,
                parent_model_id: None,
                parent_kit_id: None,
                assembly_instance_id: Some(iid("ped1-kitA-1")),
            }],
        }
    }

    fn piece_attended(group: &AssemblyGroup, model: Option<&str>, piece: &str) -> u32 {
        match model {
            Some(m) => group
                .models
                .iter()
                .find(|r| r.product_id == pid(m))
                .unwrap()
                .pieces
                .iter()
                .find(|p| p.product_id == pid(piece))
                .unwrap()
                .attended,
            None => group
                .pieces
                .iter()
                .find(|p| p.product_id == pid(piece))
                .unwrap()
                .attended,
        }
    }

    #[test]
    fn kit_consumption_shadows_identical_direct_pieces() {
        // The kit lists {A, B} both inside modB and directly: the model's
        // path wins and the direct entries stay untouched.
        let state = ReconciliationState::from_groups([kit_group(&["pecaA", "pecaB"])]);
        let result =
            ReconciliationEngine::apply(&state, &kit_event(1), EventId::new(), now());

        let group = &result.groups[&iid("ped1-kitA-1")];
        assert_eq!(piece_attended(group, Some("modB"), "pecaA"), 1);
        assert_eq!(piece_attended(group, Some("modB"), "pecaB"), 1);
        assert_eq!(piece_attended(group, None, "pecaA"), 0);
        assert_eq!(piece_attended(group, None, "pecaB"), 0);
    }

    #[test]
    fn kit_consumption_attends_distinct_direct_pieces() {
        // Direct pieces {D, E} share no id with the model's {A, B}: no
        // shadowing, everything is attended.
        let state = ReconciliationState::from_groups([kit_group(&["pecaD", "pecaE"])]);
        let result =
            ReconciliationEngine::apply(&state, &kit_event(1), EventId::new(), now());

        let group = &result.groups[&iid("ped1-kitA-1")];
        assert_eq!(piece_attended(group, Some("modB"), "pecaA"), 1);
        assert_eq!(piece_attended(group, None, "pecaD"), 1);
        assert_eq!(piece_attended(group, None, "pecaE"), 1);
        assert_eq!(group.attended, 1);
    }

    #[test]
    fn replaying_an_event_changes_nothing() {
        let state = ReconciliationState::from_groups([kit_group(&["pecaD"])]);
        let event = kit_event(1);
        let event_id = EventId::new();

        let first = ReconciliationEngine::apply(&state, &event, event_id, now());
        assert!(!first.groups.is_empty());

        let replay_state = state.updated(first.groups.clone());
        let second = ReconciliationEngine::apply(&replay_state, &event, event_id, now());
        assert!(second.groups.is_empty(), "replay must be a no-op");
        assert!(second.newly_completed.is_empty());
    }

    #[test]
    fn surplus_is_clamped_and_warned_not_dropped() {
        let state = ReconciliationState::from_groups([kit_group(&[])]);
        let result = ReconciliationEngine::apply(&state, &kit_event(5), EventId::new(), now());

        let group = &result.groups[&iid("ped1-kitA-1")];
        assert_eq!(group.attended, 1);
        assert_eq!(group.attended, group.ledger.iter().map(|e| e.quantity).sum::<u32>());
        assert!(result
            .warnings
            .iter()
            .any(|w| matches!(w, ReconcileWarning::Overflow { surplus, .. } if *surplus > 0)));
    }

    #[test]
    fn unknown_level_warns_and_keeps_the_event_processed() {
        let state = ReconciliationState::from_groups([kit_group(&[])]);
        let mut event = kit_event(1);
        event.consumed.push(ConsumedProduct {
            product_id: pid("pecaA"),
            kind: ProductKind::Piece,
            quantity: 1,
            level: 4,
            parent_model_id: None,
            parent_kit_id: None,
            assembly_instance_id: Some(iid("ped1-kitA-1")),
        });

        let result = ReconciliationEngine::apply(&state, &event, EventId::new(), now());
        assert!(result
            .warnings
            .iter()
            .any(|w| matches!(w, ReconcileWarning::UnresolvedLevel { level: 4, .. })));
        // The level-3 entry still applied.
        assert_eq!(result.groups[&iid("ped1-kitA-1")].attended, 1);
    }

    #[test]
    fn nested_piece_level_touches_only_the_named_piece() {
        let state = ReconciliationState::from_groups([kit_group(&["pecaA"])]);
        let event = ConsumptionEvent {
            order_id: oid("ped1"),
            level_used: LEVEL_PIECE,
            root: crate::consumption::RootProduct {
                id: pid("kitA"),
                kind: ProductKind::Kit,
                quantity: 1,
            },
            consumed: vec![ConsumedProduct {
                product_id: pid("pecaA"),
                kind: ProductKind::Piece,
                quantity: 1,
                level: LEVEL_PIECE,
                parent_model_id: Some(pid("modB")),
                parent_kit_id: Some(pid("kitA")),
                assembly_instance_id: Some(iid("ped1-kitA-1-modB-1-pecaA-1")),
            }],
        };

        let result = ReconciliationEngine::apply(&state, &event, EventId::new(), now());
        let group = &result.groups[&iid("ped1-kitA-1")];
        assert_eq!(piece_attended(group, Some("modB"), "pecaA"), 1);
        assert_eq!(piece_attended(group, Some("modB"), "pecaB"), 0);
        assert_eq!(piece_attended(group, None, "pecaA"), 0);
        assert_eq!(group.attended, 0);
    }

    #[test]
    fn part_level_appends_to_the_matching_part_entry() {
        let mut g = kit_group(&[]);
        g.parts.push(Requirement::new(pid("parteX"), 4));
        let state = ReconciliationState::from_groups([g]);

        let event = ConsumptionEvent {
            order_id: oid("ped1"),
            level_used: LEVEL_PART,
            root: crate::consumption::RootProduct {
                id: pid("kitA"),
                kind: ProductKind::Kit,
                quantity: 1,
            },
            consumed: vec![ConsumedProduct {
                product_id: pid("parteX"),
                kind: ProductKind::Part,
                quantity: 3,
                level: LEVEL_PART,
                parent_model_id: None,
                parent_kit_id: Some(pid("kitA")),
                assembly_instance_id: Some(iid("ped1-kitA-1")),
            }],
        };

        let result = ReconciliationEngine::apply(&state, &event, EventId::new(), now());
        let group = &result.groups[&iid("ped1-kitA-1")];
        let part = group.parts.iter().find(|p| p.product_id == pid("parteX")).unwrap();
        assert_eq!(part.attended, 3);
        assert_eq!(part.ledger[0].origin, "estoque_parte");
    }

    #[test]
    fn malformed_key_falls_back_to_root_reconstruction() {
        let state = ReconciliationState::from_groups([kit_group(&[])]);
        let mut event = kit_event(1);
        event.consumed[0].assembly_instance_id = Some(iid("ped1-kitA")); // no pair

        let result = ReconciliationEngine::apply(&state, &event, EventId::new(), now());
        assert!(result
            .warnings
            .iter()
            .any(|w| matches!(w, ReconcileWarning::MalformedKey { .. })));
        // Reconstructed from (nivel, produtoRaiz) and still applied.
        assert_eq!(result.groups[&iid("ped1-kitA-1")].attended, 1);
    }

    #[test]
    fn missing_target_warns_and_skips() {
        let state = ReconciliationState::from_groups([kit_group(&[])]);
        let mut event = kit_event(1);
        event.order_id = oid("outroPedido");
        event.consumed[0].assembly_instance_id = None;

        let result = ReconciliationEngine::apply(&state, &event, EventId::new(), now());
        assert!(result.groups.is_empty());
        assert!(result
            .warnings
            .iter()
            .any(|w| matches!(w, ReconcileWarning::TargetNotFound { .. })));
    }

    #[test]
    fn root_consumption_completes_as_fulfilled_from_stock() {
        let state = ReconciliationState::from_groups([kit_group(&["pecaD"])]);
        let result = ReconciliationEngine::apply(&state, &kit_event(1), EventId::new(), now());

        let group = &result.groups[&iid("ped1-kitA-1")];
        assert!(group.is_complete());
        assert_eq!(group.status, AssemblyGroupStatus::FulfilledFromStock);
        assert_eq!(result.newly_completed, vec![iid("ped1-kitA-1")]);
    }

    #[test]
    fn child_coverage_completes_as_completed_from_stock() {
        // Only sub-requirements get covered; the group's own ledger stays empty.
        let mut g = kit_group(&[]);
        g.models[0].required = 1;
        let state = ReconciliationState::from_groups([g]);

        let event = ConsumptionEvent {
            order_id: oid("ped1"),
            level_used: LEVEL_MODEL,
            root: crate::consumption::RootProduct {
                id: pid("kitA"),
                kind: ProductKind::Kit,
                quantity: 1,
            },
            consumed: vec![ConsumedProduct {
                product_id: pid("modB"),
                kind: ProductKind::Model,
                quantity: 1,
                level: LEVEL_MODEL,
                parent_model_id: None,
                parent_kit_id: Some(pid("kitA")),
                assembly_instance_id: Some(iid("ped1-kitA-1-modB-1")),
            }],
        };

        let result = ReconciliationEngine::apply(&state, &event, EventId::new(), now());
        let group = &result.groups[&iid("ped1-kitA-1")];
        assert_eq!(piece_attended(group, Some("modB"), "pecaA"), 1);
        assert_eq!(piece_attended(group, Some("modB"), "pecaB"), 1);
        assert!(group.is_complete());
        assert_eq!(group.status, AssemblyGroupStatus::CompletedFromStock);
    }

    #[test]
    fn terminal_status_never_regresses() {
        let state = ReconciliationState::from_groups([kit_group(&[])]);
        let first = ReconciliationEngine::apply(&state, &kit_event(1), EventId::new(), now());
        let group = &first.groups[&iid("ped1-kitA-1")];
        assert!(group.status.is_terminal());

        // A later, different event is accepted but cannot un-terminate.
        let state = state.updated(first.groups.clone());
        let second = ReconciliationEngine::apply(&state, &kit_event(1), EventId::new(), now());
        if let Some(group) = second.groups.get(&iid("ped1-kitA-1")) {
            assert!(group.status.is_terminal());
        }
        assert!(second.newly_completed.is_empty());
    }

    #[test]
    fn model_root_group_is_addressed_directly() {
        let mut g = AssemblyGroup::new(
            iid("ped2-modB-1"),
            oid("ped2"),
            pid("modB"),
            ProductKind::Model,
            1,
        );
        g.pieces.push(Requirement::new(pid("pecaA"), 2));
        let state = ReconciliationState::from_groups([g]);

        let event = ConsumptionEvent {
            order_id: oid("ped2"),
            level_used: LEVEL_MODEL,
            root: crate::consumption::RootProduct {
                id: pid("modB"),
                kind: ProductKind::Model,
                quantity: 1,
            },
            consumed: vec![ConsumedProduct {
                product_id: pid("modB"),
                kind: ProductKind::Model,
                quantity: 1,
                level: LEVEL_MODEL,
                parent_model_id: None,
                parent_kit_id: None,
                assembly_instance_id: Some(iid("ped2-modB-1")),
            }],
        };

        let result = ReconciliationEngine::apply(&state, &event, EventId::new(), now());
        let group = &result.groups[&iid("ped2-modB-1")];
        assert_eq!(group.attended, 1);
        assert_eq!(piece_attended(group, None, "pecaA"), 2);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: applying the same event twice yields the state of
            /// applying it once.
            #[test]
            fn replay_is_idempotent(quantity in 1u32..10, direct_required in 1u32..5) {
                let mut g = kit_group(&["pecaD"]);
                g.pieces[0].required = direct_required;
                let state = ReconciliationState::from_groups([g]);

                let event = kit_event(quantity);
                let event_id = EventId::new();
                let stamp = now();

                let once = ReconciliationEngine::apply(&state, &event, event_id, stamp);
                let after_once = state.updated(once.groups.clone());

                let again = ReconciliationEngine::apply(&after_once, &event, event_id, stamp);
                prop_assert!(again.groups.is_empty());
            }

            /// Property: the attended quantity always equals the ledger sum
            /// and never exceeds the need.
            #[test]
            fn attended_is_the_clamped_ledger_sum(quantity in 1u32..20) {
                let state = ReconciliationState::from_groups([kit_group(&["pecaD"])]);
                let result = ReconciliationEngine::apply(
                    &state,
                    &kit_event(quantity),
                    EventId::new(),
                    now(),
                );

                for group in result.groups.values() {
                    let sum: u32 = group.ledger.iter().map(|e| e.quantity).sum();
                    prop_assert_eq!(group.attended, sum);
                    prop_assert!(group.attended <= group.required);
                    for piece in &group.pieces {
                        let sum: u32 = piece.ledger.iter().map(|e| e.quantity).sum();
                        prop_assert_eq!(piece.attended, sum);
                        prop_assert!(piece.attended <= piece.required);
                    }
                }
            }
        }
    }
}
