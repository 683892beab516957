//! Hierarchy resolution: flatten a root product into addressed positions.
//!
//! Root instances are enumerated (the same kit needed twice yields two
//! positions differing only in the root instance number); inside one root
//! instance, nested quantities multiply. Positions are never merged: a piece
//! reached through a model belongs to that model's path, and the same piece id
//! listed directly under the kit stays an independent position (whether that
//! is legitimate catalog data is a catalog-level question, not ours to guess).

use std::collections::HashMap;

use printops_catalog::{CatalogReader, Kit, Model, Piece};
use printops_core::{DomainError, DomainResult, OrderId, ProductId, ProductKind};

use crate::consumption::{ConsumedProduct, RootProduct};
use crate::path::{AssemblyInstanceId, AssemblyPath};

/// Level code of a printable part.
pub const LEVEL_PART: u32 = 1;
/// Level code of the root component of the expansion.
pub const LEVEL_ROOT: u32 = 3;
/// Level code of a model-level component (a kit's model or loose piece).
pub const LEVEL_MODEL: u32 = 5;
/// Level code of a piece nested inside a model.
pub const LEVEL_PIECE: u32 = 7;

/// One flattened position of the expanded order tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedNode {
    pub product_id: ProductId,
    pub kind: ProductKind,
    /// Multiplied quantity for this position (parent quantities applied).
    pub quantity: u32,
    pub level: u32,
    /// Address of the position. Parts share their owning piece's address.
    pub instance: AssemblyInstanceId,
    pub parent_kit_id: Option<ProductId>,
    pub parent_model_id: Option<ProductId>,
}

impl ResolvedNode {
    /// Shape this position as a consumption entry (used when the caller sent
    /// an unflattened event).
    pub fn to_consumed(&self) -> ConsumedProduct {
        ConsumedProduct {
            product_id: self.product_id.clone(),
            kind: self.kind,
            quantity: self.quantity,
            level: self.level,
            parent_model_id: self.parent_model_id.clone(),
            parent_kit_id: self.parent_kit_id.clone(),
            assembly_instance_id: Some(self.instance.clone()),
        }
    }
}

/// Numbers duplicate child ids within one parent list (1-based).
#[derive(Default)]
struct OccurrenceCounter {
    seen: HashMap<String, u32>,
}

impl OccurrenceCounter {
    fn next(&mut self, id: &ProductId) -> u32 {
        let n = self.seen.entry(id.as_str().to_string()).or_insert(0);
        *n += 1;
        *n
    }
}

/// Flattens a root product + quantity into every reachable position.
pub struct HierarchyResolver<C> {
    catalog: C,
}

impl<C: CatalogReader> HierarchyResolver<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// Resolve the full position set for one order's root product.
    ///
    /// The root must exist in the catalog; missing descendant references are
    /// skipped (the engine reports unmatched consumption entries later).
    pub fn resolve(&self, order_id: &OrderId, root: &RootProduct) -> DomainResult<Vec<ResolvedNode>> {
        let mut nodes = Vec::new();

        for instance in 1..=root.quantity {
            let root_path = AssemblyPath::root(order_id.clone(), root.id.clone(), instance)?;

            nodes.push(ResolvedNode {
                product_id: root.id.clone(),
                kind: root.kind,
                quantity: 1,
                level: LEVEL_ROOT,
                instance: root_path.encode(),
                parent_kit_id: None,
                parent_model_id: None,
            });

            match root.kind {
                ProductKind::Kit => {
                    let kit = self.catalog.kit(&root.id).ok_or_else(|| {
                        DomainError::target_not_found(format!("kit {}", root.id))
                    })?;
                    self.walk_kit(&kit, &root_path, &mut nodes)?;
                }
                ProductKind::Model => {
                    let model = self.catalog.model(&root.id).ok_or_else(|| {
                        DomainError::target_not_found(format!("modelo {}", root.id))
                    })?;
                    self.walk_model_children(&model, 1, &root_path, None, &mut nodes)?;
                }
                ProductKind::Piece => {
                    let piece = self.catalog.piece(&root.id).ok_or_else(|| {
                        DomainError::target_not_found(format!("peca {}", root.id))
                    })?;
                    emit_parts(&piece, 1, &root_path.encode(), None, None, &mut nodes);
                }
                ProductKind::Part => {
                    // A bare part has nothing below it.
                }
            }
        }

        Ok(nodes)
    }

    fn walk_kit(
        &self,
        kit: &Kit,
        root_path: &AssemblyPath,
        nodes: &mut Vec<ResolvedNode>,
    ) -> DomainResult<()> {
        let mut occurrences = OccurrenceCounter::default();

        for model_ref in &kit.models {
            let Some(model) = self.catalog.model(&model_ref.model_id) else {
                continue;
            };
            let occ = occurrences.next(&model_ref.model_id);
            let model_path = root_path.child(model_ref.model_id.clone(), occ)?;

            nodes.push(ResolvedNode {
                product_id: model.id.clone(),
                kind: ProductKind::Model,
                quantity: model_ref.quantity,
                level: LEVEL_MODEL,
                instance: model_path.encode(),
                parent_kit_id: Some(kit.id.clone()),
                parent_model_id: None,
            });

            self.walk_model_children(
                &model,
                model_ref.quantity,
                &model_path,
                Some(&kit.id),
                nodes,
            )?;
        }

        for piece_ref in &kit.loose_pieces {
            let Some(piece) = self.catalog.piece(&piece_ref.piece_id) else {
                continue;
            };
            let occ = occurrences.next(&piece_ref.piece_id);
            let piece_path = root_path.child(piece_ref.piece_id.clone(), occ)?;
            let instance = piece_path.encode();

            nodes.push(ResolvedNode {
                product_id: piece.id.clone(),
                kind: ProductKind::Piece,
                quantity: piece_ref.quantity,
                level: LEVEL_MODEL,
                instance: instance.clone(),
                parent_kit_id: Some(kit.id.clone()),
                parent_model_id: None,
            });

            emit_parts(&piece, piece_ref.quantity, &instance, Some(&kit.id), None, nodes);
        }

        Ok(())
    }

    fn walk_model_children(
        &self,
        model: &Model,
        multiplier: u32,
        model_path: &AssemblyPath,
        parent_kit: Option<&ProductId>,
        nodes: &mut Vec<ResolvedNode>,
    ) -> DomainResult<()> {
        let mut occurrences = OccurrenceCounter::default();

        for piece_ref in &model.pieces {
            let Some(piece) = self.catalog.piece(&piece_ref.piece_id) else {
                continue;
            };
            let occ = occurrences.next(&piece_ref.piece_id);
            let piece_path = model_path.child(piece_ref.piece_id.clone(), occ)?;
            let instance = piece_path.encode();
            let quantity = multiplier * piece_ref.quantity;

            nodes.push(ResolvedNode {
                product_id: piece.id.clone(),
                kind: ProductKind::Piece,
                quantity,
                level: LEVEL_PIECE,
                instance: instance.clone(),
                parent_kit_id: parent_kit.cloned(),
                parent_model_id: Some(model.id.clone()),
            });

            emit_parts(&piece, quantity, &instance, parent_kit, Some(&model.id), nodes);
        }

        Ok(())
    }
}

fn emit_parts(
    piece: &Piece,
    multiplier: u32,
    piece_instance: &AssemblyInstanceId,
    parent_kit: Option<&ProductId>,
    parent_model: Option<&ProductId>,
    nodes: &mut Vec<ResolvedNode>,
) {
    for group in &piece.print_groups {
        for part_ref in &group.parts {
            nodes.push(ResolvedNode {
                product_id: part_ref.part_id.clone(),
                kind: ProductKind::Part,
                quantity: multiplier * part_ref.quantity,
                level: LEVEL_PART,
                instance: piece_instance.clone(),
                parent_kit_id: parent_kit.cloned(),
                parent_model_id: parent_model.cloned(),
            });
        }
    }
}
