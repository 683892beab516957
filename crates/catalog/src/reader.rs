//! Read seam over the catalog collection.

use std::collections::HashMap;
use std::sync::RwLock;

use printops_core::{FilamentGroupId, ProductId};

use crate::node::{Kit, Model, Piece, Part, ProductNode};

/// Read access to catalog nodes, by id and by enumeration.
///
/// The resolver walks downward by id; the cost cascade fans out upward
/// (which pieces use a filament group, which models contain a piece, ...)
/// via the enumeration methods. Implementations hand out owned snapshots so
/// callers never observe a node mid-update.
pub trait CatalogReader: Send + Sync {
    fn node(&self, id: &ProductId) -> Option<ProductNode>;

    fn kits(&self) -> Vec<Kit>;
    fn models(&self) -> Vec<Model>;
    fn pieces(&self) -> Vec<Piece>;

    fn kit(&self, id: &ProductId) -> Option<Kit> {
        match self.node(id) {
            Some(ProductNode::Kit(k)) => Some(k),
            _ => None,
        }
    }

    fn model(&self, id: &ProductId) -> Option<Model> {
        match self.node(id) {
            Some(ProductNode::Model(m)) => Some(m),
            _ => None,
        }
    }

    fn piece(&self, id: &ProductId) -> Option<Piece> {
        match self.node(id) {
            Some(ProductNode::Piece(p)) => Some(p),
            _ => None,
        }
    }

    fn part(&self, id: &ProductId) -> Option<Part> {
        match self.node(id) {
            Some(ProductNode::Part(p)) => Some(p),
            _ => None,
        }
    }

    /// Pieces whose print groups draw from the given filament group.
    fn pieces_using_filament_group(&self, id: &FilamentGroupId) -> Vec<Piece> {
        self.pieces()
            .into_iter()
            .filter(|p| p.uses_filament_group(id))
            .collect()
    }

    /// Models that list the given piece as a component.
    fn models_containing_piece(&self, id: &ProductId) -> Vec<Model> {
        self.models()
            .into_iter()
            .filter(|m| m.pieces.iter().any(|r| &r.piece_id == id))
            .collect()
    }

    /// Kits that list the given piece directly (not through a model).
    fn kits_with_loose_piece(&self, id: &ProductId) -> Vec<Kit> {
        self.kits()
            .into_iter()
            .filter(|k| k.loose_pieces.iter().any(|r| &r.piece_id == id))
            .collect()
    }

    /// Kits that own the given model.
    fn kits_containing_model(&self, id: &ProductId) -> Vec<Kit> {
        self.kits()
            .into_iter()
            .filter(|k| k.models.iter().any(|r| &r.model_id == id))
            .collect()
    }
}

/// In-memory catalog for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    nodes: RwLock<HashMap<ProductId, ProductNode>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, node: ProductNode) {
        if let Ok(mut nodes) = self.nodes.write() {
            nodes.insert(node.id().clone(), node);
        }
    }
}

impl CatalogReader for InMemoryCatalog {
    fn node(&self, id: &ProductId) -> Option<ProductNode> {
        self.nodes.read().ok()?.get(id).cloned()
    }

    fn kits(&self) -> Vec<Kit> {
        let nodes = match self.nodes.read() {
            Ok(n) => n,
            Err(_) => return vec![],
        };
        nodes
            .values()
            .filter_map(|n| match n {
                ProductNode::Kit(k) => Some(k.clone()),
                _ => None,
            })
            .collect()
    }

    fn models(&self) -> Vec<Model> {
        let nodes = match self.nodes.read() {
            Ok(n) => n,
            Err(_) => return vec![],
        };
        nodes
            .values()
            .filter_map(|n| match n {
                ProductNode::Model(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    fn pieces(&self) -> Vec<Piece> {
        let nodes = match self.nodes.read() {
            Ok(n) => n,
            Err(_) => return vec![],
        };
        nodes
            .values()
            .filter_map(|n| match n {
                ProductNode::Piece(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }
}

impl<R: CatalogReader + ?Sized> CatalogReader for std::sync::Arc<R> {
    fn node(&self, id: &ProductId) -> Option<ProductNode> {
        (**self).node(id)
    }

    fn kits(&self) -> Vec<Kit> {
        (**self).kits()
    }

    fn models(&self) -> Vec<Model> {
        (**self).models()
    }

    fn pieces(&self) -> Vec<Piece> {
        (**self).pieces()
    }
}

impl<R: CatalogReader + ?Sized> CatalogReader for &R {
    fn node(&self, id: &ProductId) -> Option<ProductNode> {
        (**self).node(id)
    }

    fn kits(&self) -> Vec<Kit> {
        (**self).kits()
    }

    fn models(&self) -> Vec<Model> {
        (**self).models()
    }

    fn pieces(&self) -> Vec<Piece> {
        (**self).pieces()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{FilamentRef, PieceRef, PrintGroup};

    fn piece_with_filament(id: &str, group: &str) -> ProductNode {
        ProductNode::Piece(Piece {
            id: ProductId::new(id).unwrap(),
            name: id.to_string(),
            print_groups: vec![PrintGroup {
                name: None,
                parts: vec![],
                filaments: vec![FilamentRef {
                    filament_group_id: FilamentGroupId::new(group).unwrap(),
                    grams: 12.0,
                }],
                print_minutes: 30.0,
            }],
            other_insumos: vec![],
            assembly_minutes: 0.0,
            print_minutes: 0.0,
            computed_cost: None,
        })
    }

    #[test]
    fn fan_out_queries_find_upstream_consumers() {
        let catalog = InMemoryCatalog::new();
        catalog.insert(piece_with_filament("pecaA", "pla-verde"));
        catalog.insert(piece_with_filament("pecaB", "pla-azul"));
        catalog.insert(ProductNode::Model(Model {
            id: ProductId::new("modX").unwrap(),
            name: "X".to_string(),
            pieces: vec![PieceRef {
                piece_id: ProductId::new("pecaA").unwrap(),
                quantity: 3,
            }],
            assembly_minutes: 10.0,
            computed_cost: None,
        }));

        let group = FilamentGroupId::new("pla-verde").unwrap();
        let pieces = catalog.pieces_using_filament_group(&group);
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].id.as_str(), "pecaA");

        let models = catalog.models_containing_piece(&ProductId::new("pecaA").unwrap());
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].id.as_str(), "modX");
    }
}
