//! Catalog reader backed by the document store.

use tracing::warn;

use printops_catalog::{CatalogReader, Kit, Model, Piece, ProductNode};
use printops_core::ProductId;

use crate::document_store::{DocumentStore, collections};

/// `CatalogReader` over the `produtos` collection.
///
/// Read failures degrade to "not found" with a warning: the engines treat
/// missing catalog nodes as non-fatal, and a broken document must not take
/// the whole worker down.
pub struct StoreCatalog<S> {
    store: S,
}

impl<S: DocumentStore> StoreCatalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn all_nodes(&self) -> Vec<ProductNode> {
        let docs = match self.store.list(collections::PRODUCTS) {
            Ok(docs) => docs,
            Err(e) => {
                warn!(error = %e, "catalog list failed");
                return vec![];
            }
        };

        docs.iter()
            .filter_map(|doc| match doc.decode::<ProductNode>() {
                Ok(node) => Some(node),
                Err(e) => {
                    warn!(id = %doc.id, error = %e, "undecodable catalog document skipped");
                    None
                }
            })
            .collect()
    }
}

impl<S: DocumentStore> CatalogReader for StoreCatalog<S> {
    fn node(&self, id: &ProductId) -> Option<ProductNode> {
        match self.store.get(collections::PRODUCTS, id.as_str()) {
            Ok(Some(doc)) => match doc.decode::<ProductNode>() {
                Ok(node) => Some(node),
                Err(e) => {
                    warn!(id = %id, error = %e, "undecodable catalog document");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(id = %id, error = %e, "catalog read failed");
                None
            }
        }
    }

    fn kits(&self) -> Vec<Kit> {
        self.all_nodes()
            .into_iter()
            .filter_map(|n| match n {
                ProductNode::Kit(k) => Some(k),
                _ => None,
            })
            .collect()
    }

    fn models(&self) -> Vec<Model> {
        self.all_nodes()
            .into_iter()
            .filter_map(|n| match n {
                ProductNode::Model(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    fn pieces(&self) -> Vec<Piece> {
        self.all_nodes()
            .into_iter()
            .filter_map(|n| match n {
                ProductNode::Piece(p) => Some(p),
                _ => None,
            })
            .collect()
    }
}
