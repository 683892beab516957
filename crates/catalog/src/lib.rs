//! Catalog domain module: the composable product tree.
//!
//! Catalog nodes are shared documents referenced by id from kits, models,
//! production batches, and orders — never copied destructively. This crate
//! holds the wire contracts and the read seam; storage is infra's concern.

pub mod node;
pub mod reader;

pub use node::{
    FilamentRef, InsumoRef, Kit, Model, ModelRef, Part, PartRef, Piece, PieceRef, PrintGroup,
    ProductNode,
};
pub use reader::{CatalogReader, InMemoryCatalog};
