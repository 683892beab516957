//! Product node wire contracts.
//!
//! Documents keep the store's legacy field names (`quantidade`, `tempoMontagem`,
//! ...); Rust structs use English names and map via serde renames. Numeric
//! fields default to zero so sparse legacy documents still deserialize.

use serde::{Deserialize, Serialize};

use printops_core::{FilamentGroupId, InsumoId, ProductId, ProductKind};

/// Reference to a model owned by a kit, with per-kit quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRef {
    #[serde(rename = "modeloId")]
    pub model_id: ProductId,
    #[serde(rename = "quantidade")]
    pub quantity: u32,
}

/// Reference to a piece owned by a kit (loose) or by a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceRef {
    #[serde(rename = "pecaId")]
    pub piece_id: ProductId,
    #[serde(rename = "quantidade")]
    pub quantity: u32,
}

/// Reference to a printable part inside a print group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartRef {
    #[serde(rename = "parteId")]
    pub part_id: ProductId,
    #[serde(rename = "quantidade")]
    pub quantity: u32,
    #[serde(rename = "temMontagem", default)]
    pub has_assembly: bool,
}

/// Filament demand of one print group, in grams of one filament group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilamentRef {
    #[serde(rename = "grupoFilamentoId")]
    pub filament_group_id: FilamentGroupId,
    #[serde(rename = "gramas")]
    pub grams: f64,
}

/// Non-filament input demand (glue, magnets, paint...), priced per unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsumoRef {
    #[serde(rename = "insumoId")]
    pub insumo_id: InsumoId,
    #[serde(rename = "quantidade")]
    pub quantity: f64,
}

/// One print run of a piece: the parts that come off the plate together,
/// the filament it consumes, and how long the printer is busy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintGroup {
    #[serde(rename = "nome", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "partes", default)]
    pub parts: Vec<PartRef>,
    #[serde(rename = "filamentos", default)]
    pub filaments: Vec<FilamentRef>,
    #[serde(rename = "tempoImpressao", default)]
    pub print_minutes: f64,
}

/// Kit: the sellable root. Owns models and optionally loose pieces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kit {
    pub id: ProductId,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "modelos", default)]
    pub models: Vec<ModelRef>,
    #[serde(rename = "pecasAvulsas", default)]
    pub loose_pieces: Vec<PieceRef>,
    #[serde(rename = "tempoMontagem", default)]
    pub assembly_minutes: f64,
    #[serde(rename = "custoCalculado", default, skip_serializing_if = "Option::is_none")]
    pub computed_cost: Option<f64>,
}

/// Model: a figure assembled from pieces, with its own assembly minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: ProductId,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "pecas", default)]
    pub pieces: Vec<PieceRef>,
    #[serde(rename = "tempoMontagem", default)]
    pub assembly_minutes: f64,
    #[serde(rename = "custoCalculado", default, skip_serializing_if = "Option::is_none")]
    pub computed_cost: Option<f64>,
}

/// Piece: the printable unit. Owns one or more print groups plus its own
/// assembly and impression minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub id: ProductId,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "gruposImpressao", default)]
    pub print_groups: Vec<PrintGroup>,
    #[serde(rename = "outrosInsumos", default)]
    pub other_insumos: Vec<InsumoRef>,
    #[serde(rename = "tempoMontagem", default)]
    pub assembly_minutes: f64,
    #[serde(rename = "tempoImpressao", default)]
    pub print_minutes: f64,
    #[serde(rename = "custoCalculado", default, skip_serializing_if = "Option::is_none")]
    pub computed_cost: Option<f64>,
}

/// Part: the raw printed leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: ProductId,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "temMontagem", default)]
    pub has_assembly: bool,
}

/// A catalog node, polymorphic over the four product kinds.
///
/// The store tags documents with `tipo` ∈ {kit, modelo, peca, parte}.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tipo")]
pub enum ProductNode {
    #[serde(rename = "kit")]
    Kit(Kit),
    #[serde(rename = "modelo")]
    Model(Model),
    #[serde(rename = "peca")]
    Piece(Piece),
    #[serde(rename = "parte")]
    Part(Part),
}

impl ProductNode {
    pub fn id(&self) -> &ProductId {
        match self {
            ProductNode::Kit(k) => &k.id,
            ProductNode::Model(m) => &m.id,
            ProductNode::Piece(p) => &p.id,
            ProductNode::Part(p) => &p.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ProductNode::Kit(k) => &k.name,
            ProductNode::Model(m) => &m.name,
            ProductNode::Piece(p) => &p.name,
            ProductNode::Part(p) => &p.name,
        }
    }

    pub fn kind(&self) -> ProductKind {
        match self {
            ProductNode::Kit(_) => ProductKind::Kit,
            ProductNode::Model(_) => ProductKind::Model,
            ProductNode::Piece(_) => ProductKind::Piece,
            ProductNode::Part(_) => ProductKind::Part,
        }
    }
}

impl Piece {
    /// Total filament grams demanded per unit, across all print groups.
    pub fn filament_grams(&self) -> f64 {
        self.print_groups
            .iter()
            .flat_map(|g| g.filaments.iter())
            .map(|f| f.grams)
            .sum()
    }

    /// True when any print group draws from the given filament group.
    pub fn uses_filament_group(&self, id: &printops_core::FilamentGroupId) -> bool {
        self.print_groups
            .iter()
            .flat_map(|g| g.filaments.iter())
            .any(|f| &f.filament_group_id == id)
    }
}
