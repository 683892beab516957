//! Product node kinds (the four levels of the bill-of-materials tree).

use serde::{Deserialize, Serialize};

/// Kind of a catalog product node, root to leaf: kit → model → piece → part.
///
/// Wire values keep the store's legacy Portuguese names (`kit`, `modelo`,
/// `peca`, `parte`); Rust code uses the English variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductKind {
    #[serde(rename = "kit")]
    Kit,
    #[serde(rename = "modelo")]
    Model,
    #[serde(rename = "peca")]
    Piece,
    #[serde(rename = "parte")]
    Part,
}

impl ProductKind {
    /// The store/wire name of this kind.
    pub fn wire_name(self) -> &'static str {
        match self {
            ProductKind::Kit => "kit",
            ProductKind::Model => "modelo",
            ProductKind::Piece => "peca",
            ProductKind::Part => "parte",
        }
    }

    /// Ledger origin tag for a stock fulfillment of this kind
    /// (`"estoque_" + tipo`).
    pub fn stock_origin(self) -> &'static str {
        match self {
            ProductKind::Kit => "estoque_kit",
            ProductKind::Model => "estoque_modelo",
            ProductKind::Piece => "estoque_peca",
            ProductKind::Part => "estoque_parte",
        }
    }

    pub fn parse_wire(value: &str) -> Option<Self> {
        match value {
            "kit" => Some(ProductKind::Kit),
            "modelo" => Some(ProductKind::Model),
            "peca" => Some(ProductKind::Piece),
            "parte" => Some(ProductKind::Part),
            _ => None,
        }
    }
}

impl core::fmt::Display for ProductKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        for kind in [
            ProductKind::Kit,
            ProductKind::Model,
            ProductKind::Piece,
            ProductKind::Part,
        ] {
            assert_eq!(ProductKind::parse_wire(kind.wire_name()), Some(kind));
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.wire_name()));
        }
    }

    #[test]
    fn stock_origin_prefixes_the_wire_name() {
        assert_eq!(ProductKind::Kit.stock_origin(), "estoque_kit");
        assert_eq!(ProductKind::Part.stock_origin(), "estoque_parte");
    }
}
