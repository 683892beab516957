//! Injected cost lookups.
//!
//! Stages receive these as explicit parameters so tests can substitute fixed
//! tables instead of patching module state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use printops_core::{FilamentGroupId, InsumoId};

/// A priced non-filament input, as stored (`insumos` collection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insumo {
    pub id: InsumoId,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "custoUnitario", default)]
    pub unit_cost: f64,
}

/// Weighted-average filament cost per gram, by filament group.
pub trait FilamentCostSource {
    /// `None` when the group has no aggregate (e.g. no spools left); the
    /// stage then contributes zero for that filament.
    fn cost_per_gram(&self, id: &FilamentGroupId) -> Option<f64>;
}

/// Unit cost of non-filament inputs.
pub trait InsumoCostSource {
    fn unit_cost(&self, id: &InsumoId) -> Option<f64>;
}

impl FilamentCostSource for HashMap<FilamentGroupId, f64> {
    fn cost_per_gram(&self, id: &FilamentGroupId) -> Option<f64> {
        self.get(id).copied()
    }
}

impl InsumoCostSource for HashMap<InsumoId, f64> {
    fn unit_cost(&self, id: &InsumoId) -> Option<f64> {
        self.get(id).copied()
    }
}

impl<S: FilamentCostSource + ?Sized> FilamentCostSource for &S {
    fn cost_per_gram(&self, id: &FilamentGroupId) -> Option<f64> {
        (**self).cost_per_gram(id)
    }
}

impl<S: InsumoCostSource + ?Sized> InsumoCostSource for &S {
    fn unit_cost(&self, id: &InsumoId) -> Option<f64> {
        (**self).unit_cost(id)
    }
}
