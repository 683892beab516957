//! Per-minute service rates.

use serde::{Deserialize, Serialize};

/// Rate configuration read by the cost stages.
///
/// Loaded once per pipeline run and passed through explicitly; stages never
/// reach for a process-wide rate singleton.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ServiceRates {
    #[serde(rename = "custoMinutoImpressao3d", default)]
    pub cost_per_minute_3d_print: f64,
    #[serde(rename = "custoMinutoMontagem", default)]
    pub cost_per_minute_assembly: f64,
    #[serde(rename = "custoMinutoEmbalagem", default)]
    pub cost_per_minute_packaging: f64,
}
