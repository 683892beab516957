//! Administrative entry points.
//!
//! Both routes only enqueue the same internal cascade messages the workers
//! already consume; nothing is recomputed inline on the request path.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::{Extension, Json, extract::Path};

use printops_catalog::{CatalogReader, ProductNode};
use printops_core::ProductId;
use printops_costing::{CascadeSignal, CascadeStage};
use printops_infra::catalog_store::StoreCatalog;

use crate::app::dto::{RecomputeResponse, RestartResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

/// Enqueue a cost recompute for one product.
pub async fn recompute_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<RecomputeResponse>), ApiError> {
    let product_id = ProductId::new(id.clone())
        .map_err(|e| ApiError::Unprocessable(e.to_string()))?;

    let catalog = StoreCatalog::new(services.store());
    let Some(node) = catalog.node(&product_id) else {
        return Err(ApiError::NotFound(format!("produto {id} not found")));
    };

    let stage = match node {
        ProductNode::Kit(_) => CascadeStage::KitCost,
        ProductNode::Model(_) => CascadeStage::ModelCost,
        ProductNode::Piece(_) => CascadeStage::PieceCost,
        ProductNode::Part(_) => {
            return Err(ApiError::Unprocessable(
                "parts carry no computed cost".to_string(),
            ));
        }
    };

    services
        .enqueue_cascade(CascadeSignal::new(stage, id.as_str()))
        .map_err(ApiError::Internal)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(RecomputeResponse {
            stage: stage.wire_name(),
            target_id: id,
        }),
    ))
}

/// Restart the whole cascade from its first stage.
///
/// Enqueues a filament-group aggregation per known group plus a piece-cost
/// signal per piece (so pieces without filament are covered too); models and
/// kits follow as successors.
pub async fn restart_cascade(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<(StatusCode, Json<RestartResponse>), ApiError> {
    let mut enqueued = 0;

    let group_ids = services
        .pipeline()
        .known_filament_group_ids()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    for id in group_ids {
        services
            .enqueue_cascade(CascadeSignal::new(
                CascadeStage::FilamentGroupAggregation,
                id.as_str(),
            ))
            .map_err(ApiError::Internal)?;
        enqueued += 1;
    }

    let catalog = StoreCatalog::new(services.store());
    for piece in catalog.pieces() {
        services
            .enqueue_cascade(CascadeSignal::new(CascadeStage::PieceCost, piece.id.as_str()))
            .map_err(ApiError::Internal)?;
        enqueued += 1;
    }

    Ok((StatusCode::ACCEPTED, Json(RestartResponse { enqueued })))
}
