use axum::Router;
use axum::routing::post;

pub mod admin;
pub mod system;

pub fn router() -> Router {
    Router::new()
        .route("/admin/products/:id/recompute", post(admin::recompute_product))
        .route("/admin/cascade/restart", post(admin::restart_cascade))
}
