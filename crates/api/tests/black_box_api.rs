//! Black-box tests over a bound listener: real HTTP in, worker-driven
//! recomputation observed through the store.

use std::sync::Arc;
use std::time::Duration;

use printops_api::app::{build_app, services::AppServices};
use printops_catalog::{FilamentRef, Piece, PrintGroup, ProductNode};
use printops_core::{FilamentGroupId, ProductId, SpoolId};
use printops_costing::{ServiceRates, Spool};
use printops_infra::document_store::{DocumentStore, InMemoryDocumentStore, RATES_DOC_ID, collections};

async fn start_server(services: Arc<AppServices>) -> String {
    let app = build_app(services);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn seed_piece(store: &InMemoryDocumentStore) {
    store.seed(
        collections::PRODUCTS,
        "pecaC",
        &ProductNode::Piece(Piece {
            id: ProductId::new("pecaC").unwrap(),
            name: "Peca C".to_string(),
            print_groups: vec![PrintGroup {
                name: None,
                parts: vec![],
                filaments: vec![FilamentRef {
                    filament_group_id: FilamentGroupId::new("pla-verde").unwrap(),
                    grams: 40.0,
                }],
                print_minutes: 90.0,
            }],
            other_insumos: vec![],
            assembly_minutes: 12.0,
            print_minutes: 0.0,
            computed_cost: None,
        }),
    );
    store.seed(
        collections::SPOOLS,
        "spool1",
        &Spool {
            id: SpoolId::new("spool1").unwrap(),
            filament_group_id: FilamentGroupId::new("pla-verde").unwrap(),
            cost_per_gram: 0.10,
            current_stock: 500.0,
            production_consumption: 0.0,
            actual_consumption: 0.0,
        },
    );
    store.seed(
        collections::CONFIG,
        RATES_DOC_ID,
        &ServiceRates {
            cost_per_minute_3d_print: 0.10,
            cost_per_minute_assembly: 0.50,
            cost_per_minute_packaging: 0.30,
        },
    );
}

async fn wait_for_cost(store: &InMemoryDocumentStore, id: &str) -> Option<f64> {
    for _ in 0..40 {
        if let Some(doc) = store.get(collections::PRODUCTS, id).unwrap() {
            if let Ok(ProductNode::Piece(piece)) = doc.decode::<ProductNode>() {
                if piece.computed_cost.is_some() {
                    return piece.computed_cost;
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    None
}

#[tokio::test]
async fn health_endpoint_responds() {
    let services = Arc::new(AppServices::in_memory());
    let base = start_server(services).await;

    let response = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn recompute_endpoint_enqueues_and_the_worker_writes_the_cost() {
    let services = Arc::new(AppServices::in_memory());
    let store = services.store();
    seed_piece(&store);

    let base = start_server(services).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/admin/products/pecaC/recompute"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["stage"], "piece_cost");
    assert_eq!(body["targetId"], "pecaC");

    // No filament aggregate yet: cost is printing + assembly only.
    let cost = wait_for_cost(&store, "pecaC").await.expect("cost written");
    assert!((cost - (90.0 * 0.10 + 12.0 * 0.50)).abs() < 1e-9);
}

#[tokio::test]
async fn unknown_product_is_a_404() {
    let services = Arc::new(AppServices::in_memory());
    let base = start_server(services).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/admin/products/nope/recompute"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cascade_restart_covers_groups_and_pieces() {
    let services = Arc::new(AppServices::in_memory());
    let store = services.store();
    seed_piece(&store);

    let base = start_server(services).await;
    let response = reqwest::Client::new()
        .post(format!("{base}/admin/cascade/restart"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);

    let body: serde_json::Value = response.json().await.unwrap();
    // One filament group (from the spool) + one piece.
    assert_eq!(body["enqueued"], 2);

    // The chain ends with the piece cost including the filament average.
    let cost = wait_for_cost(&store, "pecaC").await.expect("cost written");
    assert!((cost - (40.0 * 0.10 + 90.0 * 0.10 + 12.0 * 0.50)).abs() < 1e-9);
}
