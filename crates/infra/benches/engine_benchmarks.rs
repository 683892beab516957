//! Criterion benchmarks for the hot reconciliation path: hierarchy
//! resolution of a fanned-out kit and engine application of a kit-level
//! consumption event.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use chrono::Utc;
use printops_assembly::{
    AssemblyGroup, AssemblyInstanceId, ConsumptionEvent, ConsumedProduct, HierarchyResolver,
    ModelRequirement, ReconciliationEngine, ReconciliationState, Requirement, RootProduct,
    LEVEL_ROOT,
};
use printops_catalog::{
    FilamentRef, InMemoryCatalog, Kit, Model, ModelRef, PartRef, Piece, PieceRef, PrintGroup,
    ProductNode,
};
use printops_core::{EventId, FilamentGroupId, OrderId, ProductId, ProductKind};

fn pid(s: &str) -> ProductId {
    ProductId::new(s).unwrap()
}

/// Kit with `models` models of `pieces` pieces each, every piece printing
/// two parts.
fn build_catalog(models: usize, pieces: usize) -> InMemoryCatalog {
    let catalog = InMemoryCatalog::new();

    for m in 0..models {
        for p in 0..pieces {
            let piece_id = format!("peca{m}x{p}");
            catalog.insert(ProductNode::Piece(Piece {
                id: pid(&piece_id),
                name: piece_id.clone(),
                print_groups: vec![PrintGroup {
                    name: None,
                    parts: vec![PartRef {
                        part_id: pid(&format!("parte{m}x{p}")),
                        quantity: 2,
                        has_assembly: false,
                    }],
                    filaments: vec![FilamentRef {
                        filament_group_id: FilamentGroupId::new("pla").unwrap(),
                        grams: 12.0,
                    }],
                    print_minutes: 45.0,
                }],
                other_insumos: vec![],
                assembly_minutes: 4.0,
                print_minutes: 0.0,
                computed_cost: None,
            }));
        }

        let model_id = format!("mod{m}");
        catalog.insert(ProductNode::Model(Model {
            id: pid(&model_id),
            name: model_id.clone(),
            pieces: (0..pieces)
                .map(|p| PieceRef {
                    piece_id: pid(&format!("peca{m}x{p}")),
                    quantity: 2,
                })
                .collect(),
            assembly_minutes: 20.0,
            computed_cost: None,
        }));
    }

    catalog.insert(ProductNode::Kit(Kit {
        id: pid("kitBench"),
        name: "Bench".to_string(),
        models: (0..models)
            .map(|m| ModelRef {
                model_id: pid(&format!("mod{m}")),
                quantity: 1,
            })
            .collect(),
        loose_pieces: vec![],
        assembly_minutes: 30.0,
        computed_cost: None,
    }));

    catalog
}

fn build_group(models: usize, pieces: usize) -> AssemblyGroup {
    let mut group = AssemblyGroup::new(
        AssemblyInstanceId::from_raw("ped1-kitBench-1"),
        OrderId::new("ped1").unwrap(),
        pid("kitBench"),
        ProductKind::Kit,
        1,
    );
    for m in 0..models {
        group.models.push(ModelRequirement::new(
            pid(&format!("mod{m}")),
            1,
            (0..pieces)
                .map(|p| Requirement::new(pid(&format!("peca{m}x{p}")), 2))
                .collect(),
        ));
    }
    group
}

fn bench_resolve(c: &mut Criterion) {
    let catalog = build_catalog(8, 8);
    let resolver = HierarchyResolver::new(&catalog);
    let order = OrderId::new("ped1").unwrap();
    let root = RootProduct {
        id: pid("kitBench"),
        kind: ProductKind::Kit,
        quantity: 2,
    };

    c.bench_function("resolve_kit_8x8_qty2", |b| {
        b.iter(|| {
            let nodes = resolver.resolve(black_box(&order), black_box(&root)).unwrap();
            black_box(nodes)
        })
    });
}

fn bench_apply(c: &mut Criterion) {
    let state = ReconciliationState::from_groups([build_group(8, 8)]);
    let event = ConsumptionEvent {
        order_id: OrderId::new("ped1").unwrap(),
        level_used: LEVEL_ROOT,
        root: RootProduct {
            id: pid("kitBench"),
            kind: ProductKind::Kit,
            quantity: 1,
        },
        consumed: vec![ConsumedProduct {
            product_id: pid("kitBench"),
            kind: ProductKind::Kit,
            quantity: 1,
            level: LEVEL_ROOT,
            parent_model_id: None,
            parent_kit_id: None,
            assembly_instance_id: Some(AssemblyInstanceId::from_raw("ped1-kitBench-1")),
        }],
    };
    let now = Utc::now();

    c.bench_function("apply_kit_consumption_8x8", |b| {
        b.iter(|| {
            let result = ReconciliationEngine::apply(
                black_box(&state),
                black_box(&event),
                EventId::new(),
                now,
            );
            black_box(result)
        })
    });
}

criterion_group!(benches, bench_resolve, bench_apply);
criterion_main!(benches);
