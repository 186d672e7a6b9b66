// tests/dependency_graph_props.rs

use proptest::prelude::*;
use pguard::dag::DependencyGraph;
use pguard::engine::ServiceSpec;
use pguard::errors::PguardError;
use pguard_test_utils::ServiceSpecBuilder;

/// Forest of services where service `i` may depend on any `j < i`, listed in
/// a shuffled declaration order.
fn forest_strategy(max: usize) -> impl Strategy<Value = Vec<ServiceSpec>> {
    (1..=max)
        .prop_flat_map(|n| {
            (
                proptest::collection::vec(proptest::option::of(any::<usize>()), n),
                Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
            )
        })
        .prop_map(|(deps, order)| {
            order
                .into_iter()
                .map(|i| {
                    let mut b = ServiceSpecBuilder::new(&format!("svc_{i}"), "true");
                    if let Some(Some(raw)) = deps.get(i).copied() {
                        if i > 0 {
                            b = b.depends_on(&format!("svc_{}", raw % i));
                        }
                    }
                    b.build()
                })
                .collect()
        })
}

proptest! {
    #[test]
    fn start_order_respects_every_dependency(specs in forest_strategy(12)) {
        let graph = DependencyGraph::from_specs(&specs).unwrap();
        let order = graph.start_order().unwrap();
        prop_assert_eq!(order.len(), specs.len());

        let pos = |name: &str| order.iter().position(|s| s == name).unwrap();
        for spec in specs.iter() {
            if let Some(dep) = &spec.depends_on {
                prop_assert!(pos(dep) < pos(&spec.name));
                prop_assert!(graph.dependents_of(dep).contains(&spec.name));
            }
        }
        prop_assert!(graph.unknown_dependencies().is_empty());
    }

    #[test]
    fn rings_are_always_rejected(n in 2usize..10) {
        let specs: Vec<ServiceSpec> = (0..n)
            .map(|i| {
                ServiceSpecBuilder::new(&format!("svc_{i}"), "true")
                    .depends_on(&format!("svc_{}", (i + 1) % n))
                    .build()
            })
            .collect();

        let is_cycle = matches!(
            DependencyGraph::from_specs(&specs),
            Err(PguardError::DependencyCycle(_))
        );
        prop_assert!(is_cycle);
    }
}
