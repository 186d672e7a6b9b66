// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::engine::spec::ServiceSpec;
use crate::errors::{PguardError, Result};

/// Internal node structure: the (at most one) dependency and the dependents.
#[derive(Debug, Clone, Default)]
struct DepNode {
    depends_on: Option<String>,
    dependents: Vec<String>,
}

/// Service dependency graph keyed by service name.
///
/// Construction rejects duplicate names, self-references and cycles. A
/// `depends_on` that names no known service is kept as-is and reported by
/// [`DependencyGraph::unknown_dependencies`]; at runtime such a wait returns
/// immediately.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: HashMap<String, DepNode>,
    /// Declaration order.
    order: Vec<String>,
}

impl DependencyGraph {
    pub fn from_specs(specs: &[ServiceSpec]) -> Result<Self> {
        let mut nodes: HashMap<String, DepNode> = HashMap::new();
        let mut order = Vec::with_capacity(specs.len());

        for spec in specs {
            if nodes.contains_key(&spec.name) {
                return Err(PguardError::Config(format!(
                    "service name '{}' is defined more than once",
                    spec.name
                )));
            }
            if spec.depends_on.as_deref() == Some(spec.name.as_str()) {
                return Err(PguardError::Config(format!(
                    "service '{}' cannot depend on itself in `depends_on`",
                    spec.name
                )));
            }
            nodes.insert(
                spec.name.clone(),
                DepNode {
                    depends_on: spec.depends_on.clone(),
                    dependents: Vec::new(),
                },
            );
            order.push(spec.name.clone());
        }

        for name in order.iter() {
            let dep = nodes.get(name).and_then(|n| n.depends_on.clone());
            if let Some(dep_node) = dep.and_then(|d| nodes.get_mut(&d)) {
                dep_node.dependents.push(name.clone());
            }
        }

        let graph = Self { nodes, order };
        graph.start_order()?;
        Ok(graph)
    }

    /// The service `name` waits for, if it names one.
    pub fn dependency_of(&self, name: &str) -> Option<&str> {
        self.nodes.get(name).and_then(|n| n.depends_on.as_deref())
    }

    /// Services that wait for `name`.
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// `(service, missing_dependency)` pairs whose dependency is not configured.
    pub fn unknown_dependencies(&self) -> Vec<(&str, &str)> {
        self.order
            .iter()
            .filter_map(|name| {
                let dep = self.dependency_of(name)?;
                (!self.nodes.contains_key(dep)).then_some((name.as_str(), dep))
            })
            .collect()
    }

    /// A topological order: every service appears after its dependency.
    pub fn start_order(&self) -> Result<Vec<String>> {
        // Edge direction: dependency -> dependent.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in self.order.iter() {
            graph.add_node(name.as_str());
        }
        for name in self.order.iter() {
            if let Some(dep) = self.dependency_of(name) {
                if self.nodes.contains_key(dep) {
                    graph.add_edge(dep, name.as_str(), ());
                }
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
            Err(cycle) => Err(PguardError::DependencyCycle(format!(
                "cycle detected in depends_on chain involving service '{}'",
                cycle.node_id()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, dep: Option<&str>) -> ServiceSpec {
        let mut s = ServiceSpec::new(name, "true");
        s.depends_on = dep.map(str::to_string);
        s
    }

    #[test]
    fn start_order_puts_dependencies_first() {
        let graph = DependencyGraph::from_specs(&[
            spec("web", Some("api")),
            spec("api", Some("db")),
            spec("db", None),
        ])
        .unwrap();

        let order = graph.start_order().unwrap();
        let pos = |n: &str| order.iter().position(|s| s == n).unwrap();
        assert!(pos("db") < pos("api"));
        assert!(pos("api") < pos("web"));
    }

    #[test]
    fn dependents_are_tracked() {
        let graph = DependencyGraph::from_specs(&[
            spec("db", None),
            spec("api", Some("db")),
            spec("worker", Some("db")),
            spec("web", Some("api")),
        ])
        .unwrap();

        assert_eq!(graph.dependents_of("db"), ["api".to_string(), "worker".to_string()]);
        assert_eq!(graph.dependents_of("web"), [] as [String; 0]);
        assert_eq!(graph.dependency_of("web"), Some("api"));
        assert_eq!(graph.dependency_of("db"), None);
    }

    #[test]
    fn cycle_is_rejected() {
        let err = DependencyGraph::from_specs(&[spec("a", Some("b")), spec("b", Some("a"))])
            .unwrap_err();
        assert!(matches!(err, PguardError::DependencyCycle(msg) if msg.contains("cycle detected")));
    }

    #[test]
    fn self_reference_and_duplicates_are_rejected() {
        assert!(DependencyGraph::from_specs(&[spec("a", Some("a"))]).is_err());
        assert!(DependencyGraph::from_specs(&[spec("a", None), spec("a", None)]).is_err());
    }

    #[test]
    fn unknown_dependency_is_reported_not_rejected() {
        let graph = DependencyGraph::from_specs(&[spec("a", Some("ghost")), spec("b", None)])
            .unwrap();
        assert_eq!(graph.unknown_dependencies(), vec![("a", "ghost")]);
        assert_eq!(graph.start_order().unwrap().len(), 2);
    }
}
