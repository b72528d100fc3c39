//! Property tests for graph construction, selection and layout convergence.

use std::collections::HashSet;

use proptest::prelude::*;
use rbac_graph::graph::{NodeData, RoleRef, Subject};
use rbac_graph::{
    BindingRecord, Edge, EdgeKind, Graph, GraphBuilder, GraphData, LayoutConfig, LayoutEngine,
    NodeId, Point, SubgraphFilter,
};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn subject() -> impl Strategy<Value = Subject> {
    (
        prop::sample::select(vec!["User", "Group", "ServiceAccount"]),
        prop::sample::select(vec!["alice", "bob", "carol", "dave"]),
    )
        .prop_map(|(kind, name)| Subject::new(kind, "rbac.authorization.k8s.io", name))
}

fn role_ref() -> impl Strategy<Value = RoleRef> {
    (
        prop::sample::select(vec!["Role", "ClusterRole"]),
        prop::sample::select(vec!["view", "edit", "admin"]),
    )
        .prop_map(|(kind, name)| RoleRef::new(kind, "rbac.authorization.k8s.io", name))
}

fn record() -> impl Strategy<Value = BindingRecord> {
    (
        0usize..6,
        prop::sample::select(vec!["RoleBinding", "ClusterRoleBinding"]),
        prop::collection::vec(subject(), 1..4),
        role_ref(),
    )
        .prop_map(|(n, kind, subjects, role)| {
            BindingRecord::new(&format!("binding-{n}"), kind, subjects, Some(role))
        })
}

fn records() -> impl Strategy<Value = Vec<BindingRecord>> {
    prop::collection::vec(record(), 0..12)
}

/// A plain graph with `1..max_nodes` nodes and arbitrary edges between them.
fn plain_graph(max_nodes: usize) -> impl Strategy<Value = Graph> {
    (1..max_nodes).prop_flat_map(|n| {
        prop::collection::vec((0..n, 0..n), 0..n * 2).prop_map(move |pairs| {
            let data = GraphData {
                nodes: (0..n)
                    .map(|i| NodeData {
                        id: format!("n{i:02}"),
                        kind: None,
                        label: None,
                    })
                    .collect(),
                links: pairs
                    .into_iter()
                    .map(|(s, t)| {
                        Edge::new(
                            NodeId::new(format!("n{s:02}")),
                            NodeId::new(format!("n{t:02}")),
                            EdgeKind::Link,
                        )
                    })
                    .collect(),
            };
            Graph::from_data(data).unwrap()
        })
    })
}

fn entity_ids(records: &[BindingRecord]) -> HashSet<String> {
    let mut ids = HashSet::new();
    for record in records {
        for subject in record.subjects.iter().flatten() {
            ids.insert(format!(
                "{}-{}",
                subject.kind.as_deref().unwrap(),
                subject.name.as_deref().unwrap()
            ));
        }
        let role = record.role_ref.as_ref().unwrap();
        ids.insert(format!(
            "{}-{}",
            role.kind.as_deref().unwrap(),
            role.name.as_deref().unwrap()
        ));
    }
    ids
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn shared_entities_collapse_to_one_node(records in records()) {
        let report = GraphBuilder::new().build(&records).unwrap();
        prop_assert!(report.diagnostics.is_empty());

        let bindings: HashSet<&str> = records
            .iter()
            .filter_map(|r| r.name.as_deref())
            .collect();
        let entities = entity_ids(&records);
        prop_assert_eq!(report.graph.node_count(), bindings.len() + entities.len());
        for id in &entities {
            prop_assert!(report.graph.contains(id));
        }

        // Edges are never collapsed.
        let expected_edges: usize = records
            .iter()
            .map(|r| r.subjects.as_ref().map_or(0, Vec::len) + 1)
            .sum();
        prop_assert_eq!(report.graph.edge_count(), expected_edges);
        prop_assert!(report.graph.validate().is_ok());
    }

    #[test]
    fn build_is_order_independent(records in records()) {
        let forward = GraphBuilder::new().build(&records).unwrap().graph;
        let mut reversed_records = records.clone();
        reversed_records.reverse();
        let reversed = GraphBuilder::new().build(&reversed_records).unwrap().graph;

        prop_assert!(forward.same_elements(&reversed));
    }

    #[test]
    fn empty_selection_is_identity(records in records()) {
        let graph = GraphBuilder::new().build(&records).unwrap().graph;
        let filtered = SubgraphFilter::new().filter::<&str>(&graph, &[]).unwrap();
        prop_assert!(graph.same_elements(&filtered));
    }

    #[test]
    fn selection_is_one_hop_neighborhood(
        records in prop::collection::vec(record(), 1..12),
        picks in prop::collection::vec(any::<prop::sample::Index>(), 1..4),
    ) {
        let graph = GraphBuilder::new().build(&records).unwrap().graph;
        let mut ids: Vec<NodeId> = graph.nodes().map(|n| n.id.clone()).collect();
        ids.sort();
        let selected: HashSet<&str> = picks
            .iter()
            .map(|pick| pick.get(&ids).as_str())
            .collect();
        let selection: Vec<&str> = selected.iter().copied().collect();

        let sub = SubgraphFilter::new().filter(&graph, &selection).unwrap();
        prop_assert!(sub.validate().is_ok());

        for edge in sub.edges() {
            prop_assert!(
                selected.contains(edge.source_id.as_str())
                    || selected.contains(edge.target_id.as_str())
            );
        }
        for node in sub.nodes() {
            let id = node.id.as_str();
            let reachable = selected.contains(id)
                || sub.edges().iter().any(|e| {
                    (e.source_id.as_str() == id && selected.contains(e.target_id.as_str()))
                        || (e.target_id.as_str() == id && selected.contains(e.source_id.as_str()))
                });
            prop_assert!(reachable, "{} is not adjacent to the selection", id);
        }

        // Every edge touching a selected node is kept, exactly once.
        let touching = graph
            .edges()
            .iter()
            .filter(|e| {
                selected.contains(e.source_id.as_str()) || selected.contains(e.target_id.as_str())
            })
            .count();
        prop_assert_eq!(sub.edge_count(), touching);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn layout_converges_without_nan(graph in plain_graph(40)) {
        let mut engine = LayoutEngine::new(LayoutConfig::default()).unwrap();
        engine.set_graph(graph).unwrap();

        let steps = engine.run(1000);
        prop_assert!(engine.is_settled(), "not settled after {} steps", steps);
        prop_assert!(engine.alpha() <= engine.config().alpha_min);
        prop_assert!(engine
            .positions_x()
            .iter()
            .chain(engine.positions_y())
            .all(|v| v.is_finite()));
    }

    #[test]
    fn dragged_node_tracks_pointer(
        graph in plain_graph(20),
        path in prop::collection::vec((-2000.0f64..2000.0, -2000.0f64..2000.0), 1..30),
    ) {
        let mut engine = LayoutEngine::new(LayoutConfig::default()).unwrap();
        engine.set_graph(graph).unwrap();

        let (x0, y0) = path[0];
        engine.pin("n00", x0, y0).unwrap();
        for &(x, y) in &path {
            engine.drag("n00", x, y).unwrap();
            engine.step();
            prop_assert_eq!(engine.position("n00"), Some(Point::new(x, y)));
        }
        prop_assert!(engine.release("n00").unwrap());
        prop_assert!(engine
            .positions_x()
            .iter()
            .chain(engine.positions_y())
            .all(|v| v.is_finite()));
    }
}
