//! Generators for property-based testing.
//!
//! Random graphs are DAGs by construction: every node reads only from nodes
//! created before it. Operation kinds come from a tiny alphabet so that
//! patterns built from the same alphabet match often.

use proptest::prelude::*;
use proptest::sample::Index;

use crate::pattern::{Pattern, Predicate};
use crate::{Graph, NodeId, NodeSpec};

/// Operation kinds used by generated graphs and patterns. None of them is in
/// the standard catalog, so every node gets the arity its spec asks for.
pub const OPS: [&str; 3] = ["A", "B", "C"];

/// In-ports of every generated node.
pub const FAN_IN: usize = 2;

// ============================================================================
// Graph Generators
// ============================================================================

/// One generated node: op index and an optional source for each in-port.
pub type NodePlan = (usize, [Option<Index>; FAN_IN]);

fn arb_node_plan() -> impl Strategy<Value = NodePlan> {
    (0..OPS.len(), proptest::array::uniform2(proptest::option::of(any::<Index>())))
}

/// Build a graph from node plans. In-port sources index into the nodes
/// created earlier; the last node is marked as the graph output.
pub fn build_graph(plans: &[NodePlan]) -> Graph {
    let mut graph = Graph::new();
    let mut ids: Vec<NodeId> = Vec::with_capacity(plans.len());

    for (position, (op, sources)) in plans.iter().enumerate() {
        let spec = NodeSpec::builder().op(OPS[*op]).inputs(FAN_IN).outputs(1).build();
        let id = graph.add_node(spec).expect("generated ops are always accepted by a lenient catalog");
        if position > 0 {
            for (index, source) in sources.iter().enumerate() {
                if let Some(source) = source {
                    let producer = ids[source.index(position)];
                    graph.connect(id.input(index), producer.output(0)).expect("links to earlier nodes cannot cycle");
                }
            }
        }
        ids.push(id);
    }

    if let Some(&last) = ids.last() {
        graph.mark_output(last).expect("last node is present");
    }
    graph
}

/// Random DAG with between 1 and `max_nodes` nodes.
pub fn arb_graph(max_nodes: usize) -> impl Strategy<Value = Graph> {
    proptest::collection::vec(arb_node_plan(), 1..=max_nodes).prop_map(|plans| build_graph(&plans))
}

// ============================================================================
// Pattern Generators
// ============================================================================

/// Tree-shaped pattern with 1 to `max_slots` slots named `s0`, `s1`, ...
///
/// Slot `k` is linked to a random earlier slot in a random direction, so the
/// pattern is always connected. Each slot either pins an op from [`OPS`] or
/// accepts any node.
pub fn arb_pattern(max_slots: usize) -> impl Strategy<Value = Pattern> {
    (1..=max_slots)
        .prop_flat_map(|slots| {
            (
                proptest::collection::vec(proptest::option::of(0..OPS.len()), slots),
                proptest::collection::vec((any::<Index>(), any::<bool>()), slots - 1),
            )
        })
        .prop_map(|(ops, links)| {
            let mut builder = Pattern::builder("generated");
            for (slot, op) in ops.iter().enumerate() {
                let predicate = op.map_or(Predicate::Any, |op| Predicate::op(OPS[op]));
                builder = builder.node(format!("s{slot}"), predicate);
            }
            for (offset, (parent, forward)) in links.iter().enumerate() {
                let child = offset + 1;
                let parent = parent.index(child);
                builder = if *forward {
                    builder.edge(format!("s{parent}"), format!("s{child}"))
                } else {
                    builder.edge(format!("s{child}"), format!("s{parent}"))
                };
            }
            builder.build().expect("tree-shaped patterns are always well formed")
        })
}
