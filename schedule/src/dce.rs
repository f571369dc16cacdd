//! Dead-node elimination.
//!
//! A node is live if it is a graph output or some output reads from it,
//! directly or transitively. Everything else is removed in one batch.

use splice_ir::{Graph, NodeId};

/// Remove every node that cannot reach a graph output. Returns how many
/// nodes were removed.
///
/// A graph without outputs is left untouched: with nothing marked as an
/// output every node would count as dead.
pub fn eliminate_dead_nodes(graph: &mut Graph) -> splice_ir::Result<usize> {
    if graph.outputs().is_empty() {
        tracing::warn!(nodes = graph.len(), "graph has no outputs; skipping dead-node elimination");
        return Ok(0);
    }

    let live = graph.upstream_closure(graph.outputs().iter().copied());
    let dead: Vec<NodeId> = graph.node_ids().filter(|id| !live.contains(id)).collect();
    if dead.is_empty() {
        return Ok(0);
    }

    let removed = graph.remove_nodes(&dead)?;
    tracing::debug!(removed, remaining = graph.len(), "dead nodes eliminated");
    Ok(removed)
}
