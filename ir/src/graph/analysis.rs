//! Reachability, ordering and structural verification.

use std::collections::BTreeSet;

use snafu::ensure;

use crate::error::{InvariantViolationSnafu, Result};
use crate::types::NodeId;

use super::Graph;

impl Graph {
    /// Whether data flows (transitively) from `from` into `to`.
    ///
    /// A node reaches itself.
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        if from == to {
            return self.contains(from);
        }
        let mut seen = BTreeSet::from([from]);
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            for next in node.consumer_nodes() {
                if next == to {
                    return true;
                }
                if seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        false
    }

    /// `roots` plus every node they transitively read from.
    pub fn upstream_closure(&self, roots: impl IntoIterator<Item = NodeId>) -> BTreeSet<NodeId> {
        let mut closure = BTreeSet::new();
        let mut stack: Vec<NodeId> = roots.into_iter().filter(|id| self.contains(*id)).collect();
        while let Some(id) = stack.pop() {
            if !closure.insert(id) {
                continue;
            }
            if let Some(node) = self.node(id) {
                stack.extend(node.producers().filter(|p| !closure.contains(p)));
            }
        }
        closure
    }

    /// Producers-before-consumers order. Ties follow creation order.
    pub fn topological_order(&self) -> Result<Vec<NodeId>> {
        let mut pending: Vec<usize> = vec![0; self.nodes.len()];
        for node in self.nodes() {
            pending[node.id.index()] = node.producers().count();
        }

        let mut ready: BTreeSet<NodeId> = self.nodes().filter(|n| pending[n.id.index()] == 0).map(|n| n.id).collect();
        let mut order = Vec::with_capacity(self.live);
        while let Some(id) = ready.pop_first() {
            order.push(id);
            let Some(node) = self.node(id) else { continue };
            let consumers: BTreeSet<NodeId> = node.consumer_nodes().collect();
            for next in consumers {
                let count = &mut pending[next.index()];
                *count -= 1;
                if *count == 0 {
                    ready.insert(next);
                }
            }
        }

        ensure!(
            order.len() == self.live,
            InvariantViolationSnafu { reason: format!("data-flow cycle among {} nodes", self.live - order.len()) }
        );
        Ok(order)
    }

    /// Check every structural invariant of the graph.
    ///
    /// - each connected in-port reads an existing out-port of a present node,
    ///   and that out-port lists it as a consumer;
    /// - each listed consumer exists and reads back from that out-port;
    /// - consumer lists are sorted and free of duplicates;
    /// - outputs refer to present nodes;
    /// - data flow is acyclic.
    pub fn validate(&self) -> Result<()> {
        let live = self.nodes().count();
        ensure!(
            live == self.live,
            InvariantViolationSnafu { reason: format!("live count {} but {live} nodes present", self.live) }
        );

        for node in self.nodes() {
            for (index, src) in node.inputs.iter().enumerate() {
                let Some(src) = src else { continue };
                let port = node.id.input(index);
                let linked = self.node(src.node).and_then(|p| p.outputs.get(src.index)).is_some_and(|c| c.contains(&port));
                ensure!(linked, InvariantViolationSnafu { reason: format!("{port} reads {src} which does not list it") });
            }

            for (index, consumers) in node.outputs.iter().enumerate() {
                let port = node.id.output(index);
                ensure!(
                    consumers.windows(2).all(|w| w[0] < w[1]),
                    InvariantViolationSnafu { reason: format!("consumers of {port} are unsorted or duplicated") }
                );
                for consumer in consumers {
                    ensure!(
                        self.source(*consumer) == Some(port),
                        InvariantViolationSnafu { reason: format!("{port} lists {consumer} which does not read it") }
                    );
                }
            }
        }

        if let Some(missing) = self.outputs.iter().find(|id| !self.contains(**id)) {
            return InvariantViolationSnafu { reason: format!("output {missing} is not present") }.fail();
        }

        self.topological_order().map(|_| ())
    }
}
