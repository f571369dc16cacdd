//! Backtracking subgraph matcher.
//!
//! Slots are bound in the pattern's breadth-first plan order. The root slot
//! draws candidates from every node in the graph (or every node of the pinned
//! operation kind); every other slot draws them from the neighbours of the
//! already bound slot it was reached through. Candidates are tried in
//! ascending [`NodeId`] order, so for an unchanged graph the sequence of
//! matches is fully deterministic.
//!
//! Matching is injective: two slots never bind the same node.

use std::ops::Index;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::graph::Graph;
use crate::types::NodeId;

use super::descriptor::{EdgeSpec, Pattern, Step};

/// Slot-to-node binding produced by the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    names: Arc<[String]>,
    bindings: SmallVec<[NodeId; 8]>,
}

/// Result of re-checking a match against the current graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    Valid,
    /// A bound node is no longer present.
    Stale { slot: String, node: NodeId },
    /// Every bound node is present but a predicate or an edge no longer holds.
    Invalidated,
}

impl Match {
    /// Node bound to `slot`, if the pattern declares it.
    pub fn get(&self, slot: &str) -> Option<NodeId> {
        self.names.iter().position(|name| name == slot).map(|i| self.bindings[i])
    }

    /// Bound nodes in slot declaration order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.bindings
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.names.iter().map(String::as_str).zip(self.bindings.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Re-check the binding against `graph`.
    ///
    /// Presence is checked first for every slot, so a match with a removed
    /// node always reports `Stale` even if other conditions broke as well.
    /// A match produced by a pattern with different slots is `Invalidated`.
    pub fn check(&self, pattern: &Pattern, graph: &Graph) -> Validity {
        if self.bindings.len() != pattern.len() || !self.names.iter().map(String::as_str).eq(pattern.slot_names()) {
            return Validity::Invalidated;
        }

        for (slot, &node) in pattern.slots().iter().zip(&self.bindings) {
            if !graph.contains(node) {
                return Validity::Stale { slot: slot.name.clone(), node };
            }
        }

        let predicates_hold = pattern
            .slots()
            .iter()
            .zip(&self.bindings)
            .all(|(slot, &id)| graph.node(id).is_some_and(|node| slot.predicate.eval(node)));
        let edges_hold = pattern
            .edges()
            .iter()
            .all(|edge| edge_holds(graph, edge, self.bindings[edge.from], self.bindings[edge.to]));

        if predicates_hold && edges_hold { Validity::Valid } else { Validity::Invalidated }
    }
}

impl Index<&str> for Match {
    type Output = NodeId;

    fn index(&self, slot: &str) -> &NodeId {
        match self.names.iter().position(|name| name == slot) {
            Some(i) => &self.bindings[i],
            None => panic!("slot `{slot}` is not declared by this match's pattern"),
        }
    }
}

impl Pattern {
    /// Lazily enumerate every match of this pattern in `graph`.
    pub fn matches<'a>(&'a self, graph: &'a Graph) -> Matches<'a> {
        Matches::new(self, graph)
    }
}

/// Lazily enumerate every match of `pattern` in `graph`.
pub fn find_matches<'a>(pattern: &'a Pattern, graph: &'a Graph) -> Matches<'a> {
    Matches::new(pattern, graph)
}

/// First match of `pattern` in `graph`, if any.
pub fn first_match(pattern: &Pattern, graph: &Graph) -> Option<Match> {
    find_matches(pattern, graph).next()
}

struct Frame {
    candidates: Vec<NodeId>,
    cursor: usize,
}

/// Iterator over the matches of a pattern.
///
/// Borrows the graph immutably, so the graph cannot change while matches are
/// still being produced. Collect first when the caller intends to rewrite.
pub struct Matches<'a> {
    pattern: &'a Pattern,
    graph: &'a Graph,
    frames: Vec<Frame>,
    bound: SmallVec<[Option<NodeId>; 8]>,
    started: bool,
}

impl<'a> Matches<'a> {
    fn new(pattern: &'a Pattern, graph: &'a Graph) -> Self {
        Self {
            pattern,
            graph,
            frames: Vec::with_capacity(pattern.len()),
            bound: SmallVec::from_elem(None, pattern.len()),
            started: false,
        }
    }

    fn frame(&self, step: &Step) -> Frame {
        let candidates = match step.anchor {
            None => match self.pattern.slots()[step.slot].predicate.pinned_op() {
                Some(op) => self.graph.nodes_by_op(op).collect(),
                None => self.graph.node_ids().collect(),
            },
            Some(e) => self.neighbours(&self.pattern.edges()[e], step.slot),
        };
        tracing::trace!(
            pattern = %self.pattern.name(),
            slot = %self.pattern.slots()[step.slot].name,
            candidates = candidates.len(),
            "enumerating candidates"
        );
        Frame { candidates, cursor: 0 }
    }

    /// Nodes on the far side of `edge` from its already bound endpoint.
    fn neighbours(&self, edge: &EdgeSpec, slot: usize) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = if edge.to == slot {
            let Some(producer) = self.bound[edge.from].and_then(|id| self.graph.node(id)) else {
                return Vec::new();
            };
            producer
                .out_ports()
                .filter(|port| edge.out_port.is_none_or(|p| p == port.index))
                .flat_map(|port| self.graph.consumers(port).iter())
                .filter(|input| edge.in_port.is_none_or(|p| p == input.index))
                .map(|input| input.node)
                .collect()
        } else {
            let Some(consumer) = self.bound[edge.to].and_then(|id| self.graph.node(id)) else {
                return Vec::new();
            };
            consumer
                .sources()
                .iter()
                .enumerate()
                .filter(|(index, _)| edge.in_port.is_none_or(|p| p == *index))
                .filter_map(|(_, src)| *src)
                .filter(|src| edge.out_port.is_none_or(|p| p == src.index))
                .map(|src| src.node)
                .collect()
        };
        out.sort_unstable();
        out.dedup();
        out
    }

    fn accepts(&self, step: &Step, candidate: NodeId) -> bool {
        let Some(node) = self.graph.node(candidate) else { return false };
        if self.bound.contains(&Some(candidate)) || !self.pattern.slots()[step.slot].predicate.eval(node) {
            return false;
        }

        let binding = |slot: usize| if slot == step.slot { Some(candidate) } else { self.bound[slot] };
        step.checks.iter().all(|&e| {
            let edge = &self.pattern.edges()[e];
            match (binding(edge.from), binding(edge.to)) {
                (Some(from), Some(to)) => edge_holds(self.graph, edge, from, to),
                _ => false,
            }
        })
    }

    fn emit(&self) -> Match {
        Match { names: Arc::clone(self.pattern.shared_names()), bindings: self.bound.iter().flatten().copied().collect() }
    }
}

impl Iterator for Matches<'_> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        let pattern = self.pattern;
        let plan = pattern.plan();
        loop {
            if self.frames.is_empty() {
                if self.started {
                    return None;
                }
                self.started = true;
                let root = self.frame(&plan[0]);
                self.frames.push(root);
            }

            let depth = self.frames.len() - 1;
            let step = &plan[depth];
            // Undo this depth's previous binding before trying the next candidate.
            self.bound[step.slot] = None;

            let frame = self.frames.last_mut()?;
            let Some(&candidate) = frame.candidates.get(frame.cursor) else {
                self.frames.pop();
                continue;
            };
            frame.cursor += 1;

            if !self.accepts(step, candidate) {
                continue;
            }
            self.bound[step.slot] = Some(candidate);

            if depth + 1 == plan.len() {
                let found = self.emit();
                tracing::debug!(pattern = %self.pattern.name(), bindings = ?found.nodes(), "match found");
                return Some(found);
            }
            let next = self.frame(&plan[depth + 1]);
            self.frames.push(next);
        }
    }
}

/// Whether some in-port of `to` reads from some out-port of `from`,
/// restricted to the edge's explicit ports.
pub(crate) fn edge_holds(graph: &Graph, edge: &EdgeSpec, from: NodeId, to: NodeId) -> bool {
    let Some(consumer) = graph.node(to) else { return false };
    consumer.sources().iter().enumerate().any(|(index, src)| {
        edge.in_port.is_none_or(|p| p == index)
            && src.is_some_and(|src| src.node == from && edge.out_port.is_none_or(|p| p == src.index))
    })
}
