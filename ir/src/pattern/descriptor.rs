//! Pattern descriptors: named slots, node predicates and required edges.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use snafu::ensure;

use crate::error::{MalformedKind, MalformedPatternSnafu, Result};

use super::predicate::Predicate;

/// Named placeholder that binds to exactly one node per match.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub name: String,
    pub predicate: Predicate,
}

/// Required data-flow link between two slots.
///
/// Without explicit ports the edge holds when *any* out-port of `from` feeds
/// *any* in-port of `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeSpec {
    pub from: usize,
    pub to: usize,
    pub out_port: Option<usize>,
    pub in_port: Option<usize>,
}

/// One step of the search plan: bind `slot`, drawing candidates from the
/// neighbours of an already bound slot through `anchor` when there is one.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Step {
    pub slot: usize,
    pub anchor: Option<usize>,
    /// Edges whose endpoints are both bound once this step binds `slot`.
    pub checks: Vec<usize>,
}

/// Immutable description of a connected subgraph shape.
///
/// Built with [`Pattern::builder`]; construction rejects empty, duplicated,
/// dangling, self-looping or disconnected descriptions.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    name: String,
    slots: Vec<Slot>,
    edges: Vec<EdgeSpec>,
    names: Arc<[String]>,
    plan: Vec<Step>,
}

impl Pattern {
    pub fn builder(name: impl Into<String>) -> PatternBuilder {
        PatternBuilder { name: name.into(), slots: Vec::new(), edges: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Slots in declaration order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.slots.iter().map(|slot| slot.name.as_str())
    }

    pub fn edges(&self) -> &[EdgeSpec] {
        &self.edges
    }

    pub fn slot_index(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.name == name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn shared_names(&self) -> &Arc<[String]> {
        &self.names
    }

    pub(crate) fn plan(&self) -> &[Step] {
        &self.plan
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "pattern {} {{", self.name)?;
        for slot in &self.slots {
            writeln!(f, "  {}: {}", slot.name, slot.predicate)?;
        }
        for edge in &self.edges {
            let from = &self.slots[edge.from].name;
            let to = &self.slots[edge.to].name;
            match (edge.out_port, edge.in_port) {
                (None, None) => writeln!(f, "  {from} -> {to}")?,
                (out, inp) => {
                    let out = out.map_or_else(|| "*".to_string(), |i| i.to_string());
                    let inp = inp.map_or_else(|| "*".to_string(), |i| i.to_string());
                    writeln!(f, "  {from}.out{out} -> {to}.in{inp}")?
                }
            }
        }
        f.write_str("}")
    }
}

/// Incremental pattern construction.
///
/// ```
/// use splice_ir::pattern::{Pattern, Predicate};
///
/// let pattern = Pattern::builder("square-root")
///     .node("pow", Predicate::op("Pow"))
///     .node("half", Predicate::op("Const"))
///     .edge_at("half", 0, "pow", 1)
///     .build()
///     .unwrap();
/// assert_eq!(pattern.len(), 2);
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct PatternBuilder {
    name: String,
    slots: Vec<Slot>,
    edges: Vec<(String, String, Option<usize>, Option<usize>)>,
}

impl PatternBuilder {
    /// Declare a slot. Declaration order fixes the search root (first slot)
    /// and the order of bindings in every match.
    pub fn node(mut self, name: impl Into<String>, predicate: Predicate) -> Self {
        self.slots.push(Slot { name: name.into(), predicate });
        self
    }

    /// Require some out-port of `from` to feed some in-port of `to`.
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), to.into(), None, None));
        self
    }

    /// Require out-port `out_port` of `from` to feed in-port `in_port` of `to`.
    pub fn edge_at(mut self, from: impl Into<String>, out_port: usize, to: impl Into<String>, in_port: usize) -> Self {
        self.edges.push((from.into(), to.into(), Some(out_port), Some(in_port)));
        self
    }

    pub fn build(self) -> Result<Pattern> {
        let Self { name, slots, edges: raw_edges } = self;
        let malformed = |kind| MalformedPatternSnafu { pattern: name.clone(), kind };

        ensure!(!slots.is_empty(), malformed(MalformedKind::Empty));

        let mut index = HashMap::with_capacity(slots.len());
        for (i, slot) in slots.iter().enumerate() {
            ensure!(
                index.insert(slot.name.as_str(), i).is_none(),
                malformed(MalformedKind::DuplicateSlot(slot.name.clone()))
            );
        }

        let mut edges = Vec::with_capacity(raw_edges.len());
        for (from, to, out_port, in_port) in &raw_edges {
            let lookup = |slot: &String| index.get(slot.as_str()).copied();
            let Some(from_idx) = lookup(from) else {
                return malformed(MalformedKind::UndeclaredSlot(from.clone())).fail();
            };
            let Some(to_idx) = lookup(to) else {
                return malformed(MalformedKind::UndeclaredSlot(to.clone())).fail();
            };
            ensure!(from_idx != to_idx, malformed(MalformedKind::SelfLoop(from.clone())));
            edges.push(EdgeSpec { from: from_idx, to: to_idx, out_port: *out_port, in_port: *in_port });
        }

        let plan = search_plan(slots.len(), &edges);
        if plan.len() < slots.len() {
            let planned: Vec<bool> = {
                let mut seen = vec![false; slots.len()];
                plan.iter().for_each(|step| seen[step.slot] = true);
                seen
            };
            let unreachable =
                slots.iter().enumerate().filter(|(i, _)| !planned[*i]).map(|(_, slot)| slot.name.clone()).collect();
            return malformed(MalformedKind::Disconnected { root: slots[0].name.clone(), unreachable }).fail();
        }

        let names: Arc<[String]> = slots.iter().map(|slot| slot.name.clone()).collect();
        tracing::trace!(pattern = %name, slots = slots.len(), edges = edges.len(), "pattern built");
        Ok(Pattern { name, slots, edges, names, plan })
    }
}

/// Breadth-first binding order from slot 0 over edges taken in either
/// direction. Each step records the edge it was reached through and the edges
/// that become fully bound with it.
fn search_plan(slot_count: usize, edges: &[EdgeSpec]) -> Vec<Step> {
    let mut adjacency: Vec<Vec<(usize, usize)>> = vec![Vec::new(); slot_count];
    for (e, edge) in edges.iter().enumerate() {
        adjacency[edge.from].push((edge.to, e));
        adjacency[edge.to].push((edge.from, e));
    }

    let mut bound = vec![false; slot_count];
    let mut queue = VecDeque::from([(0usize, None)]);
    bound[0] = true;
    let mut plan = Vec::with_capacity(slot_count);

    while let Some((slot, anchor)) = queue.pop_front() {
        for &(next, e) in &adjacency[slot] {
            if !bound[next] {
                bound[next] = true;
                queue.push_back((next, Some(e)));
            }
        }
        plan.push(Step { slot, anchor, checks: Vec::new() });
    }

    let mut position = vec![usize::MAX; slot_count];
    for (i, step) in plan.iter().enumerate() {
        position[step.slot] = i;
    }
    for (e, edge) in edges.iter().enumerate() {
        let (a, b) = (position[edge.from], position[edge.to]);
        if a != usize::MAX && b != usize::MAX {
            plan[a.max(b)].checks.push(e);
        }
    }
    plan
}
