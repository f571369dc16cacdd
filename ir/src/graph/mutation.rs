//! Graph mutation primitives.
//!
//! Every primitive validates its preconditions before touching the graph, so a
//! failed call leaves the graph exactly as it was. Successful calls are visible
//! immediately to subsequent reads.

use std::collections::BTreeSet;

use smallvec::{SmallVec, smallvec};
use snafu::ensure;

use crate::error::{
    CycleDetectedSnafu, DanglingReferenceSnafu, InPortOutOfRangeSnafu, NodeNotFoundSnafu, OutPortOutOfRangeSnafu, Result,
};
use crate::types::{AttrValue, Attributes, InPort, NodeId, OutPort};

use super::Graph;
use super::node::{Consumers, Node, NodeSpec};

impl Graph {
    /// Create a node of kind `op` with the catalog's default port arity.
    pub fn create_node(&mut self, op: impl Into<String>, attrs: Attributes) -> Result<NodeId> {
        self.add_node(NodeSpec::new(op, attrs))
    }

    /// Create a node from a full spec, validated against the operator catalog.
    pub fn add_node(&mut self, spec: NodeSpec) -> Result<NodeId> {
        let NodeSpec { op, name, attrs, inputs, outputs } = spec;
        let (inputs, outputs) = self.catalog.resolve_arity(&op, inputs, outputs)?;
        self.catalog.validate_attrs(&op, &attrs)?;

        let id = self.next_id();
        let name = name.unwrap_or_else(|| format!("{op}_{}", id.raw()));
        tracing::trace!(node.id = %id, node.name = %name, node.op = %op, inputs, outputs, "node created");

        self.nodes.push(Some(Node {
            id,
            name,
            op,
            attrs,
            inputs: smallvec![None; inputs],
            outputs: (0..outputs).map(|_| Consumers::new()).collect(),
        }));
        self.live += 1;
        Ok(id)
    }

    /// Set an attribute, returning the previous value.
    pub fn set_attr(&mut self, id: NodeId, key: impl Into<String>, value: impl Into<AttrValue>) -> Result<Option<AttrValue>> {
        let key = key.into();
        let value = value.into();
        let op = self.get(id)?.op.clone();
        self.catalog.validate_attr(&op, &key, &value)?;
        Ok(self.get_mut(id)?.attrs.insert(key, value))
    }

    /// Remove a node whose outputs nobody consumes.
    ///
    /// Fails with `DanglingReference` while any out-port still has consumers;
    /// rewire them first (e.g. with [`Graph::set_source`]). The node's own
    /// inputs are detached from their producers.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node> {
        let node = self.get(id)?;
        let consumers: Vec<InPort> = node.outputs.iter().flatten().copied().collect();
        ensure!(consumers.is_empty(), DanglingReferenceSnafu { id, consumers });

        let node = self.take(id)?;
        tracing::debug!(node.id = %id, node.name = %node.name, node.op = %node.op, "node removed");
        Ok(node)
    }

    /// Remove a set of nodes at once.
    ///
    /// Consumers inside the set do not count as dangling; any consumer outside
    /// the set fails the whole call before anything is removed.
    pub fn remove_nodes(&mut self, ids: &[NodeId]) -> Result<usize> {
        let doomed: BTreeSet<NodeId> = ids.iter().copied().collect();
        for &id in &doomed {
            let consumers: Vec<InPort> =
                self.get(id)?.outputs.iter().flatten().filter(|port| !doomed.contains(&port.node)).copied().collect();
            ensure!(consumers.is_empty(), DanglingReferenceSnafu { id, consumers });
        }

        for &id in &doomed {
            self.take(id)?;
        }
        tracing::debug!(count = doomed.len(), "nodes removed");
        Ok(doomed.len())
    }

    /// Detach `id` from its producers and drop it. Consumers are not checked.
    fn take(&mut self, id: NodeId) -> Result<Node> {
        let node = self.nodes.get_mut(id.index()).and_then(Option::take).ok_or_else(|| NodeNotFoundSnafu { id }.build())?;
        self.live -= 1;
        self.outputs.remove(&id);

        for (index, src) in node.inputs.iter().enumerate() {
            if let Some(src) = src
                && let Some(producer) = self.nodes.get_mut(src.node.index()).and_then(Option::as_mut)
            {
                remove_consumer(&mut producer.outputs[src.index], id.input(index));
            }
        }

        // Consumers inside a batch removal may still point at this node.
        for port in node.outputs.iter().flatten() {
            if let Some(consumer) = self.nodes.get_mut(port.node.index()).and_then(Option::as_mut) {
                consumer.inputs[port.index] = None;
            }
        }
        Ok(node)
    }

    /// Link `input` to `output`, replacing any previous link on `input`.
    ///
    /// Returns the previous source. Fails without mutating if either port does
    /// not exist or the link would create a data cycle.
    pub fn connect(&mut self, input: InPort, output: OutPort) -> Result<Option<OutPort>> {
        self.check_in_port(input)?;
        self.check_out_port(output)?;
        ensure!(
            input.node != output.node && !self.reaches(input.node, output.node),
            CycleDetectedSnafu { from: output, to: input }
        );

        let previous = self.unlink(input);
        self.link(input, output);
        tracing::trace!(%input, %output, "ports connected");
        Ok(previous)
    }

    /// Unlink `input` from its source, returning the source if there was one.
    pub fn disconnect(&mut self, input: InPort) -> Result<Option<OutPort>> {
        self.check_in_port(input)?;
        Ok(self.unlink(input))
    }

    /// Retarget every consumer of `old` to read from `new` instead.
    ///
    /// Either all consumers move or, on error, none do. Returns the number of
    /// in-ports that were moved.
    pub fn set_source(&mut self, old: OutPort, new: OutPort) -> Result<usize> {
        self.check_out_port(old)?;
        self.check_out_port(new)?;
        if old == new {
            return Ok(0);
        }

        let moved: SmallVec<[InPort; 4]> = self.consumers(old).iter().copied().collect();
        for &port in &moved {
            ensure!(
                port.node != new.node && !self.reaches(port.node, new.node),
                CycleDetectedSnafu { from: new, to: port }
            );
        }

        for &port in &moved {
            self.unlink(port);
            self.link(port, new);
        }
        tracing::trace!(%old, %new, moved = moved.len(), "consumers retargeted");
        Ok(moved.len())
    }

    fn check_in_port(&self, port: InPort) -> Result<()> {
        let count = self.get(port.node)?.inputs.len();
        ensure!(port.index < count, InPortOutOfRangeSnafu { port, count });
        Ok(())
    }

    fn check_out_port(&self, port: OutPort) -> Result<()> {
        let count = self.get(port.node)?.outputs.len();
        ensure!(port.index < count, OutPortOutOfRangeSnafu { port, count });
        Ok(())
    }

    /// Both ports must exist.
    fn link(&mut self, input: InPort, output: OutPort) {
        if let Some(consumer) = self.nodes[input.node.index()].as_mut() {
            consumer.inputs[input.index] = Some(output);
        }
        if let Some(producer) = self.nodes[output.node.index()].as_mut() {
            let consumers = &mut producer.outputs[output.index];
            if let Err(at) = consumers.binary_search(&input) {
                consumers.insert(at, input);
            }
        }
    }

    /// `input` must exist.
    fn unlink(&mut self, input: InPort) -> Option<OutPort> {
        let previous = self.nodes[input.node.index()].as_mut().and_then(|node| node.inputs[input.index].take())?;
        if let Some(producer) = self.nodes.get_mut(previous.node.index()).and_then(Option::as_mut) {
            remove_consumer(&mut producer.outputs[previous.index], input);
        }
        Some(previous)
    }
}

fn remove_consumer(consumers: &mut Consumers, port: InPort) {
    if let Ok(at) = consumers.binary_search(&port) {
        consumers.remove(at);
    }
}
