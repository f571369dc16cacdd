//! Graph storage and read-only queries.

use std::collections::BTreeSet;
use std::sync::Arc;

use snafu::OptionExt;

use crate::catalog::OpCatalog;
use crate::error::{NodeNotFoundSnafu, Result};
use crate::types::{InPort, NodeId, OutPort};

use super::node::Node;

/// Mutable computation graph of operation nodes linked through ports.
///
/// Nodes live in an append-only arena indexed by [`NodeId`]; removal leaves a
/// hole, so ids stay stable and iteration always follows creation order.
///
/// The graph is single-writer: matching borrows it immutably and rewriting
/// borrows it mutably, so the borrow checker rules out mutation while a match
/// scan is still being consumed.
#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) nodes: Vec<Option<Node>>,
    pub(crate) live: usize,
    pub(crate) outputs: BTreeSet<NodeId>,
    pub(crate) catalog: Arc<OpCatalog>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Empty graph validated against [`OpCatalog::standard`].
    pub fn new() -> Self {
        Self::with_catalog(Arc::new(OpCatalog::standard()))
    }

    pub fn with_catalog(catalog: Arc<OpCatalog>) -> Self {
        Self { nodes: Vec::new(), live: 0, outputs: BTreeSet::new(), catalog }
    }

    pub fn catalog(&self) -> &OpCatalog {
        &self.catalog
    }

    /// Number of nodes currently present.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Id the next created node will receive. Every node created after this
    /// call has an id greater than or equal to it.
    pub fn next_id(&self) -> NodeId {
        NodeId(self.nodes.len() as u32)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    /// Like [`Graph::node`], failing with `NodeNotFound`.
    pub fn get(&self, id: NodeId) -> Result<&Node> {
        self.node(id).context(NodeNotFoundSnafu { id })
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut).context(NodeNotFoundSnafu { id })
    }

    /// Present nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().flatten()
    }

    /// Present node ids in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes().map(Node::id)
    }

    /// First node (in creation order) with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes().find(|node| node.name == name).map(Node::id)
    }

    /// Nodes of the given operation kind, in creation order.
    pub fn nodes_by_op<'a>(&'a self, op: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.nodes().filter(move |node| node.op == op).map(Node::id)
    }

    /// Out-port currently feeding `port`, or `None` when it is unconnected or
    /// its node is gone.
    pub fn source(&self, port: InPort) -> Option<OutPort> {
        self.node(port.node).and_then(|node| node.source(port.index))
    }

    /// In-ports currently fed by `port`, sorted by `(node, index)`.
    pub fn consumers(&self, port: OutPort) -> &[InPort] {
        self.node(port.node).map(|node| node.consumers(port.index)).unwrap_or_default()
    }

    /// Nodes designated as graph outputs. Dead-node elimination keeps everything
    /// these nodes depend on.
    pub fn outputs(&self) -> &BTreeSet<NodeId> {
        &self.outputs
    }

    pub fn is_output(&self, id: NodeId) -> bool {
        self.outputs.contains(&id)
    }

    /// Designate `id` as a graph output.
    pub fn mark_output(&mut self, id: NodeId) -> Result<()> {
        self.get(id)?;
        self.outputs.insert(id);
        Ok(())
    }

    pub fn unmark_output(&mut self, id: NodeId) -> bool {
        self.outputs.remove(&id)
    }

    /// Move the output designation from `from` to `to`, if `from` has one.
    ///
    /// Rewrites that replace an output node call this alongside
    /// [`Graph::set_source`], which only moves consumer ports. Returns whether
    /// anything moved.
    pub fn transfer_output(&mut self, from: NodeId, to: NodeId) -> Result<bool> {
        self.get(to)?;
        if !self.outputs.remove(&from) {
            return Ok(false);
        }
        self.outputs.insert(to);
        Ok(true)
    }
}
