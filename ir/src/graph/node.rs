//! Node storage and construction specs.

use smallvec::SmallVec;

use crate::types::{AttrValue, Attributes, InPort, NodeId, OutPort};

/// Consumers of a single out-port, kept sorted by `(node, index)`.
pub(crate) type Consumers = SmallVec<[InPort; 2]>;

/// Operation node of a [`Graph`](crate::Graph).
///
/// Port linkage is stored on both ends: every in-port records its source
/// out-port, and every out-port records its consumers. The graph keeps the two
/// sides in sync; nodes are only mutable through graph methods.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) op: String,
    pub(crate) attrs: Attributes,
    pub(crate) inputs: SmallVec<[Option<OutPort>; 4]>,
    pub(crate) outputs: SmallVec<[Consumers; 1]>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Operation kind tag.
    pub fn op(&self) -> &str {
        &self.op
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// In-ports in index order.
    pub fn in_ports(&self) -> impl Iterator<Item = InPort> + '_ {
        (0..self.inputs.len()).map(|index| self.id.input(index))
    }

    /// Out-ports in index order.
    pub fn out_ports(&self) -> impl Iterator<Item = OutPort> + '_ {
        (0..self.outputs.len()).map(|index| self.id.output(index))
    }

    /// Source of in-port `index`, if connected.
    pub fn source(&self, index: usize) -> Option<OutPort> {
        self.inputs.get(index).copied().flatten()
    }

    /// Sources of all in-ports in index order, `None` for unconnected ports.
    pub fn sources(&self) -> &[Option<OutPort>] {
        &self.inputs
    }

    /// Consumers of out-port `index`, sorted by `(node, index)`.
    pub fn consumers(&self, index: usize) -> &[InPort] {
        self.outputs.get(index).map(|c| c.as_slice()).unwrap_or_default()
    }

    /// Whether any out-port of this node feeds another node.
    pub fn has_consumers(&self) -> bool {
        self.outputs.iter().any(|c| !c.is_empty())
    }

    /// Distinct producer nodes feeding this node, in in-port order.
    pub fn producers(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut seen = SmallVec::<[NodeId; 4]>::new();
        self.inputs.iter().flatten().filter_map(move |src| {
            if seen.contains(&src.node) {
                None
            } else {
                seen.push(src.node);
                Some(src.node)
            }
        })
    }

    /// Consumer nodes of any out-port. May repeat a node fed through several ports.
    pub fn consumer_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.outputs.iter().flatten().map(|port| port.node)
    }
}

/// Description of a node to create.
///
/// Port counts left unset are resolved through the graph's operator catalog.
///
/// ```
/// use splice_ir::{Graph, NodeSpec, attrs};
///
/// let mut graph = Graph::new();
/// let spec = NodeSpec::builder().op("ReduceMean").name("pool0").attrs(attrs! { "keep_dims" => true }).build();
/// let id = graph.add_node(spec).unwrap();
/// assert_eq!(graph.node(id).unwrap().name(), "pool0");
/// ```
#[derive(Debug, Clone, PartialEq, bon::Builder)]
pub struct NodeSpec {
    #[builder(into)]
    pub op: String,
    #[builder(into)]
    pub name: Option<String>,
    #[builder(default)]
    pub attrs: Attributes,
    pub inputs: Option<usize>,
    pub outputs: Option<usize>,
}

impl NodeSpec {
    /// Spec with only an operation kind and attributes.
    pub fn new(op: impl Into<String>, attrs: Attributes) -> Self {
        Self { op: op.into(), name: None, attrs, inputs: None, outputs: None }
    }
}
