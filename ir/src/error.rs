use snafu::Snafu;

use crate::types::{AttrKind, InPort, NodeId, OutPort};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Reason a pattern descriptor was rejected at construction time.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum MalformedKind {
    #[display("pattern declares no slots")]
    Empty,

    #[display("slot `{_0}` is declared more than once")]
    DuplicateSlot(String),

    #[display("edge references undeclared slot `{_0}`")]
    UndeclaredSlot(String),

    #[display("edge connects slot `{_0}` to itself")]
    SelfLoop(String),

    #[display("slots {unreachable:?} are not connected to `{root}`")]
    Disconnected { root: String, unreachable: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Node id does not refer to a node that is present in the graph.
    #[snafu(display("node {id} is not present in the graph"))]
    NodeNotFound { id: NodeId },

    #[snafu(display("{port} is out of range: node has {count} in-ports"))]
    InPortOutOfRange { port: InPort, count: usize },

    #[snafu(display("{port} is out of range: node has {count} out-ports"))]
    OutPortOutOfRange { port: OutPort, count: usize },

    /// Removing the node would leave these in-ports reading from a missing producer.
    #[snafu(display("cannot remove {id}: its outputs are still consumed by {consumers:?}"))]
    DanglingReference { id: NodeId, consumers: Vec<InPort> },

    /// Linking `from` into `to` would make the data-flow graph cyclic.
    #[snafu(display("linking {from} into {to} would create a cycle"))]
    CycleDetected { from: OutPort, to: InPort },

    /// Strict catalogs reject operation kinds they do not know.
    #[snafu(display("unknown operation kind `{op}`"))]
    UnknownOp { op: String },

    #[snafu(display("`{op}` expects {expected}, got {inputs} inputs and {outputs} outputs"))]
    ArityMismatch { op: String, expected: String, inputs: usize, outputs: usize },

    #[snafu(display("`{op}` requires attribute `{key}`"))]
    MissingAttribute { op: String, key: String },

    #[snafu(display("attribute `{key}` of `{op}` must be {expected}, got {actual}"))]
    AttributeKind { op: String, key: String, expected: AttrKind, actual: AttrKind },

    /// Pattern descriptor failed construction-time validation.
    #[snafu(display("malformed pattern `{pattern}`: {kind}"))]
    MalformedPattern { pattern: String, kind: MalformedKind },

    /// Graph structure is inconsistent (only reachable through a bug in a mutation path).
    #[snafu(display("graph invariant violated: {reason}"))]
    InvariantViolation { reason: String },
}
