//! Mutable port graph.
//!
//! - [`core`] - storage and read-only queries
//! - [`node`] - node representation and construction specs
//! - [`mutation`] - create/remove/connect/retarget primitives
//! - [`analysis`] - reachability, topological order, invariant checks

pub mod analysis;
pub mod core;
pub mod mutation;
pub mod node;

pub use self::core::Graph;
pub use node::{Node, NodeSpec};
