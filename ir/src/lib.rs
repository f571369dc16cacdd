//! Port graph IR and subgraph pattern matching for the Splice rewriter.
//!
//! This crate defines the mutable computation graph that rewrite rules operate
//! on, the pattern language used to find subgraphs in it, and the engine that
//! applies a single match.
//!
//! # Module Organization
//!
//! - [`types`] - Node ids, ports and attribute values
//! - [`catalog`] - Operator schemas (port arity, attribute kinds)
//! - [`graph`] - The graph itself: storage, mutation, analysis
//! - [`pattern`] - Pattern descriptors, predicates and the matcher
//! - [`rewrite`] - Re-validated application of one match
//! - [`error`] - Error types and result handling

// Module declarations
pub mod catalog;
pub mod error;
pub mod graph;
pub mod prelude;
pub mod types;

pub mod pattern;
pub mod rewrite;

#[cfg(any(test, feature = "proptest"))]
pub mod test;

// All commonly used types remain accessible at the crate root
pub use catalog::{AttrSpec, CatalogMode, OpCatalog, OpSchema};
pub use error::{Error, MalformedKind, Result};
pub use graph::{Graph, Node, NodeSpec};
pub use types::{AttrKind, AttrValue, Attributes, InPort, NodeId, OutPort};

// Re-export pattern matching and rewriting infrastructure
pub use pattern::{Match, Pattern, Predicate, RewriteResult, Validity, find_matches};
pub use rewrite::{RewriteEngine, RewriteOutcome, apply_rewrite};
