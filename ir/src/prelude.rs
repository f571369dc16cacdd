//! Common imports for writing rewrite rules.
//!
//! ```rust
//! use splice_ir::prelude::*;
//!
//! let pattern = Pattern::builder("pair").node("a", Predicate::Any).node("b", Predicate::Any).edge("a", "b").build();
//! assert!(pattern.is_ok());
//! ```

// Graph
pub use crate::graph::{Graph, Node, NodeSpec};
pub use crate::types::{AttrValue, Attributes, InPort, NodeId, OutPort};

// Patterns
pub use crate::pattern::{CmpOp, Match, Pattern, Predicate, RewriteResult};

// Errors
pub use crate::error::{Error, Result};

pub use crate::attrs;
