//! Rule scheduling for the Splice graph rewriter.
//!
//! This crate applies collections of pattern rewrite rules to a
//! [`splice_ir::Graph`] until no rule changes it.
//!
//! # Module Organization
//!
//! - [`rule`] - The `Rule` trait and closure-backed rules
//! - [`registry`] - Rule registration and ordering constraints
//! - [`scheduler`] - Round-based fixed-point driver
//! - [`config`] - Run parameters and scheduler configuration
//! - [`dce`] - Dead-node elimination between rounds
//! - [`passes`] - Built-in fusion passes (LayerNorm → MVN)
//!
//! # Pattern Matching and Rewriting
//!
//! Pattern matching and single-match rewriting live in `splice_ir::pattern` and
//! `splice_ir::rewrite`. This crate re-exports these modules for convenience.

pub mod config;
pub mod dce;
pub mod error;
pub mod passes;
pub mod registry;
pub mod rule;
pub mod scheduler;


// Re-export pattern matching and rewriting from splice_ir
pub use splice_ir::pattern;
pub use splice_ir::rewrite;

// Re-export main types
pub use config::{RunParams, ScanMode, SchedulerConfig};
pub use dce::eliminate_dead_nodes;
pub use error::{Error, Result};
pub use passes::{LayerNormFusion, register_standard_passes};
pub use registry::RuleRegistry;
pub use rule::{FnRule, Rule};
pub use scheduler::{RewriteRecord, ScheduleReport, Scheduler};
