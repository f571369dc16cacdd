//! Rewrite application.
//!
//! Fixed-point scheduling across many rules lives in `splice-schedule`; this
//! module only knows how to apply one match.

pub mod engine;

pub use engine::{RewriteEngine, RewriteOutcome, apply_rewrite};
