//! Test suites for the IR.
//!
//! `property` exposes its generators behind the `proptest` feature so that
//! downstream crates can build random graphs in their own tests.

pub mod property;
