//! Property-based tests for the graph and matcher.
//!
//! Uses proptest to check the matcher against exhaustive search on small
//! random graphs.


pub mod generators;
