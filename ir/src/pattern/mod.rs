//! Subgraph pattern matching.
//!
//! A [`Pattern`] names a set of slots, each guarded by a [`Predicate`], and the
//! edges that must connect them. [`find_matches`] enumerates every injective
//! slot binding in a deterministic order; [`Match::check`] re-validates a
//! binding after the graph has changed.

pub mod descriptor;
pub mod matcher;
pub mod predicate;

// =============================================================================
// RewriteResult - Result of a replacement function
// =============================================================================

/// What a replacement function did with the match it was handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteResult {
    /// The graph was changed.
    Rewritten,
    /// The replacement looked at the match and left the graph untouched.
    Declined,
}

// =============================================================================
// Pattern Exports
// =============================================================================

pub use descriptor::{EdgeSpec, Pattern, PatternBuilder, Slot};
pub use matcher::{Match, Matches, Validity, find_matches, first_match};
pub use predicate::{AttrTest, CmpOp, CustomPredicate, Predicate};
