//! Single-match rewrite application.
//!
//! The engine re-validates a match against the current graph, hands it to the
//! replacement function, and reports which nodes the replacement created. It
//! never deletes matched nodes itself; whatever becomes unreachable is left
//! for dead-node elimination.
//!
//! Replacement errors are propagated as-is. Mutations the replacement made
//! before failing stay in the graph; each individual primitive is atomic, but
//! a sequence of them is not rolled back.

use crate::error::Result;
use crate::graph::Graph;
use crate::pattern::{Match, Pattern, RewriteResult, Validity};
use crate::types::NodeId;

/// What happened to a match handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// The replacement changed the graph. `created` lists the nodes it added
    /// that are still present, in creation order.
    Applied { created: Vec<NodeId> },
    /// The replacement ran and chose not to change the graph.
    Declined,
    /// A bound node was removed before the match was applied; replacement skipped.
    Stale { slot: String, node: NodeId },
    /// A predicate or edge no longer holds; replacement skipped.
    Invalidated,
}

impl RewriteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Applies matches to a graph.
#[derive(Debug, Clone, Copy)]
pub struct RewriteEngine {
    verify: bool,
}

impl Default for RewriteEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RewriteEngine {
    /// Engine that validates graph invariants after every applied rewrite.
    pub fn new() -> Self {
        Self { verify: true }
    }

    pub fn with_verification(verify: bool) -> Self {
        Self { verify }
    }

    pub fn verifies(&self) -> bool {
        self.verify
    }

    /// Re-validate `m` and, if it still holds, run `replace` on it.
    #[tracing::instrument(skip_all, fields(pattern = %pattern.name()))]
    pub fn apply<F>(&self, graph: &mut Graph, pattern: &Pattern, m: &Match, replace: F) -> Result<RewriteOutcome>
    where
        F: FnOnce(&mut Graph, &Match) -> Result<RewriteResult>,
    {
        match m.check(pattern, graph) {
            Validity::Valid => {}
            Validity::Stale { slot, node } => {
                tracing::debug!(%slot, %node, "skipping stale match");
                return Ok(RewriteOutcome::Stale { slot, node });
            }
            Validity::Invalidated => {
                tracing::debug!(bindings = ?m.nodes(), "skipping invalidated match");
                return Ok(RewriteOutcome::Invalidated);
            }
        }

        let watermark = graph.next_id();
        match replace(graph, m)? {
            RewriteResult::Declined => {
                tracing::trace!(bindings = ?m.nodes(), "replacement declined");
                Ok(RewriteOutcome::Declined)
            }
            RewriteResult::Rewritten => {
                let created: Vec<NodeId> = graph.node_ids().filter(|id| *id >= watermark).collect();
                if self.verify {
                    graph.validate()?;
                }
                tracing::trace!(bindings = ?m.nodes(), created = ?created, "rewrite applied");
                Ok(RewriteOutcome::Applied { created })
            }
        }
    }
}

/// Apply `replace` to `m` with a verifying [`RewriteEngine`].
pub fn apply_rewrite<F>(graph: &mut Graph, pattern: &Pattern, m: &Match, replace: F) -> Result<RewriteOutcome>
where
    F: FnOnce(&mut Graph, &Match) -> Result<RewriteResult>,
{
    RewriteEngine::new().apply(graph, pattern, m, replace)
}
