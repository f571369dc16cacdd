//! LayerNorm fusion pass.
//!
//! Collapses layer normalization written out as primitive arithmetic
//!
//! ```text
//! x ─┬────────────── sub ─┬─ pow ── pool1 ── add0 ── sqrt ── div
//!    └─ pool0 ───────┘    └─────────────────────────────────┘
//! ```
//!
//! i.e. `(x - mean(x)) / pow(mean(pow(x - mean(x))) + eps, 0.5)`, into a
//! single `MVN` node:
//!
//! ```text
//! x ── MVN
//! ```
//!
//! The `MVN` node reads the source of `pool0`'s first input and takes over
//! every consumer of `div`, along with its output mark when `div` is a graph
//! output. The matched nodes are left for dead-node
//! elimination.
//!
//! The fusion only runs when experimental IR generation is enabled.

use splice_ir::{Graph, Match, NodeSpec, Pattern, Predicate, RewriteResult, attrs};

use crate::config::RunParams;
use crate::rule::Rule;

/// Epsilon written onto fused nodes.
pub const MVN_EPS: f64 = 1e-6;

/// Rewrites the seven-node LayerNorm subgraph into `MVN`.
#[derive(Debug, Clone)]
pub struct LayerNormFusion {
    pattern: Pattern,
}

impl LayerNormFusion {
    pub const NAME: &'static str = "LayerNorm";

    pub fn new() -> splice_ir::Result<Self> {
        Ok(Self { pattern: layer_norm_pattern()? })
    }
}

/// The seven-node pattern. `sqrt` is a `Pow` node (raising to 0.5).
pub fn layer_norm_pattern() -> splice_ir::Result<Pattern> {
    Pattern::builder(LayerNormFusion::NAME)
        .node("pool0", Predicate::op("ReduceMean"))
        .node("pool1", Predicate::op("ReduceMean"))
        .node("pow", Predicate::op("Pow"))
        .node("div", Predicate::op("Div"))
        .node("sqrt", Predicate::op("Pow"))
        .node("add0", Predicate::op("Add"))
        .node("sub", Predicate::op("Sub"))
        .edge("pool0", "sub")
        .edge("sub", "pow")
        .edge("pow", "pool1")
        .edge("pool1", "add0")
        .edge("add0", "sqrt")
        .edge("sqrt", "div")
        .edge("sub", "div")
        .build()
}

impl Rule for LayerNormFusion {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn is_applicable(&self, params: &RunParams) -> bool {
        params.experimental_ir
    }

    fn replace(&self, graph: &mut Graph, m: &Match) -> splice_ir::Result<RewriteResult> {
        let pool0 = graph.get(m["pool0"])?;
        let Some(input) = pool0.source(0) else {
            tracing::debug!(pool0 = %pool0.name(), "LayerNorm match has no input to normalize; skipping");
            return Ok(RewriteResult::Declined);
        };
        let name = format!("{}/MVN_", pool0.name());

        let producer = graph.get(input.node)?;
        tracing::info!(producer.op = %producer.op(), producer.name = %producer.name(), "found LayerNorm pattern");

        let mvn = graph.add_node(
            NodeSpec::builder()
                .op("MVN")
                .name(name)
                .attrs(attrs! { "eps" => MVN_EPS, "across_channels" => 0, "normalize_variance" => 1 })
                .build(),
        )?;
        graph.connect(mvn.input(0), input)?;
        graph.set_source(m["div"].output(0), mvn.output(0))?;
        graph.transfer_output(m["div"], mvn)?;
        Ok(RewriteResult::Rewritten)
    }
}
