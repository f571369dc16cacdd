//! Rewrite rules.
//!
//! A rule pairs a [`Pattern`] with a replacement function and tells the
//! scheduler when it may run. Passes with their own state implement [`Rule`]
//! directly; one-off rules wrap a closure in [`FnRule`].

use std::fmt;

use splice_ir::{Graph, Match, Pattern, RewriteResult};

use crate::config::RunParams;

/// A pattern-directed graph rewrite.
pub trait Rule: fmt::Debug {
    /// Unique name, used for ordering constraints, run-time disabling and logs.
    fn name(&self) -> &str;

    fn pattern(&self) -> &Pattern;

    /// Rewrite one match. Errors abort the scheduling round without rollback.
    fn replace(&self, graph: &mut Graph, m: &Match) -> splice_ir::Result<RewriteResult>;

    /// Static switch; disabled rules never run.
    fn enabled(&self) -> bool {
        true
    }

    /// Whether the rule applies to this run at all.
    fn is_applicable(&self, _params: &RunParams) -> bool {
        true
    }

    /// Rules that must run before this one within a round.
    fn run_after(&self) -> &[String] {
        &[]
    }

    /// Rules that must run after this one within a round.
    fn run_before(&self) -> &[String] {
        &[]
    }
}

type ReplaceFn = dyn Fn(&mut Graph, &Match) -> splice_ir::Result<RewriteResult>;
type ConditionFn = dyn Fn(&RunParams) -> bool;

/// Rule built from a closure.
///
/// ```
/// use splice_ir::prelude::*;
/// use splice_schedule::{FnRule, Rule};
///
/// let pattern = Pattern::builder("sqrt").node("x", Predicate::op("Sqrt")).build().unwrap();
/// let rule = FnRule::new("NoopSqrt", pattern, |_, _| Ok(RewriteResult::Declined)).after("LayerNorm");
/// assert_eq!(rule.run_after(), ["LayerNorm".to_string()]);
/// ```
pub struct FnRule {
    name: String,
    pattern: Pattern,
    replace: Box<ReplaceFn>,
    condition: Option<Box<ConditionFn>>,
    enabled: bool,
    after: Vec<String>,
    before: Vec<String>,
}

impl FnRule {
    pub fn new<F>(name: impl Into<String>, pattern: Pattern, replace: F) -> Self
    where
        F: Fn(&mut Graph, &Match) -> splice_ir::Result<RewriteResult> + 'static,
    {
        Self {
            name: name.into(),
            pattern,
            replace: Box::new(replace),
            condition: None,
            enabled: true,
            after: Vec::new(),
            before: Vec::new(),
        }
    }

    /// Only run when `condition` holds for the run parameters.
    pub fn when<C>(mut self, condition: C) -> Self
    where
        C: Fn(&RunParams) -> bool + 'static,
    {
        self.condition = Some(Box::new(condition));
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn after(mut self, rule: impl Into<String>) -> Self {
        self.after.push(rule.into());
        self
    }

    pub fn before(mut self, rule: impl Into<String>) -> Self {
        self.before.push(rule.into());
        self
    }
}

impl fmt::Debug for FnRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.name())
            .field("enabled", &self.enabled)
            .field("conditional", &self.condition.is_some())
            .field("after", &self.after)
            .field("before", &self.before)
            .finish()
    }
}

impl Rule for FnRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn replace(&self, graph: &mut Graph, m: &Match) -> splice_ir::Result<RewriteResult> {
        (self.replace)(graph, m)
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn is_applicable(&self, params: &RunParams) -> bool {
        self.condition.as_ref().is_none_or(|condition| condition(params))
    }

    fn run_after(&self) -> &[String] {
        &self.after
    }

    fn run_before(&self) -> &[String] {
        &self.before
    }
}
