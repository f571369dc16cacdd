//! Fixed-point rule scheduling.
//!
//! A round runs every active rule once, in registry order. For each rule the
//! matcher gathers matches according to the configured [`ScanMode`] and the
//! rewrite engine applies them in matcher order. Dead nodes are collected
//! after every round when configured. The schedule converges on the first
//! round that applies no rewrite.

use std::collections::HashSet;

use snafu::{ResultExt, ensure};
use splice_ir::{Graph, Match, NodeId, RewriteEngine, RewriteOutcome};

use crate::config::{RunParams, ScanMode, SchedulerConfig};
use crate::dce::eliminate_dead_nodes;
use crate::error::{GraphSnafu, NonTerminationSnafu, Result, RewriteSnafu, RuleNonTerminationSnafu};
use crate::registry::RuleRegistry;
use crate::rule::Rule;

/// One applied rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRecord {
    pub rule: String,
    /// 1-based round the rewrite was applied in.
    pub round: usize,
    /// Slot bindings in pattern declaration order.
    pub bindings: Vec<(String, NodeId)>,
    /// Nodes the replacement created that were still present afterwards.
    pub created: Vec<NodeId>,
}

/// Summary of a scheduling run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    /// Rounds run, including the final zero-rewrite round of a converged run.
    pub rounds: usize,
    /// Applied rewrites per round, in round order.
    pub rewrites_per_round: Vec<usize>,
    pub records: Vec<RewriteRecord>,
    /// Matches skipped because an earlier rewrite broke them.
    pub skipped: usize,
    /// Matches whose replacement declined to rewrite.
    pub declined: usize,
    /// Nodes removed by dead-node elimination.
    pub removed: usize,
}

impl ScheduleReport {
    pub fn total_rewrites(&self) -> usize {
        self.rewrites_per_round.iter().sum()
    }

    /// Rewrites applied by the named rule.
    pub fn rewrites_by(&self, rule: &str) -> usize {
        self.records.iter().filter(|record| record.rule == rule).count()
    }
}

/// Applies registered rules to a graph until nothing changes.
#[derive(Debug)]
pub struct Scheduler {
    config: SchedulerConfig,
    params: RunParams,
    registry: RuleRegistry,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, params: RunParams) -> Self {
        Self { config, params, registry: RuleRegistry::new() }
    }

    /// Scheduler configured entirely from environment variables.
    pub fn from_env() -> Self {
        Self::new(SchedulerConfig::from_env(), RunParams::from_env())
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn params(&self) -> &RunParams {
        &self.params
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn register(&mut self, rule: impl Rule + 'static) -> Result<()> {
        self.registry.register(rule)
    }

    /// Run rounds until one applies no rewrite.
    ///
    /// Fails with `NonTermination` if all `max_rounds` rounds applied at least
    /// one rewrite. Replacement failures abort immediately; the graph keeps
    /// every change made up to that point.
    #[tracing::instrument(skip_all, fields(max_rounds = self.config.max_rounds, scan_mode = %self.config.scan_mode))]
    pub fn run_to_fixpoint(&self, graph: &mut Graph) -> Result<ScheduleReport> {
        let rules = self.registry.active(&self.params)?;
        let mut report = ScheduleReport::default();

        for round in 1..=self.config.max_rounds {
            if self.round(graph, &rules, round, &mut report)? == 0 {
                tracing::info!(rounds = round, rewrites = report.total_rewrites(), "fixed point reached");
                return Ok(report);
            }
        }

        tracing::warn!(max_rounds = self.config.max_rounds, rewrites = report.total_rewrites(), "no fixed point reached");
        NonTerminationSnafu { max_rounds: self.config.max_rounds }.fail()
    }

    /// Run exactly one round, whether or not it changes the graph.
    #[tracing::instrument(skip_all, fields(scan_mode = %self.config.scan_mode))]
    pub fn run_once(&self, graph: &mut Graph) -> Result<ScheduleReport> {
        let rules = self.registry.active(&self.params)?;
        let mut report = ScheduleReport::default();
        self.round(graph, &rules, 1, &mut report)?;
        Ok(report)
    }

    fn round(&self, graph: &mut Graph, rules: &[&dyn Rule], round: usize, report: &mut ScheduleReport) -> Result<usize> {
        let engine = RewriteEngine::with_verification(self.config.verify);
        let mut applied = 0;
        for &rule in rules {
            let count = match self.config.scan_mode {
                ScanMode::Snapshot => self.apply_snapshot(&engine, graph, rule, round, report)?,
                ScanMode::Rescan => self.apply_rescan(&engine, graph, rule, round, report)?,
            };
            if count > 0 {
                tracing::debug!(rule = %rule.name(), round, rewrites = count, "rule applied");
            }
            applied += count;
        }

        let removed = if self.config.eliminate_dead_nodes { eliminate_dead_nodes(graph).context(GraphSnafu)? } else { 0 };
        report.rounds = round;
        report.rewrites_per_round.push(applied);
        report.removed += removed;
        tracing::info!(round, rewrites = applied, removed, nodes = graph.len(), "round finished");
        Ok(applied)
    }

    /// Apply every match of a single scan.
    fn apply_snapshot(
        &self,
        engine: &RewriteEngine,
        graph: &mut Graph,
        rule: &dyn Rule,
        round: usize,
        report: &mut ScheduleReport,
    ) -> Result<usize> {
        let matches: Vec<Match> = rule.pattern().matches(graph).collect();
        tracing::trace!(rule = %rule.name(), matches = matches.len(), "snapshot scan");

        let mut applied = 0;
        for m in &matches {
            if self.apply_match(engine, graph, rule, m, round, report)? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Re-scan after every rewrite, taking the first binding not tried yet
    /// this round.
    fn apply_rescan(
        &self,
        engine: &RewriteEngine,
        graph: &mut Graph,
        rule: &dyn Rule,
        round: usize,
        report: &mut ScheduleReport,
    ) -> Result<usize> {
        let limit = self.config.max_rewrites_per_rule;
        let mut tried: HashSet<Vec<NodeId>> = HashSet::new();
        let mut applied = 0;

        loop {
            let next = rule.pattern().matches(graph).find(|m| !tried.contains(m.nodes()));
            let Some(m) = next else { break };
            ensure!(applied < limit, RuleNonTerminationSnafu { rule: rule.name(), limit });

            tried.insert(m.nodes().to_vec());
            if self.apply_match(engine, graph, rule, &m, round, report)? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Returns whether the match was applied.
    fn apply_match(
        &self,
        engine: &RewriteEngine,
        graph: &mut Graph,
        rule: &dyn Rule,
        m: &Match,
        round: usize,
        report: &mut ScheduleReport,
    ) -> Result<bool> {
        let outcome = engine
            .apply(graph, rule.pattern(), m, |graph, m| rule.replace(graph, m))
            .context(RewriteSnafu { rule: rule.name() })?;

        match outcome {
            RewriteOutcome::Applied { created } => {
                tracing::debug!(rule = %rule.name(), round, bindings = ?m.nodes(), created = ?created, "rewrite applied");
                report.records.push(RewriteRecord {
                    rule: rule.name().to_string(),
                    round,
                    bindings: m.iter().map(|(slot, node)| (slot.to_string(), node)).collect(),
                    created,
                });
                Ok(true)
            }
            RewriteOutcome::Declined => {
                report.declined += 1;
                Ok(false)
            }
            RewriteOutcome::Stale { .. } | RewriteOutcome::Invalidated => {
                report.skipped += 1;
                Ok(false)
            }
        }
    }
}
