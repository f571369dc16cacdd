//! Scheduler configuration types.
//!
//! Provides typed configuration for rule scheduling with bon builders.
//! Supports both explicit configuration and environment variable fallbacks.

use std::collections::BTreeSet;

use bon::bon;

// ============================================================================
// RUN PARAMETERS
// ============================================================================

/// Parameters of one optimization run, read by rule applicability checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunParams {
    /// Experimental IR generation is requested. Gates the normalization fusions.
    pub experimental_ir: bool,
    /// Rules switched off for this run by name.
    pub disabled_rules: BTreeSet<String>,
    /// Free-form feature flags for out-of-tree rules.
    pub flags: BTreeSet<String>,
}

#[bon]
impl RunParams {
    /// Create run parameters with builder pattern.
    #[builder]
    pub fn builder(
        #[builder(default = false)] experimental_ir: bool,
        #[builder(default)] disabled_rules: BTreeSet<String>,
        #[builder(default)] flags: BTreeSet<String>,
    ) -> Self {
        Self { experimental_ir, disabled_rules, flags }
    }

    /// Create run parameters from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `SPLICE_EXPERIMENTAL_IR` - Enable experimental IR generation if set
    /// * `SPLICE_DISABLE_RULES` - Comma separated rule names to skip
    /// * `SPLICE_FLAGS` - Comma separated feature flags
    pub fn from_env() -> Self {
        let experimental_ir = std::env::var("SPLICE_EXPERIMENTAL_IR").is_ok();
        let disabled_rules = std::env::var("SPLICE_DISABLE_RULES").map(|s| split_list(&s)).unwrap_or_default();
        let flags = std::env::var("SPLICE_FLAGS").map(|s| split_list(&s)).unwrap_or_default();

        Self { experimental_ir, disabled_rules, flags }
    }

    /// Switch off a rule by name.
    pub fn disable_rule(mut self, name: impl Into<String>) -> Self {
        self.disabled_rules.insert(name.into());
        self
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.insert(flag.into());
        self
    }

    pub fn is_rule_disabled(&self, name: &str) -> bool {
        self.disabled_rules.contains(name)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.flags.contains(name)
    }
}

fn split_list(raw: &str) -> BTreeSet<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

// ============================================================================
// SCAN MODE
// ============================================================================

/// How a rule's matches are gathered within one round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ScanMode {
    /// Scan once per rule per round and apply every match of that scan in
    /// matcher order. Matches broken by earlier rewrites of the same scan are
    /// skipped; newly created opportunities wait for the next round.
    #[default]
    Snapshot,

    /// Re-scan after every applied rewrite and apply the first match not yet
    /// tried this round, until the rule has nothing left to apply. New
    /// opportunities are taken within the same round.
    Rescan,
}

// ============================================================================
// SCHEDULER CONFIGURATION
// ============================================================================

/// Top-level scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Round ceiling for [`Scheduler::run_to_fixpoint`](crate::Scheduler::run_to_fixpoint).
    pub max_rounds: usize,
    /// Match gathering strategy.
    pub scan_mode: ScanMode,
    /// Remove nodes that cannot reach an output after every round.
    pub eliminate_dead_nodes: bool,
    /// Validate graph invariants after every applied rewrite.
    pub verify: bool,
    /// Per-rule, per-round rewrite ceiling in [`ScanMode::Rescan`].
    pub max_rewrites_per_rule: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_rounds: 100,
            scan_mode: ScanMode::Snapshot,
            eliminate_dead_nodes: true,
            verify: true,
            max_rewrites_per_rule: 10_000,
        }
    }
}

#[bon]
impl SchedulerConfig {
    /// Create a scheduler configuration with builder pattern.
    #[builder]
    pub fn builder(
        #[builder(default = 100)] max_rounds: usize,
        #[builder(default)] scan_mode: ScanMode,
        #[builder(default = true)] eliminate_dead_nodes: bool,
        #[builder(default = true)] verify: bool,
        #[builder(default = 10_000)] max_rewrites_per_rule: usize,
    ) -> Self {
        Self { max_rounds, scan_mode, eliminate_dead_nodes, verify, max_rewrites_per_rule }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `SPLICE_MAX_ROUNDS` - Round ceiling (default: 100)
    /// * `SPLICE_SCAN_MODE` - `snapshot` or `rescan` (default: snapshot)
    /// * `SPLICE_NO_DCE` - Skip dead-node elimination between rounds if set
    /// * `SPLICE_NO_VERIFY` - Skip graph validation after rewrites if set
    pub fn from_env() -> Self {
        let max_rounds = std::env::var("SPLICE_MAX_ROUNDS").ok().and_then(|s| s.parse().ok()).unwrap_or(100);
        let scan_mode = std::env::var("SPLICE_SCAN_MODE").ok().and_then(|s| s.parse().ok()).unwrap_or_default();
        let eliminate_dead_nodes = std::env::var("SPLICE_NO_DCE").is_err();
        let verify = std::env::var("SPLICE_NO_VERIFY").is_err();

        Self { max_rounds, scan_mode, eliminate_dead_nodes, verify, ..Default::default() }
    }
}

// ============================================================================
// TESTS
// ============================================================================
