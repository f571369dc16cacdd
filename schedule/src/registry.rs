//! Rule registry and rule ordering.

use std::collections::{BTreeSet, HashMap};

use snafu::ensure;

use crate::config::RunParams;
use crate::error::{DependencyCycleSnafu, DuplicateRuleSnafu, Result};
use crate::rule::Rule;

/// Registered rules in registration order.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. Names must be unique.
    pub fn register(&mut self, rule: impl Rule + 'static) -> Result<()> {
        self.register_boxed(Box::new(rule))
    }

    pub fn register_boxed(&mut self, rule: Box<dyn Rule>) -> Result<()> {
        let name = rule.name();
        ensure!(!self.rules.iter().any(|r| r.name() == name), DuplicateRuleSnafu { name });
        tracing::debug!(rule = %name, pattern = %rule.pattern().name(), "rule registered");
        self.rules.push(rule);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Rule> {
        self.rules.iter().find(|r| r.name() == name).map(|r| r.as_ref())
    }

    /// Rule names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.rules.iter().map(|r| r.name())
    }

    /// Every rule, ordered so that `run_after` / `run_before` constraints
    /// hold. Among rules whose constraints are satisfied, the one registered
    /// first goes first. Constraints naming unregistered rules are ignored.
    pub fn ordered(&self) -> Result<Vec<&dyn Rule>> {
        let index: HashMap<&str, usize> = self.rules.iter().enumerate().map(|(i, r)| (r.name(), i)).collect();
        let mut successors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); self.rules.len()];

        for (i, rule) in self.rules.iter().enumerate() {
            for (dep, forward) in rule.run_after().iter().map(|d| (d, false)).chain(rule.run_before().iter().map(|d| (d, true))) {
                let Some(&j) = index.get(dep.as_str()) else {
                    tracing::warn!(rule = %rule.name(), dependency = %dep, "ignoring ordering constraint on unknown rule");
                    continue;
                };
                if forward {
                    successors[i].insert(j);
                } else {
                    successors[j].insert(i);
                }
            }
        }

        let mut pending = vec![0usize; self.rules.len()];
        for next in successors.iter().flatten() {
            pending[*next] += 1;
        }

        let mut ready: BTreeSet<usize> = (0..self.rules.len()).filter(|i| pending[*i] == 0).collect();
        let mut order = Vec::with_capacity(self.rules.len());
        while let Some(i) = ready.pop_first() {
            order.push(i);
            for &next in &successors[i] {
                pending[next] -= 1;
                if pending[next] == 0 {
                    ready.insert(next);
                }
            }
        }

        if order.len() < self.rules.len() {
            let rules: Vec<String> = (0..self.rules.len())
                .filter(|i| pending[*i] > 0)
                .map(|i| self.rules[i].name().to_string())
                .collect();
            return DependencyCycleSnafu { rules }.fail();
        }
        Ok(order.into_iter().map(|i| self.rules[i].as_ref()).collect())
    }

    /// Ordered rules that are enabled, not disabled by name, and applicable to `params`.
    pub fn active(&self, params: &RunParams) -> Result<Vec<&dyn Rule>> {
        let mut active = self.ordered()?;
        active.retain(|rule| {
            let keep = rule.enabled() && !params.is_rule_disabled(rule.name()) && rule.is_applicable(params);
            if !keep {
                tracing::debug!(rule = %rule.name(), "rule inactive for this run");
            }
            keep
        });
        Ok(active)
    }
}
