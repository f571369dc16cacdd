use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Every one of `max_rounds` rounds applied at least one rewrite.
    #[snafu(display("no fixed point reached within {max_rounds} rounds"))]
    NonTermination { max_rounds: usize },

    /// A single rule kept rewriting past its per-round ceiling in rescan mode.
    #[snafu(display("rule `{rule}` applied {limit} rewrites in one round without running out of matches"))]
    RuleNonTermination { rule: String, limit: usize },

    #[snafu(display("rule `{name}` is already registered"))]
    DuplicateRule { name: String },

    /// `run_after` / `run_before` constraints form a cycle among these rules.
    #[snafu(display("rule ordering constraints form a cycle among {rules:?}"))]
    DependencyCycle { rules: Vec<String> },

    /// A replacement function failed. Graph changes it made before failing are kept.
    #[snafu(display("rule `{rule}` failed: {source}"))]
    Rewrite { rule: String, source: splice_ir::Error },

    #[snafu(display("graph operation failed: {source}"))]
    Graph { source: splice_ir::Error },
}
