//! Round semantics, scan modes and failure propagation.

use std::cell::RefCell;
use std::rc::Rc;

use splice_ir::{Graph, NodeId, Pattern, Predicate, RewriteResult, attrs};
use test_case::test_case;

use crate::config::{RunParams, ScanMode, SchedulerConfig};
use crate::error::Error;
use crate::rule::FnRule;
use crate::scheduler::Scheduler;

/// `x → s1 → s2 → s3 → out`, all `s` being `Sqrt`.
fn sqrt_chain() -> (Graph, NodeId, NodeId) {
    let mut graph = Graph::new();
    let x = graph.create_node("Parameter", attrs! {}).unwrap();
    let mut prev = x;
    for _ in 0..3 {
        let s = graph.create_node("Sqrt", attrs! {}).unwrap();
        graph.connect(s.input(0), prev.output(0)).unwrap();
        prev = s;
    }
    let out = graph.create_node("Result", attrs! {}).unwrap();
    graph.connect(out.input(0), prev.output(0)).unwrap();
    graph.mark_output(out).unwrap();
    (graph, x, out)
}

fn sqrt_pair() -> Pattern {
    Pattern::builder("sqrt-pair")
        .node("inner", Predicate::op("Sqrt"))
        .node("outer", Predicate::op("Sqrt"))
        .edge("inner", "outer")
        .build()
        .unwrap()
}

/// Replaces `Sqrt(Sqrt(v))` with a fresh `Sqrt(v)`. The new node can pair up
/// with whatever `Sqrt` follows, so every rewrite creates a new match.
fn merge_sqrt_pair() -> FnRule {
    FnRule::new("MergeSqrt", sqrt_pair(), |graph, m| {
        let Some(src) = graph.source(m["inner"].input(0)) else { return Ok(RewriteResult::Declined) };
        let merged = graph.create_node("Sqrt", attrs! {})?;
        graph.connect(merged.input(0), src)?;
        graph.set_source(m["outer"].output(0), merged.output(0))?;
        Ok(RewriteResult::Rewritten)
    })
}

fn single_sqrt() -> Pattern {
    Pattern::builder("sqrt").node("s", Predicate::op("Sqrt")).build().unwrap()
}

fn scheduler(config: SchedulerConfig) -> Scheduler {
    Scheduler::new(config, RunParams::default())
}

// ============================================================================
// Scan modes
// ============================================================================

#[test_case(ScanMode::Snapshot, vec![1, 1, 0], 1 ; "snapshot_defers_new_matches")]
#[test_case(ScanMode::Rescan, vec![2, 0], 0 ; "rescan_takes_new_matches")]
fn test_scan_modes(mode: ScanMode, per_round: Vec<usize>, skipped: usize) {
    let (mut graph, x, out) = sqrt_chain();
    let mut scheduler = scheduler(SchedulerConfig::builder().scan_mode(mode).build());
    scheduler.register(merge_sqrt_pair()).unwrap();

    let report = scheduler.run_to_fixpoint(&mut graph).unwrap();
    assert_eq!(report.rewrites_per_round, per_round);
    assert_eq!(report.rounds, per_round.len());
    assert_eq!(report.skipped, skipped);

    // Either way the chain ends as x → Sqrt → out.
    assert_eq!(graph.len(), 3);
    let last = graph.source(out.input(0)).unwrap().node;
    assert_eq!(graph.node(last).unwrap().op(), "Sqrt");
    assert_eq!(graph.source(last.input(0)), Some(x.output(0)));
}

#[test]
fn test_rescan_ceiling() {
    let mut graph = Graph::new();
    let x = graph.create_node("Parameter", attrs! {}).unwrap();
    let s = graph.create_node("Sqrt", attrs! {}).unwrap();
    graph.connect(s.input(0), x.output(0)).unwrap();

    // Every rewrite adds a node the pattern matches.
    let grow = FnRule::new("Grow", single_sqrt(), |graph, _| {
        graph.create_node("Sqrt", attrs! {})?;
        Ok(RewriteResult::Rewritten)
    });
    let config = SchedulerConfig::builder().scan_mode(ScanMode::Rescan).max_rewrites_per_rule(5).build();
    let mut scheduler = scheduler(config);
    scheduler.register(grow).unwrap();

    let err = scheduler.run_to_fixpoint(&mut graph).unwrap_err();
    assert_eq!(err, Error::RuleNonTermination { rule: "Grow".into(), limit: 5 });
}

#[test]
fn test_rescan_tries_each_declined_binding_once() {
    let (mut graph, _, _) = sqrt_chain();
    let calls = Rc::new(RefCell::new(0usize));
    let seen = Rc::clone(&calls);
    let decline = FnRule::new("Decline", single_sqrt(), move |_, _| {
        *seen.borrow_mut() += 1;
        Ok(RewriteResult::Declined)
    });
    let mut scheduler = scheduler(SchedulerConfig::builder().scan_mode(ScanMode::Rescan).build());
    scheduler.register(decline).unwrap();

    let report = scheduler.run_to_fixpoint(&mut graph).unwrap();
    assert_eq!(report.rounds, 1);
    assert_eq!(report.declined, 3);
    assert_eq!(*calls.borrow(), 3);
}

// ============================================================================
// Termination
// ============================================================================

#[test]
fn test_always_rewriting_rule_does_not_terminate() {
    let (mut graph, _, _) = sqrt_chain();
    let mut scheduler = scheduler(SchedulerConfig::default());
    scheduler.register(FnRule::new("Spin", single_sqrt(), |_, _| Ok(RewriteResult::Rewritten))).unwrap();

    let err = scheduler.run_to_fixpoint(&mut graph).unwrap_err();
    assert_eq!(err, Error::NonTermination { max_rounds: 100 });
}

#[test]
fn test_zero_max_rounds() {
    let (mut graph, _, _) = sqrt_chain();
    let err = scheduler(SchedulerConfig::builder().max_rounds(0).build()).run_to_fixpoint(&mut graph).unwrap_err();
    assert_eq!(err, Error::NonTermination { max_rounds: 0 });
}

#[test]
fn test_no_rules_converges_immediately() {
    let (mut graph, _, _) = sqrt_chain();
    let report = scheduler(SchedulerConfig::default()).run_to_fixpoint(&mut graph).unwrap();
    assert_eq!(report.rounds, 1);
    assert_eq!(report.rewrites_per_round, vec![0]);
}

#[test]
fn test_run_once_runs_a_single_round() {
    let (mut graph, _, _) = sqrt_chain();
    let mut scheduler = scheduler(SchedulerConfig::default());
    scheduler.register(FnRule::new("Spin", single_sqrt(), |_, _| Ok(RewriteResult::Rewritten))).unwrap();

    let report = scheduler.run_once(&mut graph).unwrap();
    assert_eq!(report.rounds, 1);
    assert_eq!(report.total_rewrites(), 3);
    assert_eq!(report.rewrites_by("Spin"), 3);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_failing_rule_propagates_without_rollback() {
    let (mut graph, _, out) = sqrt_chain();
    let before = graph.len();
    let fail = FnRule::new("Fail", single_sqrt(), move |graph, m| {
        graph.create_node("Const", attrs! {})?;
        // Still consumed by the next node in the chain.
        graph.remove_node(m["s"])?;
        Ok(RewriteResult::Rewritten)
    });
    let mut scheduler = scheduler(SchedulerConfig::default());
    scheduler.register(fail).unwrap();

    let err = scheduler.run_to_fixpoint(&mut graph).unwrap_err();
    match err {
        Error::Rewrite { rule, source: splice_ir::Error::DanglingReference { .. } } => assert_eq!(rule, "Fail"),
        other => panic!("expected a DanglingReference rewrite failure, got {other:?}"),
    }
    // The Const created before the failure is still there; dead-node elimination never ran.
    assert_eq!(graph.len(), before + 1);
    assert_eq!(graph.nodes_by_op("Const").count(), 1);
    assert!(graph.contains(out));
}

// ============================================================================
// Rule selection
// ============================================================================

fn recording(name: &'static str, log: &Rc<RefCell<Vec<&'static str>>>) -> FnRule {
    let log = Rc::clone(log);
    FnRule::new(name, single_sqrt(), move |_, _| {
        log.borrow_mut().push(name);
        Ok(RewriteResult::Declined)
    })
}

#[test]
fn test_rules_run_in_order_within_a_round() {
    let mut graph = Graph::new();
    graph.create_node("Sqrt", attrs! {}).unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));

    let mut scheduler = scheduler(SchedulerConfig::default());
    scheduler.register(recording("first", &log)).unwrap();
    scheduler.register(recording("second", &log).before("first")).unwrap();
    scheduler.register(recording("third", &log)).unwrap();
    scheduler.run_to_fixpoint(&mut graph).unwrap();

    assert_eq!(*log.borrow(), vec!["second", "first", "third"]);
}

#[test]
fn test_inactive_rules_never_run() {
    let mut graph = Graph::new();
    graph.create_node("Sqrt", attrs! {}).unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));

    let params = RunParams::default().with_flag("fast").disable_rule("by-name");
    let mut scheduler = Scheduler::new(SchedulerConfig::default(), params);
    scheduler.register(recording("disabled", &log).disabled()).unwrap();
    scheduler.register(recording("by-name", &log)).unwrap();
    scheduler.register(recording("needs-slow", &log).when(|params| params.flag("slow"))).unwrap();
    scheduler.register(recording("needs-fast", &log).when(|params| params.flag("fast"))).unwrap();
    scheduler.run_to_fixpoint(&mut graph).unwrap();

    assert_eq!(*log.borrow(), vec!["needs-fast"]);
}
