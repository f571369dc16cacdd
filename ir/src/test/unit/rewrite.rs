use crate::error::Error;
use crate::pattern::{Pattern, Predicate, RewriteResult, first_match};
use crate::rewrite::{RewriteEngine, RewriteOutcome, apply_rewrite};
use crate::{Graph, NodeId, attrs};

/// `Parameter -> Sqrt -> Sqrt -> Result`
fn double_sqrt() -> (Graph, [NodeId; 4]) {
    let mut graph = Graph::new();
    let x = graph.create_node("Parameter", attrs! {}).unwrap();
    let s0 = graph.create_node("Sqrt", attrs! {}).unwrap();
    let s1 = graph.create_node("Sqrt", attrs! {}).unwrap();
    let out = graph.create_node("Result", attrs! {}).unwrap();
    graph.connect(s0.input(0), x.output(0)).unwrap();
    graph.connect(s1.input(0), s0.output(0)).unwrap();
    graph.connect(out.input(0), s1.output(0)).unwrap();
    graph.mark_output(out).unwrap();
    (graph, [x, s0, s1, out])
}

fn sqrt_sqrt() -> Pattern {
    Pattern::builder("sqrt-sqrt")
        .node("inner", Predicate::op("Sqrt"))
        .node("outer", Predicate::op("Sqrt"))
        .edge("inner", "outer")
        .build()
        .unwrap()
}

#[test]
fn test_apply_reports_created_nodes() {
    let (mut graph, [x, s0, s1, out]) = double_sqrt();
    let pattern = sqrt_sqrt();
    let m = first_match(&pattern, &graph).unwrap();

    let outcome = apply_rewrite(&mut graph, &pattern, &m, |g, m| {
        let src = g.node(m["inner"]).and_then(|n| n.source(0)).unwrap();
        let half = g.create_node("Const", attrs! { "value" => 0.25 })?;
        let pow = g.create_node("Pow", attrs! {})?;
        g.connect(pow.input(0), src)?;
        g.connect(pow.input(1), half.output(0))?;
        g.set_source(m["outer"].output(0), pow.output(0))?;
        Ok(RewriteResult::Rewritten)
    })
    .unwrap();

    let created = match outcome {
        RewriteOutcome::Applied { created } => created,
        other => panic!("expected Applied, got {other:?}"),
    };
    assert_eq!(created.len(), 2);
    assert!(created.iter().all(|id| *id > out));

    // Matched nodes are left in place, only detached from the output.
    assert!(graph.contains(s0) && graph.contains(s1));
    assert!(graph.consumers(s1.output(0)).is_empty());
    assert_eq!(graph.source(out.input(0)).map(|p| p.node), Some(created[1]));
    assert_eq!(graph.source(created[1].input(0)), Some(x.output(0)));
}

#[test]
fn test_declined_leaves_graph_untouched() {
    let (mut graph, _) = double_sqrt();
    let before = graph.clone();
    let pattern = sqrt_sqrt();
    let m = first_match(&pattern, &graph).unwrap();

    let outcome = apply_rewrite(&mut graph, &pattern, &m, |_, _| Ok(RewriteResult::Declined)).unwrap();
    assert_eq!(outcome, RewriteOutcome::Declined);
    assert_eq!(graph.node_ids().collect::<Vec<_>>(), before.node_ids().collect::<Vec<_>>());
}

#[test]
fn test_stale_match_never_invokes_replacement() {
    let (mut graph, [_, s0, s1, out]) = double_sqrt();
    let pattern = sqrt_sqrt();
    let m = first_match(&pattern, &graph).unwrap();

    graph.remove_nodes(&[s1, out]).unwrap();
    let outcome = apply_rewrite(&mut graph, &pattern, &m, |_, _| panic!("replacement must not run")).unwrap();
    assert_eq!(outcome, RewriteOutcome::Stale { slot: "outer".into(), node: s1 });
    assert!(graph.contains(s0));
}

#[test]
fn test_invalidated_match_never_invokes_replacement() {
    let (mut graph, [x, _, s1, _]) = double_sqrt();
    let pattern = sqrt_sqrt();
    let m = first_match(&pattern, &graph).unwrap();

    graph.connect(s1.input(0), x.output(0)).unwrap();
    let outcome = apply_rewrite(&mut graph, &pattern, &m, |_, _| panic!("replacement must not run")).unwrap();
    assert_eq!(outcome, RewriteOutcome::Invalidated);
}

#[test]
fn test_replacement_error_propagates_without_rollback() {
    let (mut graph, [_, _, _, out]) = double_sqrt();
    let pattern = sqrt_sqrt();
    let m = first_match(&pattern, &graph).unwrap();
    let len = graph.len();

    let err = apply_rewrite(&mut graph, &pattern, &m, |g, _| {
        g.create_node("Const", attrs! {})?;
        g.remove_node(out.input(0).node)?;
        g.remove_node(NodeId(99))?;
        Ok(RewriteResult::Rewritten)
    })
    .unwrap_err();

    assert_eq!(err, Error::NodeNotFound { id: NodeId(99) });
    // The Const survives and the Result is gone: nothing is undone.
    assert_eq!(graph.len(), len);
    assert!(!graph.contains(out));
}

#[test]
fn test_verification_can_be_disabled() {
    let engine = RewriteEngine::with_verification(false);
    assert!(!engine.verifies());
    assert!(RewriteEngine::default().verifies());

    let (mut graph, _) = double_sqrt();
    let pattern = sqrt_sqrt();
    let m = first_match(&pattern, &graph).unwrap();
    let outcome = engine.apply(&mut graph, &pattern, &m, |_, _| Ok(RewriteResult::Rewritten)).unwrap();
    assert_eq!(outcome, RewriteOutcome::Applied { created: vec![] });
}
