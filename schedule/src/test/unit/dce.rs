//! Dead-node elimination.

use splice_ir::{Graph, NodeId, attrs};

use crate::dce::eliminate_dead_nodes;

/// `x → a → out` plus a dead branch `x → d1 → d2` and a lone constant.
fn graph_with_dead_branch() -> (Graph, [NodeId; 6]) {
    let mut graph = Graph::new();
    let x = graph.create_node("Parameter", attrs! {}).unwrap();
    let a = graph.create_node("Sqrt", attrs! {}).unwrap();
    let d1 = graph.create_node("Sqrt", attrs! {}).unwrap();
    let d2 = graph.create_node("Sqrt", attrs! {}).unwrap();
    let lone = graph.create_node("Const", attrs! {}).unwrap();
    let out = graph.create_node("Result", attrs! {}).unwrap();

    graph.connect(a.input(0), x.output(0)).unwrap();
    graph.connect(d1.input(0), x.output(0)).unwrap();
    graph.connect(d2.input(0), d1.output(0)).unwrap();
    graph.connect(out.input(0), a.output(0)).unwrap();
    graph.mark_output(out).unwrap();
    (graph, [x, a, d1, d2, lone, out])
}

#[test]
fn test_removes_nodes_that_reach_no_output() {
    let (mut graph, [x, a, d1, d2, lone, out]) = graph_with_dead_branch();

    assert_eq!(eliminate_dead_nodes(&mut graph).unwrap(), 3);
    assert_eq!(graph.len(), 3);
    for id in [d1, d2, lone] {
        assert!(!graph.contains(id));
    }
    for id in [x, a, out] {
        assert!(graph.contains(id));
    }
    // The shared producer no longer lists the removed consumer.
    assert_eq!(graph.consumers(x.output(0)), &[a.input(0)]);
    graph.validate().unwrap();
}

#[test]
fn test_second_pass_is_a_no_op() {
    let (mut graph, _) = graph_with_dead_branch();
    eliminate_dead_nodes(&mut graph).unwrap();
    assert_eq!(eliminate_dead_nodes(&mut graph).unwrap(), 0);
}

#[test]
fn test_graph_without_outputs_is_untouched() {
    let (mut graph, [.., out]) = graph_with_dead_branch();
    graph.unmark_output(out);

    assert_eq!(eliminate_dead_nodes(&mut graph).unwrap(), 0);
    assert_eq!(graph.len(), 6);
}

#[test]
fn test_every_output_keeps_its_inputs() {
    let (mut graph, [x, a, d1, d2, lone, out]) = graph_with_dead_branch();
    graph.mark_output(d2).unwrap();

    assert_eq!(eliminate_dead_nodes(&mut graph).unwrap(), 1);
    assert!(!graph.contains(lone));
    for id in [x, a, d1, d2, out] {
        assert!(graph.contains(id));
    }
}

#[test]
fn test_unconnected_input_does_not_kill_consumer() {
    let mut graph = Graph::new();
    let add = graph.create_node("Add", attrs! {}).unwrap();
    let out = graph.create_node("Result", attrs! {}).unwrap();
    graph.connect(out.input(0), add.output(0)).unwrap();
    graph.mark_output(out).unwrap();

    assert_eq!(eliminate_dead_nodes(&mut graph).unwrap(), 0);
    assert_eq!(graph.len(), 2);
}
