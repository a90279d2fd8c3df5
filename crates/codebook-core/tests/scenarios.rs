//! scenarios.rs
//!
//! End-to-end flows through the public API, from raw node rows and unit
//! records to progress and feedback:
//! - a two-node annotation codebook sorts unchanged and rejects re-parenting
//!   its phase under its own task
//! - repeated fields unfold into one question each
//! - gold conditionals turn wrong and right answers into retry / applaud
//! - unit completion moves the session pointer

use assert_matches::assert_matches;
use serde_json::json;

use codebook_core::prelude::*;
use codebook_core::model::{ActionKind, Condition, UnitField};

fn nodes(value: serde_json::Value) -> Vec<CodebookNode> {
    serde_json::from_value(value).unwrap()
}

fn two_node_codebook() -> Vec<CodebookNode> {
    nodes(json!([
        {"id": 1, "parentId": null, "position": 0, "name": "annotate", "data": {"type": "Annotation phase"}},
        {"id": 2, "parentId": 1, "position": 0, "name": "actors", "data": {"type": "Annotation task", "task": {"type": "span", "codes": [{"code": "politician"}]}}}
    ]))
}

#[test]
fn sorting_a_contiguous_codebook_keeps_positions() {
    let input = two_node_codebook();
    let sorted = sort_nested(&input).unwrap();

    let shape: Vec<(NodeId, usize, usize)> = sorted.iter().map(|n| (n.id(), n.level, n.children)).collect();
    assert_eq!(shape, vec![(1, 0, 1), (2, 1, 0)]);
    for (before, after) in input.iter().zip(&sorted) {
        assert_eq!(before.position, after.node.position);
    }

    let mut copy = input.clone();
    assert!(reindex_positions(&mut copy, ReindexScope::All).is_empty());
}

#[test]
fn parenting_a_phase_under_its_task_is_rejected() {
    let input = two_node_codebook();
    assert!(detects_cycle(&input, 1, Some(2)));

    let mut tree = CodebookTree::new(input.clone(), TreeLimits::default()).unwrap();
    assert_matches!(tree.move_node(1, Some(2), None), Err(CodebookError::Cycle { node_id: 1 }));
    assert_eq!(tree.nodes(), input.as_slice());

    let mut cyclic = input;
    cyclic[0].parent_id = Some(2);
    assert_matches!(sort_nested(&cyclic), Err(CodebookError::Cycle { .. }));
}

#[test]
fn per_field_question_unfolds_over_repeated_fields() {
    let raw = nodes(json!([
        {"id": 1, "parentId": null, "position": 0, "name": "code", "data": {"type": "Annotation phase"}},
        {"id": 2, "parentId": 1, "position": 0, "name": "topic", "data": {"type": "Question", "question": "Topic?", "perField": ["comment"]}}
    ]));
    let codebook = build_codebook(&raw, &TreeLimits::default()).unwrap();

    let unit = Unit::new("u1", UnitType::Code)
        .with_field(UnitField::text("comment.1", "first"))
        .with_field(UnitField::text("comment.2", "second"))
        .with_field(UnitField::text("headline", "title"));

    let instances = unfold_questions(&codebook.phases[0].variables, &unit);
    let scopes: Vec<Vec<String>> = instances.iter().map(|i| i.fields.clone().unwrap()).collect();
    assert_eq!(scopes, vec![vec!["comment.1".to_string()], vec!["comment.2".to_string()]]);
}

fn stance_gold_unit() -> Unit {
    let mut unit = Unit::new("gold", UnitType::Train);
    unit.conditionals = vec![Conditional {
        variable: "stance".into(),
        conditions: vec![Condition::new("pro")],
        on_success: None,
        on_fail: Some(ActionKind::Retry),
        damage: Some(5.0),
        message: None,
    }];
    unit
}

#[test]
fn wrong_gold_answer_asks_for_retry() {
    let report = evaluate_conditions(
        &stance_gold_unit(),
        &[Annotation::unit("a", "stance").with_value("con")],
        &ConditionDefaults::default(),
    );
    assert_eq!(report.evaluation["stance"].action, Some(ActionKind::Retry));
    assert_eq!(report.damage.damage, 5.0);

    let mut ledger = DamageLedger::new(0.0, Some(4.0));
    assert_eq!(ledger.record(&report).game_over, Some(true));
}

#[test]
fn right_gold_answer_is_applauded() {
    let report = evaluate_conditions(
        &stance_gold_unit(),
        &[Annotation::unit("a", "stance").with_value("pro")],
        &ConditionDefaults::default(),
    );
    assert_eq!(report.evaluation["stance"].action, Some(ActionKind::Applaud));
    assert_eq!(report.damage.damage, 0.0);
    assert!(!report.blocks_progress());
}

#[test]
fn third_unit_is_current_after_two_are_done() {
    let raw = nodes(json!([
        {"id": 7, "parentId": null, "position": 0, "name": "code", "data": {"type": "Annotation phase", "label": "Coding"}},
        {"id": 8, "parentId": 7, "position": 0, "name": "topic", "data": {"type": "Question"}}
    ]));
    let codebook = build_codebook(&raw, &TreeLimits::default()).unwrap();
    let progress = UnitProgress::default().with_phase(7, vec![true, true, false]);

    let state = compute_progress(&codebook, &[], &progress, Rules::default()).unwrap();
    assert_eq!(state.phases[0].current_unit, 2);
    assert!(!state.phases[0].done);
    assert_eq!(state.phases[0].label, "Coding");
    assert_eq!(state.current, Pointer::new(0, 2, 0));
}

#[test]
fn progress_state_serializes_camel_case() {
    let raw = nodes(json!([
        {"id": 1, "parentId": null, "position": 0, "name": "intro", "data": {"type": "Survey phase"}},
        {"id": 2, "parentId": 1, "position": 0, "name": "age", "data": {"type": "Question", "questionType": "inputs"}}
    ]));
    let codebook = build_codebook(&raw, &TreeLimits::default()).unwrap();
    let state = compute_progress(&codebook, &[], &UnitProgress::default(), Rules::default()).unwrap();

    let v = serde_json::to_value(&state).unwrap();
    assert_eq!(v["phases"][0]["phaseId"], 1);
    assert_eq!(v["phases"][0]["type"], "survey");
    assert_eq!(v["settings"]["canGoBack"], true);
    assert_eq!(v["phases"][0]["variables"][0]["label"], "age");
}
