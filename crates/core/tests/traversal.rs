use std::collections::{BTreeMap, HashMap};

use weave_core::analysis::{
    build_query, propagate_callee_names, run_traversal, substitute_identifier, visit_order,
    AnsweredFunction, HintTable, Namer, NamerError, NamingAnswer, OracleNamer, ReplayNamer,
    Traversal, TraversalOptions,
};
use weave_core::model::{build_program, Candidate, Function, HintRecord, Program, RawFunctionRecord};

fn raw(name: &str, body: &str, vars: &[(&str, &str)], funcs: &[(&str, &str)]) -> RawFunctionRecord {
    let map = |pairs: &[(&str, &str)]| -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    };
    RawFunctionRecord {
        func_name: Some(name.to_string()),
        body: Some(body.to_string()),
        var_id_maps: Some(map(vars)),
        func_id_maps: Some(map(funcs)),
        callees: None,
    }
}

/// sub_A calls sub_B, sub_B calls sub_C; sub_D has nothing to ask.
fn chain_program() -> Program {
    build_program(
        "prog1_chain.jsonl",
        vec![
            raw("sub_C", "void sub_C() { }", &[], &[("sub_C", "init")]),
            raw(
                "sub_B",
                "int sub_B(int a1) { sub_C(); return a1; }",
                &[("a1", "value")],
                &[("sub_B", "helper"), ("sub_C", "init")],
            ),
            raw(
                "sub_A",
                "int sub_A() { int v1 = 0; return sub_B(v1); }",
                &[("v1", "count")],
                &[("sub_A", "main_loop"), ("sub_B", "helper")],
            ),
            raw("sub_D", "void sub_D() { }", &[], &[]),
        ],
    )
    .expect("chain program")
}

fn recorded(func_name: &str, proposals: &[(&str, &str)]) -> AnsweredFunction {
    AnsweredFunction {
        prog_name: "prog1_chain.jsonl".into(),
        func_name: func_name.into(),
        func_body: String::new(),
        rename_map: BTreeMap::new(),
        var_id_maps: BTreeMap::new(),
        func_id_maps: BTreeMap::new(),
        proposals: proposals
            .iter()
            .map(|(id, name)| (id.to_string(), vec![Candidate::new(*name, 0.9)]))
            .collect(),
    }
}

#[test]
fn visit_order_is_leaf_first_with_stable_ties() {
    let program = chain_program();
    let order: Vec<(&str, usize)> = visit_order(&program);
    assert_eq!(order, vec![("sub_C", 0), ("sub_D", 0), ("sub_B", 1), ("sub_A", 1)]);
}

#[test]
fn substitution_respects_identifier_boundaries() {
    assert_eq!(substitute_identifier("x = a1 + a10;", "a1", "count"), "x = count + a10;");
    assert_eq!(substitute_identifier("sub_1(sub_10, xsub_1)", "sub_1", "f"), "f(sub_10, xsub_1)");
    assert_eq!(substitute_identifier("unchanged", "", "f"), "unchanged");
}

#[test]
fn propagation_skips_self_and_unknown_callees() {
    let function = Function::new("sub_B", "sub_B() { sub_C(); sub_E(); }")
        .with_func("sub_B", "helper")
        .with_func("sub_C", "init")
        .with_func("sub_E", "cleanup");
    let known: HashMap<String, String> = [
        ("sub_B".to_string(), "helper".to_string()),
        ("sub_C".to_string(), "init".to_string()),
    ]
    .into_iter()
    .collect();

    let propagated = propagate_callee_names(&function, &known);
    assert_eq!(propagated.body, "sub_B() { init(); sub_E(); }");
    assert_eq!(propagated.rename_map.get("init").map(String::as_str), Some("sub_C"));
    assert!(!propagated.func_id_maps.contains_key("sub_C"));
    assert!(propagated.func_id_maps.contains_key("sub_B"));
    assert!(propagated.func_id_maps.contains_key("sub_E"));
    // The original is untouched.
    assert!(function.func_id_maps.contains_key("sub_C"));
}

#[test]
fn oracle_traversal_propagates_resolved_callees() {
    let program = chain_program();
    let namer = OracleNamer::from_programs([&program]);
    let outcome = run_traversal(&program, &namer, None, &TraversalOptions::default());

    let order: Vec<&str> = outcome.answered.iter().map(|a| a.func_name.as_str()).collect();
    assert_eq!(order, vec!["sub_C", "sub_B", "sub_A"]);
    assert_eq!(outcome.skipped, 1);
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.learned_names, 3);

    let sub_b = &outcome.answered[1];
    assert_eq!(sub_b.func_body, "int sub_B(int a1) { init(); return a1; }");
    assert!(!sub_b.func_id_maps.contains_key("sub_C"));
    assert_eq!(sub_b.proposals["a1"][0].name(), "value");

    let sub_a = &outcome.answered[2];
    assert!(sub_a.func_body.contains("helper(v1)"));
    assert_eq!(sub_a.rename_map.get("helper").map(String::as_str), Some("sub_B"));
}

#[test]
fn cyclic_calls_are_visited_once_without_early_substitution() {
    let program = build_program(
        "prog2_cycle.jsonl",
        vec![
            raw(
                "sub_1",
                "void sub_1() { sub_2(); }",
                &[],
                &[("sub_1", "ping"), ("sub_2", "pong")],
            ),
            raw(
                "sub_2",
                "void sub_2() { sub_1(); }",
                &[],
                &[("sub_2", "pong"), ("sub_1", "ping")],
            ),
        ],
    )
    .expect("cycle program");
    assert_eq!(program.call_graph.node_count(), 2);
    assert_eq!(visit_order(&program), vec![("sub_1", 1), ("sub_2", 1)]);

    let namer = OracleNamer::from_programs([&program]);
    let outcome = run_traversal(&program, &namer, None, &TraversalOptions::default());
    let order: Vec<&str> = outcome.answered.iter().map(|a| a.func_name.as_str()).collect();
    assert_eq!(order, vec!["sub_1", "sub_2"]);
    assert!(outcome.failures.is_empty());

    // sub_2 is still unnamed when sub_1 is asked about.
    assert_eq!(outcome.answered[0].func_body, "void sub_1() { sub_2(); }");
    assert!(outcome.answered[0].rename_map.is_empty());
    assert_eq!(outcome.answered[1].func_body, "void sub_2() { ping(); }");
    assert_eq!(outcome.answered[1].rename_map.get("ping").map(String::as_str), Some("sub_1"));
}

#[test]
fn propagation_can_be_disabled() {
    let program = chain_program();
    let namer = OracleNamer::from_programs([&program]);
    let options = TraversalOptions { propagate: false, ..TraversalOptions::default() };
    let outcome = run_traversal(&program, &namer, None, &options);

    assert!(outcome.answered.iter().all(|a| a.rename_map.is_empty()));
    assert!(outcome.answered[1].func_body.contains("sub_C();"));
}

#[test]
fn missing_answers_are_reported_and_traversal_continues() {
    let program = chain_program();
    let namer = ReplayNamer::from_answers(vec![recorded("sub_A", &[("v1", "counter")])]);
    let outcome = run_traversal(&program, &namer, None, &TraversalOptions::default());

    assert_eq!(outcome.answered.len(), 1);
    assert_eq!(outcome.answered[0].func_name, "sub_A");
    assert_eq!(outcome.failures.len(), 2);
    assert!(matches!(
        &outcome.failures[0],
        NamerError::NoAnswer { func_name, .. } if func_name == "sub_C"
    ));
    // sub_B was never named, so nothing reaches sub_A's body.
    assert!(outcome.answered[0].func_body.contains("sub_B(v1)"));
}

#[test]
fn sentinel_answers_are_not_propagated() {
    let program = chain_program();
    let namer = ReplayNamer::from_answers(vec![
        recorded("sub_C", &[("sub_C", "<unk>")]),
        recorded("sub_B", &[("sub_B", "do_work"), ("a1", "value")]),
        recorded("sub_A", &[]),
    ]);
    let outcome = run_traversal(&program, &namer, None, &TraversalOptions::default());

    assert_eq!(outcome.learned_names, 1);
    assert!(outcome.answered[1].func_body.contains("sub_C();"));
    assert!(outcome.answered[2].func_body.contains("do_work(v1)"));
}

#[test]
fn replay_keeps_first_recording_and_filters_to_asked_ids() {
    let namer = ReplayNamer::from_answers(vec![
        recorded("sub_B", &[("a1", "first"), ("zz", "never_asked")]),
        recorded("sub_B", &[("a1", "second")]),
    ]);
    assert_eq!(namer.len(), 1);

    let program = chain_program();
    let function = program.function("sub_B").expect("sub_B");
    let query = build_query(&program.prog_name, function, None, &TraversalOptions::default());
    let answer = namer.propose(&query).expect("recorded");
    assert_eq!(answer.top("a1"), Some("first"));
    assert!(answer.proposals.get("zz").is_none());
}

#[test]
fn query_caps_identifiers_and_body() {
    let function = Function::new("sub_1", "abcdefghij")
        .with_var("v1", "a")
        .with_var("v2", "b")
        .with_func("sub_1", "f");
    let options = TraversalOptions { max_ids: 2, max_body_chars: 4, ..TraversalOptions::default() };
    let query = build_query("p", &function, Some("Hints from callers: []"), &options);

    assert_eq!(query.identifiers, vec!["v1", "v2"]);
    assert_eq!(query.body, "abcd");
    assert_eq!(query.hints.as_deref(), Some("Hints from callers: []"));
}

#[test]
fn hints_are_attached_when_present() {
    let program = chain_program();
    let namer = OracleNamer::from_programs([&program]);
    let table = HintTable::from_records(vec![HintRecord {
        prog_name: "prog1_chain.jsonl".into(),
        func_name: "sub_B".into(),
        hints: "Hints from callers: [count]".into(),
    }]);
    let outcome = run_traversal(&program, &namer, Some(&table), &TraversalOptions::default());
    assert_eq!(outcome.answered.len(), 3);
}

#[test]
fn step_traversal_learns_first_writer_and_ignores_sentinels() {
    let program = chain_program();
    let mut traversal = Traversal::new(&program, TraversalOptions::default());
    assert_eq!(traversal.order().collect::<Vec<_>>(), vec!["sub_C", "sub_D", "sub_B", "sub_A"]);

    let first = traversal.next_function().expect("sub_C");
    assert_eq!(first.func_name, "sub_C");
    let empty =
        NamingAnswer::new().with_proposal("sub_C", vec![Candidate::new("<emptyname>", 1.0)]);
    assert!(!traversal.record_answer("sub_C", &empty));
    let named = NamingAnswer::new().with_proposal("sub_C", vec![Candidate::new("setup", 1.0)]);
    assert!(traversal.record_answer("sub_C", &named));
    let renamed = NamingAnswer::new().with_proposal("sub_C", vec![Candidate::new("other", 1.0)]);
    assert!(!traversal.record_answer("sub_C", &renamed));
    assert_eq!(traversal.known_names().get("sub_C").map(String::as_str), Some("setup"));

    traversal.next_function().expect("sub_D");
    let sub_b = traversal.next_function().expect("sub_B");
    assert!(sub_b.body.contains("setup();"));
    traversal.next_function().expect("sub_A");
    assert!(traversal.next_function().is_none());
}
