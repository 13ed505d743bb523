use relprop::{
    facts::{analyze, Analysis, Batch, Facts, SimpleFact},
    oracle, Domain, Error, Options,
};

// ------------------------------------------------------------------
// Helpers

fn run(json: &str) -> Analysis {
    let facts = Facts::from_json(json).unwrap();
    analyze(&facts, &Options::default()).unwrap()
}

/// Printed `VarPointsTo` facts, sorted.
fn listing(analysis: &Analysis) -> Vec<String> {
    let mut lines: Vec<String> = analysis
        .state
        .points_to()
        .iter()
        .map(|pt| analysis.symbols.show_points_to(pt))
        .collect();
    lines.sort();
    lines
}

/// Every fact passes the last filter, and the result is the one the
/// reference evaluation finds for the transitions in effect.
fn check(analysis: &Analysis) {
    let filter = analysis.state.context_filter();
    for pt in analysis.state.points_to() {
        assert!(filter.contains(&[pt.var_ctx.0, pt.obj_ctx.0]), "{pt}");
    }
    let expected = oracle::analysis(&analysis.pag, &analysis.transitions()).unwrap();
    assert_eq!(&expected.var_points_to, analysis.state.var_points_to());
    assert_eq!(&expected.field_points_to, analysis.state.field_points_to());
}

// ------------------------------------------------------------------
// Tests

#[test]
fn batches_run_in_order() {
    let analysis = run(r#"
        [
          { "alloc": [{ "var": "p", "obj": "new A" }],
            "simple": [{ "src": "p", "dst": "q" }] },
          { "alloc": [{ "var": "n", "obj": "new B" }],
            "store": [{ "src": "n", "dst": "q", "field": "next" }],
            "load": [{ "base": "p", "field": "next", "dst": "r" }] }
        ]
    "#);
    assert_eq!(
        vec!["n --> new B", "p --> new A", "q --> new A", "r --> new B"],
        listing(&analysis)
    );
    let fields: Vec<String> = analysis
        .state
        .field_points_to_facts()
        .iter()
        .map(|fpt| analysis.symbols.show_field_points_to(fpt))
        .collect();
    assert_eq!(vec!["new A.next --> new B"], fields);
    assert_eq!(analysis.state.var_points_to(), analysis.state.emitted());
}

#[test]
fn transitions_make_the_run_context_sensitive() {
    let analysis = run(r#"
        { "alloc": [
            { "var": "x", "var-ctx": "main", "obj": "o", "obj-ctx": "main" },
            { "var": "y", "var-ctx": "f", "obj": "o", "obj-ctx": "main" }
          ],
          "transitions": [{ "var-ctx": "main", "obj-ctx": "main" }] }
    "#);
    assert_eq!(vec!["x@main --> o@main"], listing(&analysis));
    assert_eq!(Some(1), analysis.symbols.lookup(Domain::Context, "f"));
}

#[test]
fn insensitive_without_transitions() {
    let analysis = run(r#"
        { "alloc": [{ "var": "y", "var-ctx": "f", "obj": "o", "obj-ctx": "main" }] }
    "#);
    assert_eq!(vec!["y@f --> o@main"], listing(&analysis));
}

#[test]
fn late_transitions_keep_earlier_pairs() {
    let analysis = run(r#"
        [
          { "alloc": [{ "var": "y", "var-ctx": "f", "obj": "o", "obj-ctx": "main" }] },
          { "transitions": [{ "var-ctx": "main", "obj-ctx": "main" }] },
          { "alloc": [{ "var": "z", "var-ctx": "g", "obj": "o", "obj-ctx": "main" }] }
        ]
    "#);
    assert_eq!(vec!["y@f --> o@main"], listing(&analysis));
    assert!(analysis.transitions().contains(&[1, 0]));
    assert_eq!(4, analysis.transitions().len());
    check(&analysis);
}

#[test]
fn allocations_wait_for_their_transition() {
    let mut analysis = Analysis::new();
    let opts = Options::default();
    let first = Facts::from_json(
        r#"
        { "alloc": [{ "var": "y", "var-ctx": "f", "obj": "o", "obj-ctx": "main" }],
          "simple": [{ "src": "y", "src-ctx": "f", "dst": "w", "dst-ctx": "f" }],
          "transitions": [{ "var-ctx": "main", "obj-ctx": "main" }] }
    "#,
    )
    .unwrap();
    analysis.run_batch(&first.batches()[0], &opts).unwrap();
    assert!(listing(&analysis).is_empty());
    assert_eq!(1, analysis.state.rejected_allocs().len());
    check(&analysis);

    let second = Facts::from_json(r#"{ "transitions": [{ "var-ctx": "f", "obj-ctx": "main" }] }"#)
        .unwrap();
    analysis.run_batch(&second.batches()[0], &opts).unwrap();
    assert_eq!(vec!["w@f --> o@main", "y@f --> o@main"], listing(&analysis));
    assert!(analysis.state.rejected_allocs().is_empty());
    check(&analysis);
}

#[test]
fn declared_types_are_loaded() {
    let analysis = run(r#"
        { "alloc": [{ "var": "a", "obj": "A" }, { "var": "a", "obj": "B" }],
          "types": [{ "var": "a", "obj": "A" }] }
    "#);
    assert_eq!(vec!["a --> A"], listing(&analysis));
}

#[test]
fn step_limit_surfaces() {
    let facts = Facts::from_json(r#"{ "alloc": [{ "var": "p", "obj": "o" }] }"#).unwrap();
    let opts = Options {
        max_steps: Some(1),
        ..Options::default()
    };
    assert_eq!(
        Error::StepLimit { steps: 1 },
        analyze(&facts, &opts).unwrap_err()
    );
}

#[test]
fn batches_can_be_fed_one_at_a_time() {
    let mut analysis = Analysis::new();
    let opts = Options::default();
    let first = Batch {
        simple: vec![SimpleFact {
            src: "p".to_string(),
            dst: "q".to_string(),
            ..SimpleFact::default()
        }],
        ..Batch::default()
    };
    analysis.run_batch(&first, &opts).unwrap();
    assert!(analysis.state.points_to().is_empty());
    assert!(analysis.queue.is_empty());

    let second = Facts::from_json(r#"{ "alloc": [{ "var": "p", "obj": "o" }] }"#).unwrap();
    analysis.run_batch(&second.batches()[0], &opts).unwrap();
    assert_eq!(vec!["p --> o", "q --> o"], listing(&analysis));
    assert_eq!(1, analysis.queue.batches().len());
}

#[test]
fn malformed_facts_are_rejected() {
    assert!(Facts::from_json(r#"{ "alloc": [{ "obj": "o" }] }"#).is_err());
    assert!(Facts::from_json("[1, 2]").is_err());
    assert!(Facts::from_json(r#"[{ "allocs": [{ "var": "p", "obj": "o" }] }]"#).is_err());
}
