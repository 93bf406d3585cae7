use pretty_assertions::assert_eq;

use predicate::{compile, CallFactory, CompileConfig, CompileError, Stage};

use crate::common::{compiled, rooted, Host};

fn compile_with(exprs: &[&str], config: &CompileConfig) -> Result<predicate::Compiled, CompileError> {
    let mut graph = rooted(exprs);
    compile(&mut graph, &CallFactory::standard(), &Host, config)
}

fn messages(err: &CompileError) -> Vec<String> {
    err.diagnostics().iter().map(ToString::to_string).collect()
}

#[test]
fn equivalent_rules_share_one_root_node() {
    let compiled = compiled(&[
        "(and (true) (field 'a'))",
        "(field 'a')",
        "(or (field 'b') (field 'c'))",
        "(or (field 'c') (field 'b'))",
    ]);
    let program = &compiled.program;
    assert_eq!(program.roots().len(), 4);
    assert_eq!(program.root(0), program.root(1));
    assert_eq!(program.root(2), program.root(3));
    assert_eq!(
        program.expression(program.root(2).unwrap()).unwrap(),
        "(or (field 'b') (field 'c'))"
    );
    // field a, 'a', or, field b, field c, 'b', 'c'
    assert_eq!(program.len(), 7);
    assert!(compiled.diagnostics.is_empty());
}

#[test]
fn transform_can_be_disabled() {
    let config = CompileConfig::default().with_transform(false);
    let compiled = compile_with(&["(and (true) (field 'a'))"], &config).unwrap();
    assert_eq!(compiled.program.len(), 4);
}

#[test]
fn constant_rules_fold_to_literals() {
    let compiled = compiled(&["(not (and (false) (field 'a')))", "(or (false) (false))"]);
    let program = &compiled.program;
    let expressions: Vec<_> = program
        .roots()
        .iter()
        .map(|r| program.expression(*r).unwrap())
        .collect();
    assert_eq!(expressions, vec!["''", ":"]);
}

#[test]
fn malformed_expressions_fail_validation() {
    let err = compile_with(
        &["(not (field 'a') (field 'b'))", "(waitPhase 'LUNCH' (field 'a'))"],
        &CompileConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        CompileError::Stage {
            stage: Stage::Validation,
            errors: 2,
            ..
        }
    ));
    assert_eq!(
        messages(&err),
        vec![
            "error: (not (field 'a') (field 'b')): not expects exactly 1 child, got 2",
            "error: (waitPhase 'LUNCH' (field 'a')): waitPhase names unknown phase LUNCH",
        ]
    );
}

#[test]
fn unresolved_names_fail_pre_evaluation() {
    let err = compile_with(
        &[
            "(operator 'nope' 'x' (field 'a'))",
            "(operator 'streq' '' (field 'a'))",
        ],
        &CompileConfig::default(),
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "pre-evaluation failed with 2 error(s)"
    );
    assert_eq!(
        messages(&err),
        vec![
            "error: (operator 'nope' 'x' (field 'a')): no operator named nope",
            "error: (operator 'streq' '' (field 'a')): cannot create streq: empty parameter",
        ]
    );
}

#[test]
fn error_limit_caps_stored_diagnostics() {
    let config = CompileConfig::default().with_error_limit(1);
    let err = compile_with(&["(not)", "(true 'x')", "(and (field 'a'))"], &config).unwrap_err();
    assert!(matches!(err, CompileError::Stage { errors: 3, .. }));
    assert_eq!(err.diagnostics().len(), 1);
}

#[test]
fn transform_pass_limit_is_enforced() {
    let config = CompileConfig::default().with_max_transform_passes(1);
    let err = compile_with(&["(not (true))"], &config).unwrap_err();
    assert_eq!(err, CompileError::TransformLimit(1));
    assert_eq!(
        err.to_string(),
        "graph still changing after 1 transform passes"
    );
}

#[test]
fn self_checked_graph_compiles() {
    let config = CompileConfig::default().with_self_check(true);
    let mut graph = rooted(&["(and (field 'a') (not (field 'a')))"]);
    compile(&mut graph, &CallFactory::standard(), &Host, &config).unwrap();
    assert_eq!(graph.validation_report(), Vec::<String>::new());

    let report = graph.debug_report();
    assert!(report.contains("Roots:"));
    assert!(report.contains("digraph"));
}
