use pretty_assertions::assert_eq;
use rayon::prelude::*;

use predicate::{EvalError, EvalState, Phase, Value, ValueList, CAPTURE_NAME};

use crate::common::{compiled, Txn};

fn header(name: &str, text: &str) -> Value {
    Value::string(text).with_name(name)
}

#[test]
fn rule_matches_per_transaction() {
    let compiled = compiled(&["(operator 'streq' 'GET' (field 'REQUEST_METHOD'))"]);
    let program = &compiled.program;
    let root = program.root(0).unwrap();

    let get = Txn::at(Phase::RequestHeader).with("REQUEST_METHOD", Value::string("GET"));
    let mut state = EvalState::new(program);
    let values = state.final_values(root, &get).unwrap().to_vec();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].name(), CAPTURE_NAME);

    let post = Txn::at(Phase::RequestHeader).with("REQUEST_METHOD", Value::string("POST"));
    let mut state = EvalState::new(program);
    assert!(state.final_values(root, &post).unwrap().is_empty());
}

#[test]
fn wait_phase_holds_until_its_phase() {
    let compiled = compiled(&["(waitPhase 'REQUEST_HEADER' (field 'X'))"]);
    let program = &compiled.program;
    let root = program.root(0).unwrap();
    let mut state = EvalState::new(program);

    let connect = Txn::at(Phase::None).with("X", Value::string("x"));
    state.eval(root, &connect).unwrap();
    assert!(!state.is_finished(root));
    assert_eq!(state.len(root), 0);

    let headers = Txn::at(Phase::RequestHeader).with("X", Value::string("x"));
    state.eval(root, &headers).unwrap();
    assert!(state.is_finished(root));
    assert_eq!(state.values(root).to_vec(), vec![Value::string("x")]);
}

#[test]
fn root_never_reaching_its_phase_stays_pending() {
    let compiled = compiled(&["(waitPhase 'RESPONSE_HEADER' (field 'X'))"]);
    let program = &compiled.program;
    let root = program.root(0).unwrap();
    let mut state = EvalState::new(program);

    for phase in [Phase::RequestHeader, Phase::RequestBody, Phase::Postprocess] {
        let txn = Txn::at(phase).with("X", Value::string("x"));
        assert!(matches!(
            state.final_values(root, &txn),
            Err(EvalError::Pending { .. })
        ));
    }
}

#[test]
fn and_short_circuits_on_a_falsy_child() {
    let compiled = compiled(&[
        "(and (field 'a') (waitPhase 'RESPONSE_BODY' (field 'b')))",
    ]);
    let program = &compiled.program;
    let root = program.root(0).unwrap();
    let mut state = EvalState::new(program);

    state.eval(root, &Txn::at(Phase::RequestHeader)).unwrap();
    assert!(state.is_finished(root));
    assert!(state.values(root).is_empty());
}

#[test]
fn lowercased_header_matches_across_phases() {
    let compiled = compiled(&[
        "(finishPhase 'REQUEST_BODY' (operator 'contains' 'gzip' (transformation 'lowercase' (ask 'accept-encoding' (field 'HEADERS')))))",
    ]);
    let program = &compiled.program;
    let root = program.root(0).unwrap();
    let headers = ValueList::open(vec![header("Host", "example.com")]);
    let mut state = EvalState::new(program);

    let txn = Txn::at(Phase::RequestHeader).with("HEADERS", Value::list(headers.clone()));
    state.eval(root, &txn).unwrap();
    assert_eq!(state.decision(root), None);

    headers
        .push(header("Accept-Encoding", "GZIP, deflate"))
        .unwrap();
    state.eval(root, &txn).unwrap();
    assert_eq!(state.decision(root), Some(true));
    assert!(!state.is_finished(root));

    let body = Txn::at(Phase::RequestBody).with("HEADERS", Value::list(headers.clone()));
    state.eval(root, &body).unwrap();
    assert!(state.is_finished(root));
    assert_eq!(state.len(root), 1);
}

#[test]
fn aliased_field_sees_host_appends() {
    let compiled = compiled(&["(field 'ARGS')"]);
    let program = &compiled.program;
    let root = program.root(0).unwrap();
    let args = ValueList::new();
    let txn = Txn::at(Phase::RequestHeader).with("ARGS", Value::list(args.clone()));
    let mut state = EvalState::new(program);

    state.eval(root, &txn).unwrap();
    assert_eq!(state.decision(root), None);

    args.push(header("id", "1")).unwrap();
    assert_eq!(state.len(root), 1);
    assert_eq!(state.decision(root), Some(true));

    assert!(args.finish());
    assert!(state.is_finished(root));
    assert!(!args.finish());
}

#[test]
fn one_program_serves_concurrent_transactions() {
    let compiled = compiled(&[
        "(operator 'streq' 'GET' (field 'REQUEST_METHOD'))",
        "(not (operator 'streq' 'GET' (field 'REQUEST_METHOD')))",
    ]);
    let program = &compiled.program;
    let get = program.root(0).unwrap();
    let not_get = program.root(1).unwrap();

    let results: Vec<(bool, bool)> = (0..256_u32)
        .into_par_iter()
        .map(|i| {
            let method = if i % 4 == 0 { "GET" } else { "POST" };
            let txn = Txn::at(Phase::RequestHeader).with("REQUEST_METHOD", Value::string(method));
            let mut state = EvalState::new(program);
            state.eval(get, &txn).unwrap();
            state.eval(not_get, &txn).unwrap();
            (
                state.decision(get).unwrap(),
                state.decision(not_get).unwrap(),
            )
        })
        .collect();

    assert_eq!(results.iter().filter(|(hit, _)| *hit).count(), 64);
    assert!(results.iter().all(|(hit, miss)| hit != miss));
}
