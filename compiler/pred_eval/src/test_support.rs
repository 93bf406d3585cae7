//! Host doubles and graph builders shared by the unit tests.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use pred_diagnostic::Reporter;
use pred_ir::{CallKind, Literal, MergeGraph, NodeId, Phase, Value};

use crate::{
    Context, Environment, FieldSlot, OperatorFactory, OperatorInstance, Outcome, Program,
    ResolutionError, Transformation,
};

/// `streq`, `fail` and `broken` operators; `lowercase` and `boom`
/// transformations; `SLOTTED` lives in slot 7.
pub struct TestEnv;

impl Environment for TestEnv {
    fn field_slot(&self, name: &str) -> Option<FieldSlot> {
        (name == "SLOTTED").then_some(FieldSlot(7))
    }

    fn operator(&self, name: &str) -> Result<Arc<dyn OperatorFactory>, ResolutionError> {
        match name {
            "streq" => Ok(Arc::new(StrEqFactory)),
            "fail" => Ok(Arc::new(FailFactory)),
            "broken" => Ok(Arc::new(BrokenFactory)),
            _ => Err(ResolutionError::not_found("operator", name)),
        }
    }

    fn transformation(&self, name: &str) -> Result<Arc<dyn Transformation>, ResolutionError> {
        match name {
            "lowercase" => Ok(Arc::new(Lowercase)),
            "boom" => Ok(Arc::new(Boom)),
            _ => Err(ResolutionError::not_found("transformation", name)),
        }
    }
}

struct StrEqFactory;

impl OperatorFactory for StrEqFactory {
    fn create(&self, params: &str) -> Result<Arc<dyn OperatorInstance>, String> {
        Ok(Arc::new(StrEq(params.to_owned())))
    }
}

/// Matches string inputs equal to its parameter and captures the input.
struct StrEq(String);

impl OperatorInstance for StrEq {
    fn execute(&self, _context: &dyn Context, input: &Value) -> Result<Outcome, String> {
        if input.as_str() == Some(self.0.as_str()) {
            Ok(Outcome::Hit(vec![input.clone()]))
        } else {
            Ok(Outcome::Miss)
        }
    }
}

struct FailFactory;

impl OperatorFactory for FailFactory {
    fn create(&self, _params: &str) -> Result<Arc<dyn OperatorInstance>, String> {
        Ok(Arc::new(Fail))
    }
}

struct Fail;

impl OperatorInstance for Fail {
    fn execute(&self, _context: &dyn Context, _input: &Value) -> Result<Outcome, String> {
        Err("always fails".to_owned())
    }
}

struct BrokenFactory;

impl OperatorFactory for BrokenFactory {
    fn create(&self, params: &str) -> Result<Arc<dyn OperatorInstance>, String> {
        Err(format!("bad parameters {params}"))
    }
}

struct Lowercase;

impl Transformation for Lowercase {
    fn execute(&self, input: &Value) -> Result<Value, String> {
        let text = input.as_str().ok_or("not a string")?;
        Ok(Value::string(&text.to_lowercase()).with_name(input.name()))
    }
}

struct Boom;

impl Transformation for Boom {
    fn execute(&self, _input: &Value) -> Result<Value, String> {
        Err("boom".to_owned())
    }
}

/// A transaction: a phase and a field store.
pub struct TestCtx {
    pub phase: Phase,
    pub fields: FxHashMap<String, Value>,
}

impl TestCtx {
    pub fn new(phase: Phase) -> Self {
        TestCtx {
            phase,
            fields: FxHashMap::default(),
        }
    }

    pub fn with_field(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_owned(), value);
        self
    }
}

impl Context for TestCtx {
    fn phase(&self) -> Phase {
        self.phase
    }

    fn field_by_name(&self, name: &str) -> Result<Option<Value>, String> {
        if name == "OFFLINE" {
            return Err("store offline".to_owned());
        }
        Ok(self.fields.get(name).cloned())
    }

    fn field_by_slot(&self, slot: FieldSlot) -> Result<Option<Value>, String> {
        match slot {
            FieldSlot(7) => Ok(self.fields.get("SLOTTED").cloned()),
            FieldSlot(n) => Err(format!("no slot {n}")),
        }
    }
}

pub fn s(graph: &mut MergeGraph, text: &str) -> NodeId {
    graph.literal(Literal::string(text)).unwrap()
}

pub fn call(graph: &mut MergeGraph, kind: CallKind, children: &[NodeId]) -> NodeId {
    graph.call(kind, children).unwrap()
}

pub fn field(graph: &mut MergeGraph, name: &str) -> NodeId {
    let name = s(graph, name);
    call(graph, CallKind::Field, &[name])
}

pub fn operator(graph: &mut MergeGraph, name: &str, params: &str, input: NodeId) -> NodeId {
    let name = s(graph, name);
    let params = s(graph, params);
    call(graph, CallKind::Operator, &[name, params, input])
}

/// Phase gate (`WaitPhase` or `FinishPhase`) around `input`.
pub fn gate(graph: &mut MergeGraph, kind: CallKind, phase: &str, input: NodeId) -> NodeId {
    let phase = s(graph, phase);
    call(graph, kind, &[phase, input])
}

/// Root each expression in order and finalize, expecting no diagnostics.
pub fn program(graph: &mut MergeGraph, roots: &[NodeId]) -> Program {
    for &root in roots {
        graph.add_root(root).unwrap();
    }
    let mut reporter = Reporter::new();
    let program = Program::finalize(graph, &TestEnv, &mut reporter);
    assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());
    program
}
