//! Shared test utilities.

use std::iter::Peekable;
use std::str::Chars;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use predicate::{
    compile, CallFactory, CompileConfig, Compiled, Context, Environment, Literal, MergeGraph,
    NodeId, OperatorFactory, OperatorInstance, Outcome, Phase, ResolutionError, Transformation,
    Value,
};

/// Build a loose expression from its canonical text.
pub fn parse(graph: &mut MergeGraph, text: &str) -> NodeId {
    let mut reader = Reader {
        chars: text.chars().peekable(),
    };
    let id = reader.expr(graph);
    reader.skip_ws();
    assert!(reader.chars.peek().is_none(), "trailing input in {text}");
    id
}

struct Reader<'a> {
    chars: Peekable<Chars<'a>>,
}

impl Reader<'_> {
    fn skip_ws(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    fn token(&mut self) -> String {
        let mut token = String::new();
        while let Some(c) = self
            .chars
            .next_if(|c| !c.is_whitespace() && *c != '(' && *c != ')')
        {
            token.push(c);
        }
        token
    }

    fn expr(&mut self, graph: &mut MergeGraph) -> NodeId {
        self.skip_ws();
        match self.chars.peek().copied() {
            Some('(') => {
                self.chars.next();
                let name = self.token();
                let mut children = Vec::new();
                loop {
                    self.skip_ws();
                    if self.chars.next_if_eq(&')').is_some() {
                        break;
                    }
                    children.push(self.expr(graph));
                }
                CallFactory::standard()
                    .create(graph, &name, &children)
                    .unwrap()
            }
            Some('\'') => {
                self.chars.next();
                let mut text = String::new();
                loop {
                    match self.chars.next().expect("unterminated string") {
                        '\\' => text.push(self.chars.next().expect("dangling escape")),
                        '\'' => break,
                        c => text.push(c),
                    }
                }
                graph.literal(Literal::string(text)).unwrap()
            }
            Some(':') => {
                self.chars.next();
                graph.literal(Literal::Null).unwrap()
            }
            _ => {
                let token = self.token();
                let literal = match token.parse::<i64>() {
                    Ok(n) => Literal::Integer(n),
                    Err(_) => Literal::Float(token.parse().expect("number")),
                };
                graph.literal(literal).unwrap()
            }
        }
    }
}

/// A graph with one root per expression, in order.
pub fn rooted(exprs: &[&str]) -> MergeGraph {
    let mut graph = MergeGraph::new();
    for text in exprs {
        let id = parse(&mut graph, text);
        graph.add_root(id).unwrap();
    }
    graph
}

/// Compile with the default settings against [`Host`].
pub fn compiled(exprs: &[&str]) -> Compiled {
    let mut graph = rooted(exprs);
    compile(
        &mut graph,
        &CallFactory::standard(),
        &Host,
        &CompileConfig::default(),
    )
    .unwrap()
}

/// Operators `streq` and `contains`; transformation `lowercase`.
pub struct Host;

impl Environment for Host {
    fn operator(&self, name: &str) -> Result<Arc<dyn OperatorFactory>, ResolutionError> {
        match name {
            "streq" => Ok(Arc::new(StringOp(|input: &str, param: &str| input == param))),
            "contains" => Ok(Arc::new(StringOp(|input: &str, param: &str| {
                input.contains(param)
            }))),
            _ => Err(ResolutionError::not_found("operator", name)),
        }
    }

    fn transformation(&self, name: &str) -> Result<Arc<dyn Transformation>, ResolutionError> {
        match name {
            "lowercase" => Ok(Arc::new(Lowercase)),
            _ => Err(ResolutionError::not_found("transformation", name)),
        }
    }
}

type Test = fn(&str, &str) -> bool;

struct StringOp(Test);

impl OperatorFactory for StringOp {
    fn create(&self, params: &str) -> Result<Arc<dyn OperatorInstance>, String> {
        if params.is_empty() {
            return Err("empty parameter".to_owned());
        }
        Ok(Arc::new(StringInstance {
            test: self.0,
            param: params.to_owned(),
        }))
    }
}

struct StringInstance {
    test: Test,
    param: String,
}

impl OperatorInstance for StringInstance {
    fn execute(&self, _context: &dyn Context, input: &Value) -> Result<Outcome, String> {
        let text = input.as_str().ok_or("input is not a string")?;
        if (self.test)(text, &self.param) {
            Ok(Outcome::Hit(vec![input.clone()]))
        } else {
            Ok(Outcome::Miss)
        }
    }
}

struct Lowercase;

impl Transformation for Lowercase {
    fn execute(&self, input: &Value) -> Result<Value, String> {
        let text = input.as_str().ok_or("input is not a string")?;
        Ok(Value::string(&text.to_lowercase()).with_name(input.name()))
    }
}

/// One transaction's view: current phase and field store.
pub struct Txn {
    pub phase: Phase,
    pub fields: FxHashMap<String, Value>,
}

impl Txn {
    pub fn at(phase: Phase) -> Self {
        Txn {
            phase,
            fields: FxHashMap::default(),
        }
    }

    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_owned(), value);
        self
    }
}

impl Context for Txn {
    fn phase(&self) -> Phase {
        self.phase
    }

    fn field_by_name(&self, name: &str) -> Result<Option<Value>, String> {
        Ok(self.fields.get(name).cloned())
    }
}
