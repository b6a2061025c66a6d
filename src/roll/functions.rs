use super::{error::EvalError, num::Number, RResult};
use crate::common::*;
use crate::parse::ast::{attr, Node};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Evaluation access handed to functions so they can evaluate their arguments.
pub trait Evaluate {
    fn evaluate(&mut self, node: &mut Node) -> RResult<Number>;
}

/// A callable invoked with the evaluator and its own `Function` node.
pub type Function = Rc<dyn Fn(&mut dyn Evaluate, &mut Node) -> RResult<Number>>;

/// Functions callable from dice expressions, keyed by name.
#[derive(Clone, Default)]
pub struct FunctionTable {
    functions: HashMap<String, Function>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `abs`, `ceil`, `floor`, `round` (ties up) and `sqrt`.
    pub fn defaults() -> Self {
        Self::new()
            .with("abs", unary(|x| match x {
                Number::Int(x) => x.checked_abs().map_or(Number::Float((x as Float).abs()), Number::Int),
                Number::Float(x) => Number::Float(x.abs()),
            }))
            .with("ceil", unary(|x| to_int(x.as_float().ceil())))
            .with("floor", unary(|x| to_int(x.as_float().floor())))
            .with("round", unary(|x| Number::Int(x.round_half_up())))
            .with("sqrt", unary(|x| Number::Float(x.as_float().sqrt())))
    }

    pub fn with<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&mut dyn Evaluate, &mut Node) -> RResult<Number> + 'static,
    {
        self.insert(name, function);
        self
    }

    pub fn insert<F>(&mut self, name: impl Into<String>, function: F) -> Option<Function>
    where
        F: Fn(&mut dyn Evaluate, &mut Node) -> RResult<Number> + 'static,
    {
        self.functions.insert(name.into(), Rc::new(function))
    }

    /// Adds every entry of `other`, replacing entries with the same name.
    pub fn merge(&mut self, other: FunctionTable) {
        self.functions.extend(other.functions);
    }

    pub fn get(&self, name: &str) -> Option<Function> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("FunctionTable").field("functions", &names).finish()
    }
}

/// Evaluates every argument of a function node, in order.
pub fn evaluate_args(ev: &mut dyn Evaluate, node: &mut Node) -> RResult<Vec<Number>> {
    node.children.iter_mut().map(|arg| ev.evaluate(arg)).collect()
}

fn unary(f: fn(Number) -> Number) -> impl Fn(&mut dyn Evaluate, &mut Node) -> RResult<Number> {
    move |ev: &mut dyn Evaluate, node: &mut Node| match evaluate_args(ev, node)?.as_slice() {
        [x] => Ok(f(*x)),
        args => Err(EvalError::InvalidArguments {
            name: node.text_attr(attr::NAME).unwrap_or_default().to_owned(),
            reason: format!("expected 1 argument, found {}", args.len()),
        }),
    }
}

fn to_int(x: Float) -> Number {
    if x.is_finite() && x.abs() < Int::MAX as Float {
        Number::Int(x as Int)
    } else {
        Number::Float(x)
    }
}
