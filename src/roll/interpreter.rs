use super::{
    error::EvalError,
    functions::{Evaluate, FunctionTable},
    limits::Limits,
    num::Number,
    result::DiceResult,
    roller::Roller,
    RResult,
};
use crate::common::*;
use crate::parse::ast::{attr, Node, NodeKind};
use tracing::{debug, trace};

pub type DefaultRoller = rand::prelude::ThreadRng;

/// Evaluates dice expression trees.
///
/// Every call to [`interpret`](Self::interpret) works on a deep copy of the
/// tree it is given, so one parsed tree can be rolled any number of times.
pub struct Interpreter<R = DefaultRoller> {
    pub(super) roller: R,
    pub(super) limits: Limits,
    functions: FunctionTable,
    errors: Vec<String>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_roller(rand::thread_rng())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Roller> Interpreter<R> {
    pub fn with_roller(roller: R) -> Self {
        Self {
            roller,
            limits: Limits::default(),
            functions: FunctionTable::defaults(),
            errors: Vec::new(),
        }
    }

    pub fn with_limits(self, limits: Limits) -> Self {
        Self { limits, ..self }
    }

    /// Adds `functions` to the table, replacing built-ins with the same name.
    pub fn with_functions(mut self, functions: FunctionTable) -> Self {
        self.functions.merge(functions);
        self
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    pub fn interpret(&mut self, tree: &Node) -> RResult<DiceResult> {
        let mut tree = tree.clone();
        self.errors.clear();

        let total = self.evaluate(&mut tree);
        let errors = std::mem::take(&mut self.errors);
        let total = total?;

        debug!(%total, errors = errors.len(), "interpreted dice expression");
        Ok(DiceResult::new(tree, total, errors))
    }

    /// Evaluates `node`, caching the result on it. A node that already holds
    /// a value is not evaluated again.
    pub fn evaluate(&mut self, node: &mut Node) -> RResult<Number> {
        if let Some(value) = node.value() {
            return Ok(value);
        }

        let value = match node.kind {
            NodeKind::Integer | NodeKind::DiceRoll => return Err(EvalError::MissingValue(node.kind)),
            NodeKind::DiceSides => match node.sides() {
                Some(Sides::Poly(x)) => x.into(),
                // -1, 0 and 1
                Some(Sides::Fate) => Number::Int(3),
                None => return Err(missing_sides(node.kind)),
            },
            NodeKind::Dice => self.evaluate_dice(node)?,
            NodeKind::Add => {
                let (x, y) = self.evaluate_operands(node)?;
                x + y
            }
            NodeKind::Subtract => {
                let (x, y) = self.evaluate_operands(node)?;
                x - y
            }
            NodeKind::Multiply => {
                let (x, y) = self.evaluate_operands(node)?;
                x * y
            }
            NodeKind::Divide => {
                let (x, y) = self.evaluate_operands(node)?;
                self.checked_division(x, y, |x, y| x / y)
            }
            NodeKind::Modulo => {
                let (x, y) = self.evaluate_operands(node)?;
                self.checked_division(x, y, |x, y| x % y)
            }
            NodeKind::Exponent => {
                let (x, y) = self.evaluate_operands(node)?;
                x.pow(y)
            }
            NodeKind::Negate => {
                expect_children(node, 1)?;
                -self.evaluate(&mut node.children[0])?
            }
            NodeKind::Equal
            | NodeKind::Greater
            | NodeKind::GreaterOrEqual
            | NodeKind::Less
            | NodeKind::LessOrEqual => self.evaluate_comparison_node(node)?,
            NodeKind::Function => self.evaluate_function(node)?,
            NodeKind::Group => self.evaluate_group(node)?,
            NodeKind::Explode
            | NodeKind::Keep
            | NodeKind::Drop
            | NodeKind::Critical
            | NodeKind::Reroll
            | NodeKind::Sort => self.evaluate_modifier(node)?,
        };

        trace!(kind = %node.kind, %value, "evaluated node");
        node.set_value(value);
        Ok(value)
    }

    /// Tests `lhs` against a single-operand comparison such as the `>=5` of `4d6!>=5`.
    pub fn evaluate_comparison(&mut self, lhs: Number, node: &mut Node) -> RResult<bool> {
        let op = node
            .kind
            .as_compare_op()
            .ok_or(EvalError::NotAComparison(node.kind))?;
        expect_children(node, 1)?;
        let rhs = self.evaluate(node)?;
        Ok(op.compare(lhs, rhs))
    }

    pub(super) fn roll_die(&mut self, sides: Sides) -> Int {
        self.roller.number_between(sides.min_face(), sides.max_face())
    }

    pub(super) fn push_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(%message, "recorded evaluation error");
        self.errors.push(message);
    }

    fn evaluate_operands(&mut self, node: &mut Node) -> RResult<(Number, Number)> {
        expect_children(node, 2)?;
        let x = self.evaluate(&mut node.children[0])?;
        let y = self.evaluate(&mut node.children[1])?;
        Ok((x, y))
    }

    fn checked_division(&mut self, x: Number, y: Number, op: fn(Number, Number) -> Number) -> Number {
        if y.is_zero() {
            self.push_error("Division by zero.");
            Number::ZERO
        } else {
            op(x, y)
        }
    }

    fn evaluate_dice(&mut self, node: &mut Node) -> RResult<Number> {
        // Already rolled; a modifier reset the cached total.
        if node.sides().is_some() {
            return Ok(kept_total(node));
        }

        expect_children(node, 2)?;
        let count = self.evaluate(&mut node.children[0])?.round_half_up();
        let sides = node.children[1]
            .sides()
            .ok_or_else(|| missing_sides(NodeKind::DiceSides))?;
        node.children.clear();
        node.set_sides(sides);

        let checked = self
            .limits
            .check_rolls(count)
            .and_then(|()| self.limits.check_sides(sides));
        if let Err(message) = checked {
            self.push_error(message);
            return Ok(Number::ZERO);
        }

        debug!(count, %sides, "rolling dice");
        node.children = (0..count)
            .map(|_| Node::dice_roll(self.roll_die(sides)))
            .collect();
        Ok(kept_total(node))
    }

    fn evaluate_comparison_node(&mut self, node: &mut Node) -> RResult<Number> {
        match node.children.len() {
            1 => self.evaluate(&mut node.children[0]),
            2 => self.count_successes(node),
            found => Err(EvalError::ChildCount {
                kind: node.kind,
                expected: 2,
                found,
            }),
        }
    }

    /// Compares every kept die on the left against the right operand. Without
    /// dice, or when the left side is itself counted, the left value is compared
    /// once.
    fn count_successes(&mut self, node: &mut Node) -> RResult<Number> {
        let op = node
            .kind
            .as_compare_op()
            .ok_or(EvalError::NotAComparison(node.kind))?;
        let (lhs, rhs) = node.children.split_at_mut(1);
        let lhs = &mut lhs[0];
        let value = self.evaluate(lhs)?;
        let target = self.evaluate(&mut rhs[0])?;

        let (mut successes, mut fails): (Int, Int) = (0, 0);
        // A nested count owns its dice. The outer comparison tests its value.
        let rolls = if contains_count(lhs) {
            Vec::new()
        } else {
            lhs.dice_rolls_mut()
        };
        if rolls.is_empty() {
            if op.compare(value, target) {
                successes += 1;
            } else {
                fails += 1;
            }
        }
        for roll in rolls {
            if !roll.is_kept() {
                roll.remove_attr(attr::SUCCESS);
                continue;
            }
            let success = roll.value().map_or(false, |x| op.compare(x, target));
            roll.set_attr(attr::SUCCESS, success);
            if success {
                successes += 1;
            } else {
                fails += 1;
            }
        }

        trace!(successes, fails, "counted outcomes");
        node.set_attr(attr::SUCCESSES, successes);
        node.set_attr(attr::FAILS, fails);
        Ok(successes.into())
    }

    fn evaluate_function(&mut self, node: &mut Node) -> RResult<Number> {
        let name = node.text_attr(attr::NAME).ok_or(EvalError::MissingAttribute {
            kind: node.kind,
            key: attr::NAME,
        })?;
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| EvalError::UnknownFunction(name.to_owned()))?;

        let ev: &mut dyn Evaluate = self;
        function(ev, node)
    }

    fn evaluate_group(&mut self, node: &mut Node) -> RResult<Number> {
        if let Some(times) = node.number_attr(attr::REPEAT) {
            node.remove_attr(attr::REPEAT);
            self.repeat_items(node, times.as_int());
        }

        node.children
            .iter_mut()
            .map(|child| self.evaluate(child))
            .sum()
    }

    fn repeat_items(&mut self, group: &mut Node, times: Int) {
        if let Err(message) = self.limits.check_rolls(times) {
            self.push_error(message);
            group.children.clear();
            return;
        }

        let items = std::mem::take(&mut group.children);
        group.children = (0..times).flat_map(|_| items.iter().cloned()).collect();
    }
}

impl<R: Roller> Evaluate for Interpreter<R> {
    fn evaluate(&mut self, node: &mut Node) -> RResult<Number> {
        Self::evaluate(self, node)
    }
}

/// Sum of the rolls of a `Dice` node that were not dropped.
pub(super) fn kept_total(dice: &Node) -> Number {
    dice.children
        .iter()
        .filter(|roll| roll.is_kept())
        .filter_map(Node::value)
        .sum()
}

pub(super) fn missing_sides(kind: NodeKind) -> EvalError {
    EvalError::MissingAttribute {
        kind,
        key: attr::SIDES,
    }
}

fn contains_count(node: &Node) -> bool {
    node.is_counted() || node.children.iter().any(contains_count)
}

fn expect_children(node: &Node, expected: usize) -> RResult<()> {
    let found = node.children.len();
    if found == expected {
        Ok(())
    } else {
        Err(EvalError::ChildCount {
            kind: node.kind,
            expected,
            found,
        })
    }
}
