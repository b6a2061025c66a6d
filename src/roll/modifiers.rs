use super::{
    error::EvalError,
    interpreter::{kept_total, missing_sides, Interpreter},
    num::Number,
    roller::Roller,
    RResult,
};
use crate::common::*;
use crate::parse::ast::{attr, Node, NodeKind};
use std::cmp::Ordering;
use tracing::{debug, warn};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Modifier {
    Explode { compound: bool, penetrate: bool },
    Keep { highest: bool },
    Drop { highest: bool },
    Critical { success: bool },
    Reroll { once: bool },
    Sort { descending: bool },
}

impl Modifier {
    fn from_node(node: &Node) -> RResult<Self> {
        let is = |key: &str, text: &str| node.text_attr(key) == Some(text);
        Ok(match node.kind {
            NodeKind::Explode => Self::Explode {
                compound: node.flag(attr::COMPOUND),
                penetrate: node.flag(attr::PENETRATE),
            },
            NodeKind::Keep => Self::Keep {
                highest: !is(attr::TYPE, "lowest"),
            },
            NodeKind::Drop => Self::Drop {
                highest: is(attr::TYPE, "highest"),
            },
            NodeKind::Critical => Self::Critical {
                success: !is(attr::TYPE, "failure"),
            },
            NodeKind::Reroll => Self::Reroll {
                once: node.flag(attr::ONCE),
            },
            NodeKind::Sort => Self::Sort {
                descending: is(attr::DIRECTION, "descending"),
            },
            kind => return Err(EvalError::NotAModifier(kind)),
        })
    }
}

/// The condition used when a modifier is written without one.
type DefaultCondition = (CompareOp, Int);

impl<R: Roller> Interpreter<R> {
    /// Applies a modifier node to the leftmost dice of its first child.
    ///
    /// The operand is evaluated first, so nested modifiers apply innermost
    /// first. The modifier's value is the operand's value after the dice
    /// changed.
    pub(super) fn evaluate_modifier(&mut self, node: &mut Node) -> RResult<Number> {
        let kind = node.kind;
        let modifier = Modifier::from_node(node)?;
        let found = node.children.len();
        if !(1..=2).contains(&found) {
            return Err(EvalError::ChildCount {
                kind,
                expected: found.clamp(1, 2),
                found,
            });
        }

        let (target, rest) = node.children.split_at_mut(1);
        let target = &mut target[0];
        let mut arg = rest.first_mut();
        if target.leftmost_dice().is_none() {
            return Err(EvalError::MissingDice(kind));
        }

        let value = self.evaluate(target)?;
        let dice = match target.leftmost_dice_mut() {
            Some(dice) => dice,
            // repeated zero times or over the roll limit
            None => return Ok(value),
        };
        debug!(?modifier, rolls = dice.children.len(), "applying modifier");

        match modifier {
            Modifier::Explode {
                compound,
                penetrate,
            } => self.explode(dice, arg, compound, penetrate)?,
            Modifier::Keep { highest } => {
                let count = self.modifier_count(arg.as_deref_mut())?;
                keep_or_drop(dice, count, true, highest);
            }
            Modifier::Drop { highest } => {
                let count = self.modifier_count(arg.as_deref_mut())?;
                keep_or_drop(dice, count, false, highest);
            }
            Modifier::Critical { success } => self.mark_critical(dice, arg, success)?,
            Modifier::Reroll { once } => self.reroll(dice, arg, once)?,
            Modifier::Sort { descending } => sort(dice, descending),
        }

        self.refresh(target)
    }

    fn modifier_count(&mut self, arg: Option<&mut Node>) -> RResult<Int> {
        match arg {
            Some(node) => Ok(self.evaluate(node)?.round_half_up()),
            None => Ok(1),
        }
    }

    fn condition_matches(
        &mut self,
        value: Number,
        condition: Option<&mut Node>,
        default: DefaultCondition,
    ) -> RResult<bool> {
        match condition {
            Some(node) => self.evaluate_comparison(value, node),
            None => {
                let (op, face) = default;
                Ok(op.compare(value, face.into()))
            }
        }
    }

    fn explode(
        &mut self,
        dice: &mut Node,
        mut condition: Option<&mut Node>,
        compound: bool,
        penetrate: bool,
    ) -> RResult<()> {
        let sides = dice.sides().ok_or_else(|| missing_sides(NodeKind::Dice))?;
        let default = (CompareOp::Equal, sides.max_face());
        let max_iterations = self.limits.max_iterations;

        let rolls = std::mem::take(&mut dice.children);
        let mut children = Vec::with_capacity(rolls.len());
        for mut roll in rolls {
            if !roll.is_kept() {
                children.push(roll);
                continue;
            }

            // Penetrating dice lose a point but explode on the face they showed.
            let mut raw = face(&roll)?;
            let mut extra: Vec<Int> = Vec::new();
            while self.condition_matches(raw, condition.as_deref_mut(), default)? {
                if extra.len() >= max_iterations {
                    warn!(max_iterations, "explosion stopped at the iteration limit");
                    break;
                }
                let x = self.roll_die(sides);
                raw = x.into();
                extra.push(if penetrate { x - 1 } else { x });
            }

            if extra.is_empty() {
                children.push(roll);
            } else if compound {
                let total = face(&roll)? + extra.iter().copied().map(Number::from).sum::<Number>();
                roll.set_value(total);
                roll.set_attr(attr::EXPLODED, true);
                children.push(roll);
            } else {
                roll.set_attr(attr::EXPLODED, true);
                children.push(roll);
                let last = extra.len() - 1;
                children.extend(extra.into_iter().enumerate().map(|(i, x)| {
                    let mut roll = Node::dice_roll(x);
                    if i < last {
                        roll.set_attr(attr::EXPLODED, true);
                    }
                    roll
                }));
            }
        }

        dice.children = children;
        Ok(())
    }

    fn mark_critical(
        &mut self,
        dice: &mut Node,
        mut condition: Option<&mut Node>,
        success: bool,
    ) -> RResult<()> {
        let sides = dice.sides().ok_or_else(|| missing_sides(NodeKind::Dice))?;
        let (default, label) = if success {
            ((CompareOp::Equal, sides.max_face()), "success")
        } else {
            ((CompareOp::Equal, sides.min_face()), "failure")
        };

        for roll in &mut dice.children {
            if self.condition_matches(face(roll)?, condition.as_deref_mut(), default)? {
                roll.set_attr(attr::CRITICAL, label);
            }
        }
        Ok(())
    }

    fn reroll(&mut self, dice: &mut Node, mut condition: Option<&mut Node>, once: bool) -> RResult<()> {
        let sides = dice.sides().ok_or_else(|| missing_sides(NodeKind::Dice))?;
        let default = (CompareOp::Equal, sides.min_face());
        let max_iterations = if once { 1 } else { self.limits.max_iterations };

        for roll in dice.children.iter_mut().filter(|roll| roll.is_kept()) {
            let mut iterations = 0;
            while self.condition_matches(face(roll)?, condition.as_deref_mut(), default)? {
                if iterations >= max_iterations {
                    if !once {
                        warn!(max_iterations, "reroll stopped at the iteration limit");
                    }
                    break;
                }
                iterations += 1;
                let x = self.roll_die(sides);
                roll.set_value(x.into());
                roll.set_attr(attr::REROLLED, true);
            }
        }
        Ok(())
    }

    /// Recomputes cached values from `node` down to its leftmost dice. A node
    /// whose operand value did not change keeps its value and is not evaluated
    /// again.
    fn refresh(&mut self, node: &mut Node) -> RResult<Number> {
        let value = match node.kind {
            NodeKind::Dice => kept_total(node),
            kind if kind.is_modifier() => match node.children.first_mut() {
                Some(target) => self.refresh(target)?,
                None => return Err(EvalError::MissingDice(kind)),
            },
            _ => {
                let before = node.children.first().and_then(Node::value);
                let after = match node.children.first_mut() {
                    Some(first) => Some(self.refresh(first)?),
                    None => None,
                };
                match node.value() {
                    // Counted comparisons recount even when the operand sum is unchanged.
                    Some(value)
                        if node.kind.as_compare_op().is_none()
                            && (after == before || divides_by_zero(node)) =>
                    {
                        value
                    }
                    _ => {
                        node.clear_value();
                        return self.evaluate(node);
                    }
                }
            }
        };
        node.set_value(value);
        Ok(value)
    }
}

/// Division by zero was already reported on the first pass and stays 0.
fn divides_by_zero(node: &Node) -> bool {
    matches!(node.kind, NodeKind::Divide | NodeKind::Modulo)
        && node.children.get(1).and_then(Node::value).map_or(false, Number::is_zero)
}

fn face(roll: &Node) -> RResult<Number> {
    roll.value().ok_or(EvalError::MissingValue(roll.kind))
}

fn compare_faces(a: &Node, b: &Node) -> Ordering {
    a.value()
        .partial_cmp(&b.value())
        .unwrap_or(Ordering::Equal)
}

/// Ranks the dice not yet dropped and marks which of them stop counting.
/// The order of the children is left alone.
fn keep_or_drop(dice: &mut Node, count: Int, keep: bool, highest: bool) {
    let mut ranked: Vec<usize> = (0..dice.children.len())
        .filter(|&i| dice.children[i].is_kept())
        .collect();
    ranked.sort_by(|&a, &b| {
        let ord = compare_faces(&dice.children[a], &dice.children[b]);
        if highest {
            ord.reverse()
        } else {
            ord
        }
    });

    let n = count.clamp(0, ranked.len() as Int) as usize;
    let dropped = if keep { &ranked[n..] } else { &ranked[..n] };
    for &i in dropped {
        dice.children[i].set_attr(attr::DROP, true);
    }
}

fn sort(dice: &mut Node, descending: bool) {
    dice.children.sort_by(|a, b| {
        let ord = compare_faces(a, b);
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
}
