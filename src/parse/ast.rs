use crate::common::*;
use crate::roll::Number;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum NodeKind {
    Integer,
    DiceSides,
    Dice,
    DiceRoll,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Exponent,
    Negate,
    Equal,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Function,
    Group,
    Explode,
    Keep,
    Drop,
    Critical,
    Reroll,
    Sort,
}

impl NodeKind {
    pub const fn is_modifier(self) -> bool {
        matches!(
            self,
            Self::Explode | Self::Keep | Self::Drop | Self::Critical | Self::Reroll | Self::Sort
        )
    }

    pub const fn as_compare_op(self) -> Option<CompareOp> {
        Some(match self {
            Self::Equal => CompareOp::Equal,
            Self::Greater => CompareOp::Greater,
            Self::GreaterOrEqual => CompareOp::GreaterOrEqual,
            Self::Less => CompareOp::Less,
            Self::LessOrEqual => CompareOp::LessOrEqual,
            _ => return None,
        })
    }

    pub const fn from_compare_op(op: CompareOp) -> Self {
        match op {
            CompareOp::Equal => Self::Equal,
            CompareOp::Greater => Self::Greater,
            CompareOp::GreaterOrEqual => Self::GreaterOrEqual,
            CompareOp::Less => Self::Less,
            CompareOp::LessOrEqual => Self::LessOrEqual,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Number(Number),
    Text(String),
    Flag(bool),
}

impl From<Number> for Attribute {
    fn from(x: Number) -> Self {
        Self::Number(x)
    }
}

impl From<Int> for Attribute {
    fn from(x: Int) -> Self {
        Self::Number(x.into())
    }
}

impl From<&str> for Attribute {
    fn from(x: &str) -> Self {
        Self::Text(x.to_owned())
    }
}

impl From<String> for Attribute {
    fn from(x: String) -> Self {
        Self::Text(x)
    }
}

impl From<bool> for Attribute {
    fn from(x: bool) -> Self {
        Self::Flag(x)
    }
}

/// Attribute keys shared by the parser and the interpreter.
pub mod attr {
    /// `Function`: callee name.
    pub const NAME: &str = "name";
    /// `DiceSides` and rolled `Dice`: a number of faces or `"fate"`.
    pub const SIDES: &str = "sides";
    /// `DiceRoll`: excluded from the total when set.
    pub const DROP: &str = "drop";
    /// `DiceRoll`: `"success"` or `"failure"`.
    pub const CRITICAL: &str = "critical";
    /// `DiceRoll`: outcome against an expression-level comparison.
    pub const SUCCESS: &str = "success";
    /// `DiceRoll`: this die triggered an explosion.
    pub const EXPLODED: &str = "exploded";
    /// `DiceRoll`: this die was rerolled at least once.
    pub const REROLLED: &str = "rerolled";
    /// Comparison with two operands: counted successes and fails.
    pub const SUCCESSES: &str = "successes";
    pub const FAILS: &str = "fails";
    /// `Keep`/`Drop`: `"highest"` or `"lowest"`.
    pub const TYPE: &str = "type";
    /// `Sort`: `"ascending"` or `"descending"`.
    pub const DIRECTION: &str = "direction";
    /// `Explode`
    pub const COMPOUND: &str = "compound";
    pub const PENETRATE: &str = "penetrate";
    /// `Reroll`
    pub const ONCE: &str = "once";
    /// `Group`: number of times the listed expressions are repeated.
    pub const REPEAT: &str = "repeat";
}

/// A node of the mutable dice expression tree.
///
/// Children are owned exclusively by their parent. `value` is the memoized
/// result of evaluating the node: `None` until the interpreter computes it.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Node>,
    attributes: BTreeMap<String, Attribute>,
    value: Option<Number>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            value: None,
        }
    }

    pub fn with_children(kind: NodeKind, children: Vec<Node>) -> Self {
        Self {
            children,
            ..Self::new(kind)
        }
    }

    pub fn integer(x: Int) -> Self {
        let mut ret = Self::new(NodeKind::Integer);
        ret.value = Some(x.into());
        ret
    }

    pub fn dice_sides(sides: Sides) -> Self {
        let mut ret = Self::new(NodeKind::DiceSides);
        ret.set_sides(sides);
        ret
    }

    pub fn dice(count: Node, sides: Sides) -> Self {
        Self::with_children(NodeKind::Dice, vec![count, Self::dice_sides(sides)])
    }

    pub fn dice_roll(x: Int) -> Self {
        let mut ret = Self::new(NodeKind::DiceRoll);
        ret.value = Some(x.into());
        ret.set_attr(attr::DROP, false);
        ret
    }

    pub fn unary(kind: NodeKind, operand: Node) -> Self {
        Self::with_children(kind, vec![operand])
    }

    pub fn binary(kind: NodeKind, lhs: Node, rhs: Node) -> Self {
        Self::with_children(kind, vec![lhs, rhs])
    }

    pub fn function(name: &str, args: Vec<Node>) -> Self {
        let mut ret = Self::with_children(NodeKind::Function, args);
        ret.set_attr(attr::NAME, name);
        ret
    }

    pub fn value(&self) -> Option<Number> {
        self.value
    }

    pub fn set_value(&mut self, value: Number) {
        self.value = Some(value);
    }

    pub fn clear_value(&mut self) {
        self.value = None;
    }

    pub fn attributes(&self) -> &BTreeMap<String, Attribute> {
        &self.attributes
    }

    pub fn attr(&self, key: &str) -> Option<&Attribute> {
        self.attributes.get(key)
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<Attribute>) {
        self.attributes.insert(key.to_owned(), value.into());
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<Attribute> {
        self.attributes.remove(key)
    }

    pub fn flag(&self, key: &str) -> bool {
        matches!(self.attr(key), Some(Attribute::Flag(true)))
    }

    pub fn number_attr(&self, key: &str) -> Option<Number> {
        match self.attr(key)? {
            Attribute::Number(x) => Some(*x),
            _ => None,
        }
    }

    pub fn text_attr(&self, key: &str) -> Option<&str> {
        match self.attr(key)? {
            Attribute::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn sides(&self) -> Option<Sides> {
        match self.attr(attr::SIDES)? {
            Attribute::Number(x) => Some(Sides::Poly(x.as_int())),
            Attribute::Text(s) if s == Sides::FATE_TEXT => Some(Sides::Fate),
            _ => None,
        }
    }

    pub fn set_sides(&mut self, sides: Sides) {
        match sides {
            Sides::Poly(x) => self.set_attr(attr::SIDES, x),
            Sides::Fate => self.set_attr(attr::SIDES, Sides::FATE_TEXT),
        }
    }

    /// `true` for a rolled die that still counts toward the total.
    /// True for a comparison that has counted successes and fails.
    pub fn is_counted(&self) -> bool {
        self.attributes.contains_key(attr::SUCCESSES)
    }

    pub fn is_kept(&self) -> bool {
        !self.flag(attr::DROP)
    }

    /// Follows first children down to the first `Dice` node.
    pub fn leftmost_dice(&self) -> Option<&Node> {
        if self.kind == NodeKind::Dice {
            Some(self)
        } else {
            self.children.first()?.leftmost_dice()
        }
    }

    pub fn leftmost_dice_mut(&mut self) -> Option<&mut Node> {
        if self.kind == NodeKind::Dice {
            Some(self)
        } else {
            self.children.first_mut()?.leftmost_dice_mut()
        }
    }

    /// Every `DiceRoll` leaf below this node, in tree order.
    pub fn dice_rolls(&self) -> Vec<&Node> {
        let mut ret = Vec::new();
        self.collect_rolls(&mut ret);
        ret
    }

    fn collect_rolls<'a>(&'a self, out: &mut Vec<&'a Node>) {
        if self.kind == NodeKind::DiceRoll {
            out.push(self);
        }
        for child in &self.children {
            child.collect_rolls(out);
        }
    }

    pub(crate) fn dice_rolls_mut(&mut self) -> Vec<&mut Node> {
        let mut ret = Vec::new();
        self.collect_rolls_mut(&mut ret);
        ret
    }

    fn collect_rolls_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Node>) {
        if self.kind == NodeKind::DiceRoll {
            out.push(self);
            return;
        }
        for child in &mut self.children {
            child.collect_rolls_mut(out);
        }
    }
}
