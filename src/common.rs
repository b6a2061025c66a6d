use std::fmt::{self, Write};
pub use vec1::vec1;

pub type Int = i64;
pub type Float = f64;

pub type NonEmpty<T> = vec1::Vec1<T>;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Sides {
    Poly(Int),
    Fate,
}

impl Sides {
    pub const FATE_TEXT: &'static str = "fate";

    /// Lowest face a die of this kind can show.
    pub const fn min_face(self) -> Int {
        match self {
            Self::Poly(_) => 1,
            Self::Fate => -1,
        }
    }

    /// Highest face a die of this kind can show.
    pub const fn max_face(self) -> Int {
        match self {
            Self::Poly(x) => x,
            Self::Fate => 1,
        }
    }
}

impl fmt::Display for Sides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Poly(x) => fmt::Display::fmt(x, f),
            Self::Fate => f.write_char('F'),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CompareOp {
    Equal,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl CompareOp {
    pub fn compare<T: PartialOrd>(self, lhs: T, rhs: T) -> bool {
        match self {
            Self::Equal => lhs == rhs,
            Self::Greater => lhs > rhs,
            Self::GreaterOrEqual => lhs >= rhs,
            Self::Less => lhs < rhs,
            Self::LessOrEqual => lhs <= rhs,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Equal => "=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
        };
        f.write_str(s)
    }
}
