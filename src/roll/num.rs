use crate::common::*;
use std::fmt;

/// A value produced by evaluating a node: integral while every operand is,
/// otherwise floating point.
#[derive(Debug, Copy, Clone)]
pub enum Number {
    Int(Int),
    Float(Float),
}

impl Number {
    pub const ZERO: Self = Self::Int(0);

    pub fn as_int(self) -> Int {
        match self {
            Self::Int(x) => x,
            Self::Float(x) => x as Int,
        }
    }

    pub fn as_float(self) -> Float {
        match self {
            Self::Int(x) => x as Float,
            Self::Float(x) => x,
        }
    }

    pub fn is_zero(self) -> bool {
        self.as_float() == 0.0
    }

    /// Rounds to the nearest integer with ties going up (`2.5 -> 3`, `-2.5 -> -2`).
    pub fn round_half_up(self) -> Int {
        match self {
            Self::Int(x) => x,
            Self::Float(x) => (x + 0.5).floor() as Int,
        }
    }

    pub fn pow(self, rhs: Self) -> Self {
        if let (Self::Int(x), Self::Int(y)) = (self, rhs) {
            if let Some(r) = u32::try_from(y).ok().and_then(|y| x.checked_pow(y)) {
                return Self::Int(r);
            }
        }
        Self::Float(self.as_float().powf(rhs.as_float()))
    }
}

impl std::ops::Neg for Number {
    type Output = Self;

    fn neg(self) -> Self::Output {
        match self {
            Self::Int(x) => x.checked_neg().map_or(Self::Float(-(x as Float)), Self::Int),
            Self::Float(x) => Self::Float(-x),
        }
    }
}

macro_rules! val_impl_bin_op {
    ($Name:ident, $fn_name:ident, $checked:ident) => {
        impl std::ops::$Name for Number {
            type Output = Self;

            fn $fn_name(self, rhs: Self) -> Self::Output {
                match (self, rhs) {
                    (Self::Int(x), Self::Int(y)) => match x.$checked(y) {
                        Some(r) => Self::Int(r),
                        None => Self::Float(std::ops::$Name::$fn_name(x as Float, y as Float)),
                    },
                    (x, y) => Self::Float(std::ops::$Name::$fn_name(x.as_float(), y.as_float())),
                }
            }
        }
    };
}

val_impl_bin_op!(Add, add, checked_add);
val_impl_bin_op!(Sub, sub, checked_sub);
val_impl_bin_op!(Mul, mul, checked_mul);
val_impl_bin_op!(Rem, rem, checked_rem);

impl std::ops::Div for Number {
    type Output = Self;

    // Integral only when the division is exact, so `2/5` stays `0.4`.
    fn div(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Self::Int(x), Self::Int(y)) if y != 0 && x.checked_rem(y) == Some(0) => {
                Self::Int(x / y)
            }
            (x, y) => Self::Float(x.as_float() / y.as_float()),
        }
    }
}

impl std::iter::Sum for Number {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |a, b| a + b)
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.as_float().eq(&other.as_float())
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.as_float().partial_cmp(&other.as_float())
    }
}

impl From<Int> for Number {
    fn from(x: Int) -> Self {
        Self::Int(x)
    }
}

impl From<Float> for Number {
    fn from(x: Float) -> Self {
        Self::Float(x)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(x) => fmt::Display::fmt(x, f),
            Self::Float(x) => fmt::Debug::fmt(x, f),
        }
    }
}
