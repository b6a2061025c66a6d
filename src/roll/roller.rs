use crate::common::Int;
use rand::Rng;

/// The random source the interpreter draws die faces from.
pub trait Roller {
    /// Returns a value in `min..=max`. Callers guarantee `min <= max`.
    fn number_between(&mut self, min: Int, max: Int) -> Int;
}

impl<R: Rng> Roller for R {
    fn number_between(&mut self, min: Int, max: Int) -> Int {
        self.gen_range(min..=max)
    }
}

#[cfg(test)]
pub(crate) use testing::{SequenceRoller, StepRoller};
