use crate::common::*;

/// Bounds applied while rolling.
///
/// `None` leaves a bound open. Exceeding a roll bound skips that roll and
/// records an error in the result; it never clamps.
///
/// The default leaves both roll bounds open, so `99999999999d6` or
/// `{1}...99999999999` allocates one node per roll until memory runs out.
/// Interpreters that take untrusted input should use [`Limits::bounded`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Limits {
    pub max_roll_times: Option<u64>,
    pub max_dice_sides: Option<u64>,
    /// Ceiling on explosions or rerolls triggered by a single die.
    pub max_iterations: usize,
}

impl Limits {
    pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

    pub fn new(max_roll_times: Option<u64>, max_dice_sides: Option<u64>) -> Self {
        Self {
            max_roll_times,
            max_dice_sides,
            ..Self::default()
        }
    }

    /// Caps both the number of rolls per dice term or group repeat and the
    /// number of sides.
    pub fn bounded(max_roll_times: u64, max_dice_sides: u64) -> Self {
        Self::new(Some(max_roll_times), Some(max_dice_sides))
    }

    pub fn with_max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    pub(crate) fn check_rolls(&self, n: Int) -> Result<(), String> {
        if n < 0 {
            return Err(format!("Invalid number of rolls: {}. Minimum allowed: 0.", n));
        }
        match self.max_roll_times {
            Some(max) if n as u64 > max => Err(format!(
                "Invalid number of rolls: {}. Maximum allowed: {}.",
                n, max
            )),
            _ => Ok(()),
        }
    }

    pub(crate) fn check_sides(&self, sides: Sides) -> Result<(), String> {
        let n = match sides {
            Sides::Poly(n) => n,
            Sides::Fate => return Ok(()),
        };
        if n < 1 {
            return Err(format!("Invalid number of dice sides: {}. Minimum allowed: 1.", n));
        }
        match self.max_dice_sides {
            Some(max) if n as u64 > max => Err(format!(
                "Invalid number of dice sides: {}. Maximum allowed: {}.",
                n, max
            )),
            _ => Ok(()),
        }
    }
}

/// Open roll and side bounds with the default iteration ceiling.
impl Default for Limits {
    fn default() -> Self {
        Self {
            max_roll_times: None,
            max_dice_sides: None,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
        }
    }
}
