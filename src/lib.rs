//! Parsing and rolling of tabletop dice expressions such as `4d20kh3>=15`.
//!
//! ```
//! let result = dice_tree::roll("2d6 + 3").unwrap();
//! let total = result.total().as_int();
//! assert!((5..=15).contains(&total));
//! ```

pub mod common;
pub mod parse;
pub mod roll;

pub use parse::{parse, ParseError, ParseErrorKind, Parsed};
pub use roll::{DiceResult, EvalError, FunctionTable, Interpreter, Limits, Number, Roller};

/// Parses and rolls `s` with a thread-local random source and default limits.
///
/// The default limits leave the roll count open. Use [`roll_with`] and
/// [`Limits::bounded`] for untrusted input.
pub fn roll(s: &str) -> Result<DiceResult, EvalError> {
    roll_with(s, &mut Interpreter::new())
}

/// Parses `s` and rolls it with `interpreter`.
///
/// Parse errors do not stop the roll: the best-effort tree is interpreted and
/// the parse diagnostics are placed in front of the result's errors.
pub fn roll_with<R: Roller>(s: &str, interpreter: &mut Interpreter<R>) -> Result<DiceResult, EvalError> {
    let parsed = parse(s);
    let mut result = interpreter.interpret(&parsed.root)?;
    result.prepend_errors(parsed.errors.iter().map(ToString::to_string));
    Ok(result)
}
