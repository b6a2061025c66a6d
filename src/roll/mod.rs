mod error;
mod functions;
mod interpreter;
mod limits;
mod modifiers;
mod num;
mod result;
mod roller;

type RResult<T> = Result<T, EvalError>;

pub use error::EvalError;
pub use functions::{evaluate_args, Evaluate, Function, FunctionTable};
pub use interpreter::{DefaultRoller, Interpreter};
pub use limits::Limits;
pub use num::Number;
pub use result::DiceResult;
pub use roller::Roller;
