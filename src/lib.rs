use std::fmt;

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod parser;

pub use ast::Value;
pub use evaluator::Environment;

/// Error type shared by the parser, the evaluator and the builtin operations.
///
/// Every fallible step of an evaluation returns one of these; errors bubble
/// up to the REPL or script boundary where they are rendered with `Display`.
/// There is no in-language catch mechanism.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemeError {
    /// Arity mismatch: expected count plus the values actually supplied
    NumArgs(usize, Vec<Value>),
    /// Unpack failure: expected type name plus the offending value
    TypeMismatch(String, Value),
    /// Reader failure; the message carries the position
    Parser(String),
    /// Malformed special form
    BadSpecialForm(String, Value),
    /// Application of a non-callable value
    NotFunction(String, String),
    /// Reference to or assignment of an undefined variable
    UnboundVar(String, String),
    /// Failed `assert` primitive
    Assert(String),
    /// Fallback for everything else (I/O failures, division by zero, ...)
    Default(String),
}

impl std::error::Error for SchemeError {}

impl fmt::Display for SchemeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SchemeError::NumArgs(expected, found) => {
                let shown: Vec<String> = found.iter().map(|v| v.to_string()).collect();
                write!(
                    f,
                    "Expected {} args; found values {}",
                    expected,
                    shown.join(" ")
                )
            }
            SchemeError::TypeMismatch(expected, found) => {
                write!(f, "Invalid type: expected {}, found {}", expected, found)
            }
            SchemeError::Parser(msg) => write!(f, "Parse error at {}", msg),
            SchemeError::BadSpecialForm(msg, form) => write!(f, "{}: {}", msg, form),
            SchemeError::NotFunction(msg, name) => write!(f, "{}: {}", msg, name),
            SchemeError::UnboundVar(msg, name) => write!(f, "{}: {}", msg, name),
            SchemeError::Assert(_) => write!(f, "Assertion failed"),
            SchemeError::Default(msg) => write!(f, "{}", msg),
        }
    }
}

/// Evaluate a single expression from source text and return its printed form.
///
/// This is the one-call entry point the REPL and embedding callers use.
pub fn eval_string(env: &Environment, input: &str) -> Result<String, SchemeError> {
    let expr = parser::parse(input)?;
    let value = evaluator::eval(&expr, env)?;
    Ok(value.to_string())
}
