/// Core value types for the interpreter. The single [`Value`] enum is shared by
/// the parser, the evaluator and the builtin operations: the parser produces
/// values, the evaluator consumes and returns them, and the printed form of a
/// value (its `Display` impl) is the canonical external syntax. Ergonomic
/// helper functions such as [`val`], [`sym`] and [`nil`] are provided for
/// convenient construction in both code and tests.
use std::cell::RefCell;
use std::fs::File;
use std::io::BufReader;
use std::rc::Rc;

use crate::SchemeError;
use crate::evaluator::Environment;

/// Allowed non-alphanumeric characters in symbol names
pub const SYMBOL_SPECIAL_CHARS: &str = "!$%&|*+-/:<=>?@^_~#";

/// Backing state of a port value. A port starts out as an open input or
/// output handle and is replaced by `Closed` when the program closes it.
#[derive(Debug)]
pub enum PortKind {
    Input(BufReader<File>),
    Output(File),
    Closed,
}

/// Shared handle to a port; clones refer to the same underlying file.
pub type PortHandle = Rc<RefCell<PortKind>>;

/// Universal tagged datum of the language.
///
/// Every syntactic form parses to one of these, and every evaluation step
/// maps values to values. Functions and ports have no reader syntax; their
/// printed forms are placeholders.
#[derive(Debug, Clone)]
pub enum Value {
    /// Symbols (identifiers)
    Symbol(String),
    /// String literals
    String(String),
    /// Character literals (`#\a`, `#\space`, `#\newline`)
    Char(char),
    /// Boolean values
    Bool(bool),
    /// Integers
    Number(i64),
    /// Floating point literals (`#d1.5` or `1.5`)
    Float(f64),
    /// Exact ratio of two integers; the denominator is never zero
    Rational(i64, i64),
    /// Complex number as (real, imaginary) parts
    Complex(f64, f64),
    /// Proper lists; the empty list represents nil
    List(Vec<Value>),
    /// Improper lists: a non-empty head plus a trailing non-list value
    DottedList(Vec<Value>, Box<Value>),
    /// Fixed-size 0-indexed array
    Vector(Vec<Value>),
    /// Pure built-in functions; compared by id string, not function pointer
    BuiltinFunction {
        id: String,
        func: fn(&[Value]) -> Result<Value, SchemeError>,
    },
    /// Effectful built-in functions (file and stdio access)
    IoFunction {
        id: String,
        func: fn(&[Value]) -> Result<Value, SchemeError>,
    },
    /// Handle to an opened file or standard stream
    Port(PortHandle),
    /// User-defined functions (params, optional rest parameter, body
    /// sequence, closure env)
    Function {
        params: Vec<String>,
        vararg: Option<String>,
        body: Vec<Value>,
        env: Environment,
    },
}

// From trait implementations for Value - enables .into() conversion
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Number(n as i64)
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(i64);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::List(arr.into_iter().map(|x| x.into()).collect())
    }
}

/// Helper function for creating symbols - works great in mixed lists!
pub(crate) fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_string())
}

/// Helper function for creating Values from anything convertible
pub(crate) fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper function for creating empty lists (nil)
pub(crate) fn nil() -> Value {
    Value::List(vec![])
}

/// Format a float so that the result re-parses as a float, never as an
/// integer (1.0 renders as "1.0", not "1").
fn fmt_float(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Symbol(s) => write!(f, "{}", s),
            Value::String(s) => {
                write!(f, "\"")?;
                for ch in s.chars() {
                    match ch {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        '\r' => write!(f, "\\r")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                write!(f, "\"")
            }
            Value::Char('\n') => write!(f, "#\\newline"),
            Value::Char(' ') => write!(f, "#\\space"),
            Value::Char(c) => write!(f, "#\\{}", c),
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::Number(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", fmt_float(*x)),
            Value::Rational(p, q) => write!(f, "{}/{}", p, q),
            Value::Complex(re, im) => {
                if im.is_sign_negative() {
                    write!(f, "{}-{}i", fmt_float(*re), fmt_float(-im))
                } else {
                    write!(f, "{}+{}i", fmt_float(*re), fmt_float(*im))
                }
            }
            Value::List(elements) => {
                write!(f, "(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", elem)?;
                }
                write!(f, ")")
            }
            Value::DottedList(elements, tail) => {
                write!(f, "(")?;
                for elem in elements {
                    write!(f, "{} ", elem)?;
                }
                write!(f, ". {})", tail)
            }
            Value::Vector(elements) => {
                write!(f, "#(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", elem)?;
                }
                write!(f, ")")
            }
            Value::BuiltinFunction { .. } => write!(f, "<primitive>"),
            Value::IoFunction { .. } => write!(f, "<IO primitive>"),
            Value::Port(_) => write!(f, "<IO port>"),
            Value::Function { params, vararg, .. } => {
                write!(f, "(lambda (")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", param)?;
                }
                if let Some(rest) = vararg {
                    if params.is_empty() {
                        write!(f, ". {}", rest)?;
                    } else {
                        write!(f, " . {}", rest)?;
                    }
                }
                write!(f, ") ...)")
            }
        }
    }
}

impl Value {
    /// Check if a value represents nil (empty list)
    pub(crate) fn is_nil(&self) -> bool {
        matches!(self, Value::List(list) if list.is_empty())
    }

    /// Only `#f` is falsy; every other value, including 0, "" and (), is
    /// truthy.
    pub(crate) fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Rational(p1, q1), Value::Rational(p2, q2)) => p1 == p2 && q1 == q2,
            (Value::Complex(r1, i1), Value::Complex(r2, i2)) => r1 == r2 && i1 == i2,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::DottedList(a, t1), Value::DottedList(b, t2)) => a == b && t1 == t2,
            (Value::Vector(a), Value::Vector(b)) => a == b,
            (Value::BuiltinFunction { id: id1, .. }, Value::BuiltinFunction { id: id2, .. }) => {
                // Compare by id string, not function pointer
                id1 == id2
            }
            (Value::IoFunction { id: id1, .. }, Value::IoFunction { id: id2, .. }) => id1 == id2,
            (Value::Port(a), Value::Port(b)) => Rc::ptr_eq(a, b),
            (
                Value::Function {
                    params: p1,
                    vararg: v1,
                    body: b1,
                    env: e1,
                },
                Value::Function {
                    params: p2,
                    vararg: v2,
                    body: b2,
                    env: e2,
                },
            ) => p1 == p2 && v1 == v2 && b1 == b2 && e1 == e2,
            _ => false, // Different variants are never equal
        }
    }
}

#[cfg(test)]
mod helper_function_tests {
    use super::*;

    #[test]
    fn test_helper_functions_data_driven() {
        // Test cases as (Value, Value) tuples: (helper_result, expected_value)
        let test_cases = vec![
            (val(42), Value::Number(42)),
            (val(-17), Value::Number(-17)),
            (val(255u8), Value::Number(255)),
            (val(i64::MIN), Value::Number(i64::MIN)),
            (val(true), Value::Bool(true)),
            (val('x'), Value::Char('x')),
            (val("hello"), Value::String("hello".to_string())),
            (val(""), Value::String("".to_string())),
            (sym("foo-bar?"), Value::Symbol("foo-bar?".to_string())),
            (sym(String::from("test")), Value::Symbol("test".to_string())),
            (nil(), Value::List(vec![])),
            (
                val([1, 2, 3]),
                Value::List(vec![Value::Number(1), Value::Number(2), Value::Number(3)]),
            ),
            (
                val(vec![sym("op"), val(42), val("result")]),
                Value::List(vec![
                    Value::Symbol("op".to_string()),
                    Value::Number(42),
                    Value::String("result".to_string()),
                ]),
            ),
        ];

        for (i, (actual, expected)) in test_cases.iter().enumerate() {
            if actual != expected {
                panic!(
                    "Test case {} failed:\n  Expected: {:?}\n  Got: {:?}",
                    i + 1,
                    expected,
                    actual
                );
            }
        }
    }

    #[test]
    fn test_display_forms() {
        let test_cases = vec![
            (val(42), "42"),
            (Value::Float(1.0), "1.0"),
            (Value::Float(3.14), "3.14"),
            (Value::Rational(3, 4), "3/4"),
            (Value::Complex(1.0, 2.0), "1.0+2.0i"),
            (Value::Complex(1.5, -2.0), "1.5-2.0i"),
            (Value::Char('a'), "#\\a"),
            (Value::Char(' '), "#\\space"),
            (Value::Char('\n'), "#\\newline"),
            (val(true), "#t"),
            (val("a\"b\n"), "\"a\\\"b\\n\""),
            (val([1, 2, 3]), "(1 2 3)"),
            (
                Value::DottedList(vec![val(1), val(2)], Box::new(val(3))),
                "(1 2 . 3)",
            ),
            (Value::Vector(vec![val(1), sym("a")]), "#(1 a)"),
            (nil(), "()"),
        ];

        for (value, expected) in test_cases {
            assert_eq!(format!("{}", value), expected);
        }
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        // Everything that is not #f is truthy
        assert!(val(0).is_truthy());
        assert!(val("").is_truthy());
        assert!(nil().is_truthy());
    }
}
