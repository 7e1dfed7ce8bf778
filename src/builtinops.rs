//! Built-in operations registry.
//!
//! Two tables of primitives are installed into the root environment at
//! interpreter start: a pure table (arithmetic, comparison, type predicates,
//! string and list operations, equality) and an effectful table (ports,
//! `read`/`write`, file access, `apply`). Pure primitives never touch files
//! or stdio, which keeps the pure language semantics trivially testable.
//!
//! ## Unpacking and coercion
//!
//! Primitives unwrap their arguments through a small set of unpackers:
//!
//! - to number: `Number`, or a one-element list holding one
//! - to string: `String`, the decimal text of a `Number`, or `"True"` /
//!   `"False"` for booleans
//! - to bool / to char: the exact tag only
//!
//! `eqv?` is tag-and-payload equality; `equal?` additionally accepts two
//! values whose unpacked forms agree, so `(equal? 1 "1")` is true while
//! `(eqv? 1 "1")` is not.
//!
//! ## Adding a new operation
//!
//! 1. Implement the function with the signature
//!    `fn(args: &[Value]) -> Result<Value, SchemeError>`
//! 2. Add it to `PURE_OPS` or `IO_OPS` with its id and arity
//! 3. Add tests covering edge cases and error conditions

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::rc::Rc;
use std::sync::LazyLock;

use crate::SchemeError;
use crate::ast::{PortKind, Value};
use crate::parser;

/// Represents the expected number of arguments for an operation
#[derive(Debug, Clone, PartialEq)]
pub enum Arity {
    /// Exactly n arguments required
    Exact(usize),
    /// At least n arguments required
    AtLeast(usize),
    /// Between min and max arguments (inclusive)
    Range(usize, usize),
    /// Any number of arguments (0 or more)
    Any,
}

impl Arity {
    /// Check the argument count; a mismatch reports the expected count
    /// together with the offending values.
    pub fn validate(&self, args: &[Value]) -> Result<(), SchemeError> {
        let valid = match self {
            Arity::Exact(n) => args.len() == *n,
            Arity::AtLeast(n) => args.len() >= *n,
            Arity::Range(min, max) => args.len() >= *min && args.len() <= *max,
            Arity::Any => true,
        };

        if valid {
            Ok(())
        } else {
            Err(SchemeError::NumArgs(
                match self {
                    Arity::Exact(n) | Arity::AtLeast(n) | Arity::Range(n, _) => *n,
                    Arity::Any => 0,
                },
                args.to_vec(),
            ))
        }
    }
}

/// The implementation of a built-in, split by effect
#[derive(Clone)]
pub enum OpKind {
    /// Pure function over values; must not perform I/O
    Pure(fn(&[Value]) -> Result<Value, SchemeError>),
    /// Effectful function; may read or write files and stdio
    Io(fn(&[Value]) -> Result<Value, SchemeError>),
}

impl std::fmt::Debug for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpKind::Pure(_) => write!(f, "Pure(<fn>)"),
            OpKind::Io(_) => write!(f, "Io(<fn>)"),
        }
    }
}

/// Definition of a built-in operation
#[derive(Debug, Clone)]
pub struct BuiltinOp {
    /// The identifier this operation is bound to in the root environment
    pub id: &'static str,
    /// The implementation, tagged pure or effectful
    pub kind: OpKind,
    /// Expected number of arguments
    pub arity: Arity,
}

impl BuiltinOp {
    pub fn func(&self) -> fn(&[Value]) -> Result<Value, SchemeError> {
        match &self.kind {
            OpKind::Pure(f) | OpKind::Io(f) => *f,
        }
    }

    pub fn is_io(&self) -> bool {
        matches!(self.kind, OpKind::Io(_))
    }
}

//
// Unpackers
//

pub(crate) fn unpack_num(value: &Value) -> Result<i64, SchemeError> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::List(items) if items.len() == 1 => unpack_num(&items[0]),
        other => Err(SchemeError::TypeMismatch(
            "number".to_string(),
            other.clone(),
        )),
    }
}

pub(crate) fn unpack_str(value: &Value) -> Result<String, SchemeError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(true) => Ok("True".to_string()),
        Value::Bool(false) => Ok("False".to_string()),
        other => Err(SchemeError::TypeMismatch(
            "string".to_string(),
            other.clone(),
        )),
    }
}

pub(crate) fn unpack_bool(value: &Value) -> Result<bool, SchemeError> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(SchemeError::TypeMismatch(
            "boolean".to_string(),
            other.clone(),
        )),
    }
}

pub(crate) fn unpack_char(value: &Value) -> Result<char, SchemeError> {
    match value {
        Value::Char(c) => Ok(*c),
        other => Err(SchemeError::TypeMismatch("char".to_string(), other.clone())),
    }
}

/// A String argument with no coercion, for the string accessors
fn expect_string(value: &Value) -> Result<&str, SchemeError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(SchemeError::TypeMismatch(
            "string".to_string(),
            other.clone(),
        )),
    }
}

//
// Arithmetic
//

fn overflow(operation: &str) -> SchemeError {
    SchemeError::Default(format!("integer overflow in {}", operation))
}

fn division_by_zero() -> SchemeError {
    SchemeError::Default("division by zero".to_string())
}

/// Unpack every argument as an integer and fold the operator left to right.
/// All arithmetic operations take at least two arguments.
fn numeric_fold(
    args: &[Value],
    op: fn(i64, i64) -> Result<i64, SchemeError>,
) -> Result<Value, SchemeError> {
    if args.len() < 2 {
        return Err(SchemeError::NumArgs(2, args.to_vec()));
    }
    let mut acc = unpack_num(&args[0])?;
    for arg in &args[1..] {
        acc = op(acc, unpack_num(arg)?)?;
    }
    Ok(Value::Number(acc))
}

pub fn builtin_add(args: &[Value]) -> Result<Value, SchemeError> {
    numeric_fold(args, |a, b| {
        a.checked_add(b).ok_or_else(|| overflow("addition"))
    })
}

pub fn builtin_sub(args: &[Value]) -> Result<Value, SchemeError> {
    numeric_fold(args, |a, b| {
        a.checked_sub(b).ok_or_else(|| overflow("subtraction"))
    })
}

pub fn builtin_mul(args: &[Value]) -> Result<Value, SchemeError> {
    numeric_fold(args, |a, b| {
        a.checked_mul(b).ok_or_else(|| overflow("multiplication"))
    })
}

/// Truncated division
pub fn builtin_div(args: &[Value]) -> Result<Value, SchemeError> {
    numeric_fold(args, checked_quotient)
}

pub fn builtin_quotient(args: &[Value]) -> Result<Value, SchemeError> {
    numeric_fold(args, checked_quotient)
}

/// `mod` takes the sign of the divisor
pub fn builtin_mod(args: &[Value]) -> Result<Value, SchemeError> {
    numeric_fold(args, |a, b| {
        if b == 0 {
            return Err(division_by_zero());
        }
        let r = a.checked_rem(b).ok_or_else(|| overflow("modulo"))?;
        Ok(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
    })
}

/// `remainder` takes the sign of the dividend
pub fn builtin_remainder(args: &[Value]) -> Result<Value, SchemeError> {
    numeric_fold(args, |a, b| {
        if b == 0 {
            return Err(division_by_zero());
        }
        a.checked_rem(b).ok_or_else(|| overflow("remainder"))
    })
}

fn checked_quotient(a: i64, b: i64) -> Result<i64, SchemeError> {
    if b == 0 {
        return Err(division_by_zero());
    }
    a.checked_div(b).ok_or_else(|| overflow("division"))
}

// Macro to generate numeric comparison functions (strict two-argument form)
macro_rules! numeric_comparison {
    ($name:ident, $op:tt) => {
        pub fn $name(args: &[Value]) -> Result<Value, SchemeError> {
            match args {
                [a, b] => Ok(Value::Bool(unpack_num(a)? $op unpack_num(b)?)),
                _ => Err(SchemeError::NumArgs(2, args.to_vec())),
            }
        }
    };
}

numeric_comparison!(builtin_num_eq, ==);
numeric_comparison!(builtin_lt, <);
numeric_comparison!(builtin_gt, >);
numeric_comparison!(builtin_le, <=);
numeric_comparison!(builtin_ge, >=);

//
// Logical operations
//

pub fn builtin_and(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [a, b] => Ok(Value::Bool(unpack_bool(a)? && unpack_bool(b)?)),
        _ => Err(SchemeError::NumArgs(2, args.to_vec())),
    }
}

pub fn builtin_or(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [a, b] => Ok(Value::Bool(unpack_bool(a)? || unpack_bool(b)?)),
        _ => Err(SchemeError::NumArgs(2, args.to_vec())),
    }
}

/// `not` answers #t only for #f; every other value is truthy
pub fn builtin_not(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [Value::Bool(false)] => Ok(Value::Bool(true)),
        [_] => Ok(Value::Bool(false)),
        _ => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

//
// Type predicates
//

pub fn builtin_is_number(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [value] => Ok(Value::Bool(matches!(value, Value::Number(_)))),
        _ => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

pub fn builtin_is_list(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [value] => Ok(Value::Bool(matches!(value, Value::List(_)))),
        _ => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

pub fn builtin_is_string(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [value] => Ok(Value::Bool(matches!(value, Value::String(_)))),
        _ => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

pub fn builtin_is_boolean(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [value] => Ok(Value::Bool(matches!(value, Value::Bool(_)))),
        _ => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

/// A symbol, or the quoted form `(quote x)`, counts as a symbol
pub fn builtin_is_symbol(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [Value::Symbol(_)] => Ok(Value::Bool(true)),
        [Value::List(items)] => Ok(Value::Bool(matches!(
            items.as_slice(),
            [Value::Symbol(q), _] if q == "quote"
        ))),
        [_] => Ok(Value::Bool(false)),
        _ => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

//
// Symbol/string coercion
//

pub fn builtin_symbol_to_string(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [Value::Symbol(s)] => Ok(Value::String(s.clone())),
        [Value::List(items)] => match items.as_slice() {
            [Value::Symbol(q), Value::Symbol(s)] if q == "quote" => Ok(Value::String(s.clone())),
            _ => Err(SchemeError::TypeMismatch(
                "symbol".to_string(),
                args[0].clone(),
            )),
        },
        [other] => Err(SchemeError::TypeMismatch(
            "symbol".to_string(),
            other.clone(),
        )),
        _ => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

pub fn builtin_string_to_symbol(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [Value::String(s)] => Ok(Value::Symbol(s.clone())),
        [other] => Err(SchemeError::TypeMismatch(
            "string".to_string(),
            other.clone(),
        )),
        _ => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

//
// Strings
//

pub fn builtin_make_string(args: &[Value]) -> Result<Value, SchemeError> {
    let (count, fill) = match args {
        [n] => (unpack_num(n)?, ' '),
        [n, c] => (unpack_num(n)?, unpack_char(c)?),
        _ => return Err(SchemeError::NumArgs(1, args.to_vec())),
    };
    let count = usize::try_from(count)
        .map_err(|_| SchemeError::Default(format!("make-string: invalid length {}", count)))?;
    Ok(Value::String(std::iter::repeat(fill).take(count).collect()))
}

pub fn builtin_string_length(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [value] => Ok(Value::Number(expect_string(value)?.chars().count() as i64)),
        _ => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

pub fn builtin_string_ref(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [s, index] => {
            let s = expect_string(s)?;
            let i = unpack_num(index)?;
            usize::try_from(i)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(Value::Char)
                .ok_or_else(|| SchemeError::Default(format!("string index {} out of range", i)))
        }
        _ => Err(SchemeError::NumArgs(2, args.to_vec())),
    }
}

/// Characters in index range [start, end), end-exclusive
pub fn builtin_substring(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [s, start, end] => {
            let chars: Vec<char> = expect_string(s)?.chars().collect();
            let start = unpack_num(start)?;
            let end = unpack_num(end)?;
            let out_of_range =
                || SchemeError::Default(format!("substring range {} {} out of range", start, end));
            let start = usize::try_from(start).map_err(|_| out_of_range())?;
            let end = usize::try_from(end).map_err(|_| out_of_range())?;
            if start > end || end > chars.len() {
                return Err(out_of_range());
            }
            Ok(Value::String(chars[start..end].iter().collect()))
        }
        _ => Err(SchemeError::NumArgs(3, args.to_vec())),
    }
}

pub fn builtin_string_append(args: &[Value]) -> Result<Value, SchemeError> {
    if args.is_empty() {
        return Err(SchemeError::NumArgs(1, args.to_vec()));
    }
    let mut result = String::new();
    for arg in args {
        result.push_str(&unpack_str(arg)?);
    }
    Ok(Value::String(result))
}

/// Build a string from individual characters
pub fn builtin_string(args: &[Value]) -> Result<Value, SchemeError> {
    args.iter()
        .map(unpack_char)
        .collect::<Result<String, _>>()
        .map(Value::String)
}

pub fn builtin_string_to_list(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [value] => Ok(Value::List(
            expect_string(value)?.chars().map(Value::Char).collect(),
        )),
        _ => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

pub fn builtin_list_to_string(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [Value::List(items)] => items
            .iter()
            .map(unpack_char)
            .collect::<Result<String, _>>()
            .map(Value::String),
        [other] => Err(SchemeError::TypeMismatch("list".to_string(), other.clone())),
        _ => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

// Macro to generate lexicographic string comparison functions
macro_rules! string_comparison {
    ($name:ident, $op:tt) => {
        pub fn $name(args: &[Value]) -> Result<Value, SchemeError> {
            match args {
                [a, b] => Ok(Value::Bool(unpack_str(a)? $op unpack_str(b)?)),
                _ => Err(SchemeError::NumArgs(2, args.to_vec())),
            }
        }
    };
}

string_comparison!(builtin_str_eq, ==);
string_comparison!(builtin_str_lt, <);
string_comparison!(builtin_str_gt, >);
string_comparison!(builtin_str_le, <=);
string_comparison!(builtin_str_ge, >=);

//
// List surgery
//

pub fn builtin_car(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [Value::List(items)] => items.first().cloned().ok_or_else(|| {
            SchemeError::TypeMismatch("pair".to_string(), Value::List(vec![]))
        }),
        [Value::DottedList(items, _)] => Ok(items[0].clone()),
        [other] => Err(SchemeError::TypeMismatch("pair".to_string(), other.clone())),
        _ => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

pub fn builtin_cdr(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [Value::List(items)] => match items.as_slice() {
            [] => Err(SchemeError::TypeMismatch(
                "pair".to_string(),
                Value::List(vec![]),
            )),
            [_, rest @ ..] => Ok(Value::List(rest.to_vec())),
        },
        [Value::DottedList(items, tail)] => match items.as_slice() {
            // The dotted head is never empty, so one element means the
            // cdr is exactly the tail value
            [_] => Ok((**tail).clone()),
            [_, rest @ ..] => Ok(Value::DottedList(rest.to_vec(), tail.clone())),
            [] => unreachable!("dotted lists have a non-empty head"),
        },
        [other] => Err(SchemeError::TypeMismatch("pair".to_string(), other.clone())),
        _ => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

pub fn builtin_cons(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [head, Value::List(items)] => {
            let mut new_list = vec![head.clone()];
            new_list.extend_from_slice(items);
            Ok(Value::List(new_list))
        }
        [head, Value::DottedList(items, tail)] => {
            let mut new_head = vec![head.clone()];
            new_head.extend_from_slice(items);
            Ok(Value::DottedList(new_head, tail.clone()))
        }
        [head, tail] => Ok(Value::DottedList(
            vec![head.clone()],
            Box::new(tail.clone()),
        )),
        _ => Err(SchemeError::NumArgs(2, args.to_vec())),
    }
}

pub fn builtin_list(args: &[Value]) -> Result<Value, SchemeError> {
    Ok(Value::List(args.to_vec()))
}

pub fn builtin_null(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [value] => Ok(Value::Bool(value.is_nil())),
        _ => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

//
// Equality
//

/// eq? and eqv?: tag plus payload equality, recursing pairwise into lists
pub fn builtin_eqv(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [a, b] => Ok(Value::Bool(a == b)),
        _ => Err(SchemeError::NumArgs(2, args.to_vec())),
    }
}

/// equal?: eqv?, or agreement under any unpacker, recursing with equal?
/// into list elements
pub(crate) fn equal_values(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::List(xs), Value::List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| equal_values(x, y))
        }
        (Value::DottedList(xs, x_tail), Value::DottedList(ys, y_tail)) => {
            xs.len() == ys.len()
                && xs.iter().zip(ys).all(|(x, y)| equal_values(x, y))
                && equal_values(x_tail, y_tail)
        }
        _ => {
            if let (Ok(x), Ok(y)) = (unpack_num(a), unpack_num(b)) {
                return x == y;
            }
            if let (Ok(x), Ok(y)) = (unpack_str(a), unpack_str(b)) {
                return x == y;
            }
            if let (Ok(x), Ok(y)) = (unpack_bool(a), unpack_bool(b)) {
                return x == y;
            }
            false
        }
    }
}

pub fn builtin_equal(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [a, b] => Ok(Value::Bool(equal_values(a, b))),
        _ => Err(SchemeError::NumArgs(2, args.to_vec())),
    }
}

pub fn builtin_assert(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [a, b] => {
            if a == b {
                Ok(Value::Bool(true))
            } else {
                Err(SchemeError::Assert("false".to_string()))
            }
        }
        _ => Err(SchemeError::NumArgs(2, args.to_vec())),
    }
}

/// Raise an error with a message built from the arguments
pub fn builtin_error(args: &[Value]) -> Result<Value, SchemeError> {
    fn value_to_error_string(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(), // Remove quotes for error messages
            _ => format!("{}", value),
        }
    }

    let message = match args {
        [] => "Error".to_string(),
        parts => parts
            .iter()
            .map(value_to_error_string)
            .collect::<Vec<_>>()
            .join(" "),
    };
    Err(SchemeError::Default(message))
}

//
// I/O operations
//

/// Call a function on a list of arguments, or on the spread of the
/// remaining arguments.
pub fn io_apply(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [func, Value::List(list_args)] => crate::evaluator::apply(func, list_args),
        [func, rest @ ..] => crate::evaluator::apply(func, rest),
        [] => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

pub fn io_open_input_file(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [Value::String(path)] => {
            let file = File::open(path)
                .map_err(|e| SchemeError::Default(format!("could not open {}: {}", path, e)))?;
            Ok(Value::Port(Rc::new(RefCell::new(PortKind::Input(
                BufReader::new(file),
            )))))
        }
        [other] => Err(SchemeError::TypeMismatch(
            "string".to_string(),
            other.clone(),
        )),
        _ => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

pub fn io_open_output_file(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [Value::String(path)] => {
            let file = File::create(path)
                .map_err(|e| SchemeError::Default(format!("could not open {}: {}", path, e)))?;
            Ok(Value::Port(Rc::new(RefCell::new(PortKind::Output(file)))))
        }
        [other] => Err(SchemeError::TypeMismatch(
            "string".to_string(),
            other.clone(),
        )),
        _ => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

/// Closing a port succeeds for any port value; anything else answers #f
pub fn io_close_port(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [Value::Port(handle)] => {
            *handle.borrow_mut() = PortKind::Closed;
            Ok(Value::Bool(true))
        }
        [_] => Ok(Value::Bool(false)),
        _ => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

/// Read one expression from a line of the given port, or stdin by default
pub fn io_read(args: &[Value]) -> Result<Value, SchemeError> {
    let mut line = String::new();
    match args {
        [] => {
            std::io::stdin()
                .read_line(&mut line)
                .map_err(|e| SchemeError::Default(format!("read failed: {}", e)))?;
        }
        [Value::Port(handle)] => match &mut *handle.borrow_mut() {
            PortKind::Input(reader) => {
                reader
                    .read_line(&mut line)
                    .map_err(|e| SchemeError::Default(format!("read failed: {}", e)))?;
            }
            _ => {
                return Err(SchemeError::TypeMismatch(
                    "input port".to_string(),
                    args[0].clone(),
                ));
            }
        },
        [other] => {
            return Err(SchemeError::TypeMismatch(
                "port".to_string(),
                other.clone(),
            ));
        }
        _ => return Err(SchemeError::NumArgs(1, args.to_vec())),
    }
    parser::parse(line.trim())
}

/// Write the canonical form of a value to the given port, or stdout
pub fn io_write(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [obj] => {
            println!("{}", obj);
            Ok(Value::Bool(true))
        }
        [obj, Value::Port(handle)] => match &mut *handle.borrow_mut() {
            PortKind::Output(file) => {
                writeln!(file, "{}", obj)
                    .map_err(|e| SchemeError::Default(format!("write failed: {}", e)))?;
                Ok(Value::Bool(true))
            }
            _ => Err(SchemeError::TypeMismatch(
                "output port".to_string(),
                args[1].clone(),
            )),
        },
        [_, other] => Err(SchemeError::TypeMismatch(
            "port".to_string(),
            other.clone(),
        )),
        _ => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

pub fn io_read_contents(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [Value::String(path)] => std::fs::read_to_string(path)
            .map(Value::String)
            .map_err(|e| SchemeError::Default(format!("could not read {}: {}", path, e))),
        [other] => Err(SchemeError::TypeMismatch(
            "string".to_string(),
            other.clone(),
        )),
        _ => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

pub fn io_read_all(args: &[Value]) -> Result<Value, SchemeError> {
    match args {
        [Value::String(path)] => {
            let source = std::fs::read_to_string(path)
                .map_err(|e| SchemeError::Default(format!("could not read {}: {}", path, e)))?;
            Ok(Value::List(parser::parse_all(&source)?))
        }
        [other] => Err(SchemeError::TypeMismatch(
            "string".to_string(),
            other.clone(),
        )),
        _ => Err(SchemeError::NumArgs(1, args.to_vec())),
    }
}

/// The pure primitive table
static PURE_OPS: &[BuiltinOp] = &[
    // Arithmetic
    BuiltinOp {
        id: "+",
        kind: OpKind::Pure(builtin_add),
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: "-",
        kind: OpKind::Pure(builtin_sub),
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: "*",
        kind: OpKind::Pure(builtin_mul),
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: "/",
        kind: OpKind::Pure(builtin_div),
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: "mod",
        kind: OpKind::Pure(builtin_mod),
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: "quotient",
        kind: OpKind::Pure(builtin_quotient),
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: "remainder",
        kind: OpKind::Pure(builtin_remainder),
        arity: Arity::AtLeast(2),
    },
    // Numeric comparison
    BuiltinOp {
        id: "=",
        kind: OpKind::Pure(builtin_num_eq),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "<",
        kind: OpKind::Pure(builtin_lt),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: ">",
        kind: OpKind::Pure(builtin_gt),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "<=",
        kind: OpKind::Pure(builtin_le),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: ">=",
        kind: OpKind::Pure(builtin_ge),
        arity: Arity::Exact(2),
    },
    // Logical
    BuiltinOp {
        id: "&&",
        kind: OpKind::Pure(builtin_and),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "||",
        kind: OpKind::Pure(builtin_or),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "not",
        kind: OpKind::Pure(builtin_not),
        arity: Arity::Exact(1),
    },
    // Type predicates
    BuiltinOp {
        id: "number?",
        kind: OpKind::Pure(builtin_is_number),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "list?",
        kind: OpKind::Pure(builtin_is_list),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "symbol?",
        kind: OpKind::Pure(builtin_is_symbol),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "string?",
        kind: OpKind::Pure(builtin_is_string),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "boolean?",
        kind: OpKind::Pure(builtin_is_boolean),
        arity: Arity::Exact(1),
    },
    // Symbol/string coercion
    BuiltinOp {
        id: "symbol->string",
        kind: OpKind::Pure(builtin_symbol_to_string),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "string->symbol",
        kind: OpKind::Pure(builtin_string_to_symbol),
        arity: Arity::Exact(1),
    },
    // Strings
    BuiltinOp {
        id: "make-string",
        kind: OpKind::Pure(builtin_make_string),
        arity: Arity::Range(1, 2),
    },
    BuiltinOp {
        id: "string-length",
        kind: OpKind::Pure(builtin_string_length),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "string-ref",
        kind: OpKind::Pure(builtin_string_ref),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "substring",
        kind: OpKind::Pure(builtin_substring),
        arity: Arity::Exact(3),
    },
    BuiltinOp {
        id: "string-append",
        kind: OpKind::Pure(builtin_string_append),
        arity: Arity::AtLeast(1),
    },
    BuiltinOp {
        id: "string",
        kind: OpKind::Pure(builtin_string),
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "string->list",
        kind: OpKind::Pure(builtin_string_to_list),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "list->string",
        kind: OpKind::Pure(builtin_list_to_string),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "string=?",
        kind: OpKind::Pure(builtin_str_eq),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "string<?",
        kind: OpKind::Pure(builtin_str_lt),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "string>?",
        kind: OpKind::Pure(builtin_str_gt),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "string<=?",
        kind: OpKind::Pure(builtin_str_le),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "string>=?",
        kind: OpKind::Pure(builtin_str_ge),
        arity: Arity::Exact(2),
    },
    // List surgery
    BuiltinOp {
        id: "car",
        kind: OpKind::Pure(builtin_car),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "cdr",
        kind: OpKind::Pure(builtin_cdr),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "cons",
        kind: OpKind::Pure(builtin_cons),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "list",
        kind: OpKind::Pure(builtin_list),
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "null?",
        kind: OpKind::Pure(builtin_null),
        arity: Arity::Exact(1),
    },
    // Equality
    BuiltinOp {
        id: "eq?",
        kind: OpKind::Pure(builtin_eqv),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "eqv?",
        kind: OpKind::Pure(builtin_eqv),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "equal?",
        kind: OpKind::Pure(builtin_equal),
        arity: Arity::Exact(2),
    },
    // Assertion and error raising
    BuiltinOp {
        id: "assert",
        kind: OpKind::Pure(builtin_assert),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "error",
        kind: OpKind::Pure(builtin_error),
        arity: Arity::Any,
    },
];

/// The effectful primitive table
static IO_OPS: &[BuiltinOp] = &[
    BuiltinOp {
        id: "apply",
        kind: OpKind::Io(io_apply),
        arity: Arity::AtLeast(1),
    },
    BuiltinOp {
        id: "open-input-file",
        kind: OpKind::Io(io_open_input_file),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "open-output-file",
        kind: OpKind::Io(io_open_output_file),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "close-input-port",
        kind: OpKind::Io(io_close_port),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "close-output-port",
        kind: OpKind::Io(io_close_port),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "read",
        kind: OpKind::Io(io_read),
        arity: Arity::Range(0, 1),
    },
    BuiltinOp {
        id: "write",
        kind: OpKind::Io(io_write),
        arity: Arity::Range(1, 2),
    },
    BuiltinOp {
        id: "read-contents",
        kind: OpKind::Io(io_read_contents),
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "read-all",
        kind: OpKind::Io(io_read_all),
        arity: Arity::Exact(1),
    },
];

/// Lazy static map from id to BuiltinOp over both tables
static BUILTIN_INDEX: LazyLock<HashMap<&'static str, &'static BuiltinOp>> =
    LazyLock::new(|| {
        PURE_OPS
            .iter()
            .chain(IO_OPS.iter())
            .map(|op| (op.id, op))
            .collect()
    });

/// The pure primitive table (for environment seeding)
pub fn pure_ops() -> &'static [BuiltinOp] {
    PURE_OPS
}

/// The effectful primitive table (for environment seeding)
pub fn io_ops() -> &'static [BuiltinOp] {
    IO_OPS
}

/// Find a builtin op in either table by its id
pub fn find_builtin_op(id: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_INDEX.get(id).copied()
}
