use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::rc::Rc;

use crate::SchemeError;
use crate::ast::{Value, nil};
use crate::builtinops::{find_builtin_op, io_ops, pure_ops};
use crate::parser;

/// Environment for variable bindings.
///
/// Frames are shared through `Rc<RefCell<..>>` so that a closure and its
/// defining scope see the same bindings: a `set!` through one is visible
/// through the other. Recursive definitions make the frame own a closure
/// that points back at the frame; that reference cycle is never collected,
/// which is the documented trade-off of this representation.
#[derive(Clone, Default)]
pub struct Environment {
    head: Rc<RefCell<Frame>>,
}

#[derive(Default)]
struct Frame {
    bindings: HashMap<String, Value>,
    parent: Option<Environment>,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    /// Create a frame whose lookups fall through to this environment
    pub fn child(&self) -> Environment {
        Environment {
            head: Rc::new(RefCell::new(Frame {
                bindings: HashMap::new(),
                parent: Some(self.clone()),
            })),
        }
    }

    /// Look a name up along the frame chain, innermost first
    pub fn get(&self, name: &str) -> Option<Value> {
        let frame = self.head.borrow();
        match frame.bindings.get(name) {
            Some(value) => Some(value.clone()),
            None => frame.parent.as_ref().and_then(|parent| parent.get(name)),
        }
    }

    /// Bind or rebind a name in the innermost frame
    pub fn define(&self, name: &str, value: Value) {
        self.head.borrow_mut().bindings.insert(name.to_string(), value);
    }

    /// Update the nearest existing binding in place. Returns false when the
    /// name is bound nowhere in the chain.
    pub fn set(&self, name: &str, value: Value) -> bool {
        let mut frame = self.head.borrow_mut();
        if let Some(slot) = frame.bindings.get_mut(name) {
            *slot = value;
            true
        } else {
            match &frame.parent {
                Some(parent) => parent.set(name, value),
                None => false,
            }
        }
    }
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        // Frame identity; structural comparison would chase reference cycles
        Rc::ptr_eq(&self.head, &other.head)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Frames form cycles through closures, so no recursive debug output
        write!(f, "Environment({:p})", Rc::as_ptr(&self.head))
    }
}

/// Evaluate an expression in the given environment
pub fn eval(expr: &Value, env: &Environment) -> Result<Value, SchemeError> {
    match expr {
        // Self-evaluating forms
        Value::String(_)
        | Value::Char(_)
        | Value::Bool(_)
        | Value::Number(_)
        | Value::Float(_)
        | Value::Rational(..)
        | Value::Complex(..)
        | Value::Vector(_)
        | Value::Port(_)
        | Value::BuiltinFunction { .. }
        | Value::IoFunction { .. }
        | Value::Function { .. } => Ok(expr.clone()),

        // `else` always evaluates to #t so a cond else-clause is just a
        // clause whose predicate is true
        Value::Symbol(name) if name == "else" => Ok(Value::Bool(true)),

        // Variable lookup
        Value::Symbol(name) => env.get(name).ok_or_else(|| {
            SchemeError::UnboundVar("Getting an unbound variable".to_string(), name.clone())
        }),

        // Special forms and function application
        Value::List(elements) => eval_list(elements, env),

        Value::DottedList(..) => Err(SchemeError::BadSpecialForm(
            "Unrecognized special form".to_string(),
            expr.clone(),
        )),
    }
}

/// Evaluate a list form: dispatch on the head symbol for special forms,
/// fall through to function application for everything else.
fn eval_list(elements: &[Value], env: &Environment) -> Result<Value, SchemeError> {
    match elements {
        [] => Err(SchemeError::BadSpecialForm(
            "Unrecognized special form".to_string(),
            nil(),
        )),
        [Value::Symbol(head), args @ ..] => match head.as_str() {
            "quote" => match args {
                [datum] => Ok(datum.clone()),
                _ => Err(bad_form("quote requires a single datum", elements)),
            },
            "if" => eval_if(args, env),
            "set!" => eval_set(args, env),
            "define" => eval_define(args, env),
            "lambda" => eval_lambda(args, env),
            "load" => match args {
                [Value::String(path)] => load_file(env, path),
                _ => Err(bad_form("load requires a file path string", elements)),
            },
            "cond" => eval_cond(args, env),
            "case" => eval_case(args, env),
            _ => eval_application(elements, env),
        },
        _ => eval_application(elements, env),
    }
}

fn bad_form(msg: &str, elements: &[Value]) -> SchemeError {
    SchemeError::BadSpecialForm(msg.to_string(), Value::List(elements.to_vec()))
}

/// Evaluate if: any non-#f predicate value selects the then-branch
fn eval_if(args: &[Value], env: &Environment) -> Result<Value, SchemeError> {
    match args {
        [condition_expr, then_expr, else_expr] => {
            if eval(condition_expr, env)?.is_truthy() {
                eval(then_expr, env)
            } else {
                eval(else_expr, env)
            }
        }
        _ => Err(bad_form("if requires a predicate and two branches", args)),
    }
}

/// Evaluate set!: assignment to an existing binding anywhere in the chain
fn eval_set(args: &[Value], env: &Environment) -> Result<Value, SchemeError> {
    match args {
        [Value::Symbol(name), form] => {
            let value = eval(form, env)?;
            if env.set(name, value.clone()) {
                Ok(value)
            } else {
                Err(SchemeError::UnboundVar(
                    "Setting an unbound variable".to_string(),
                    name.clone(),
                ))
            }
        }
        _ => Err(bad_form("set! requires a name and a form", args)),
    }
}

/// Evaluate define, in its value form and both function-shorthand forms
fn eval_define(args: &[Value], env: &Environment) -> Result<Value, SchemeError> {
    match args {
        [Value::Symbol(name), form] => {
            let value = eval(form, env)?;
            env.define(name, value.clone());
            Ok(value)
        }
        // (define (name p1 ... pn) body...)
        [Value::List(signature), body @ ..] => {
            let (name, params) = split_signature(signature, args)?;
            let function = make_function(params, None, body, env, args)?;
            env.define(name, function.clone());
            Ok(function)
        }
        // (define (name p1 ... pn . rest) body...), arriving as a
        // DottedList in the signature position
        [Value::DottedList(signature, tail), body @ ..] => {
            let (name, params) = split_signature(signature, args)?;
            let vararg = vararg_name(tail, args)?;
            let function = make_function(params, Some(vararg), body, env, args)?;
            env.define(name, function.clone());
            Ok(function)
        }
        _ => Err(bad_form("Malformed define", args)),
    }
}

/// Evaluate lambda in all three parameter shapes
fn eval_lambda(args: &[Value], env: &Environment) -> Result<Value, SchemeError> {
    match args {
        [Value::List(params), body @ ..] => make_function(params, None, body, env, args),
        [Value::DottedList(params, tail), body @ ..] => {
            let vararg = vararg_name(tail, args)?;
            make_function(params, Some(vararg), body, env, args)
        }
        // (lambda rest body...): every argument collects into one list
        [Value::Symbol(rest), body @ ..] => {
            make_function(&[], Some(rest.clone()), body, env, args)
        }
        _ => Err(bad_form("Malformed lambda", args)),
    }
}

/// Split `(name p1 ... pn)` into the defined name and the parameter list
fn split_signature<'a>(
    signature: &'a [Value],
    args: &[Value],
) -> Result<(&'a str, &'a [Value]), SchemeError> {
    match signature {
        [Value::Symbol(name), params @ ..] => Ok((name, params)),
        _ => Err(bad_form("define requires a function name", args)),
    }
}

fn vararg_name(tail: &Value, args: &[Value]) -> Result<String, SchemeError> {
    match tail {
        Value::Symbol(name) => Ok(name.clone()),
        _ => Err(bad_form("Rest parameter must be a symbol", args)),
    }
}

fn make_function(
    params: &[Value],
    vararg: Option<String>,
    body: &[Value],
    env: &Environment,
    args: &[Value],
) -> Result<Value, SchemeError> {
    if body.is_empty() {
        return Err(bad_form("Function requires a body", args));
    }
    let mut names = Vec::with_capacity(params.len());
    for param in params {
        match param {
            Value::Symbol(name) => names.push(name.clone()),
            other => {
                return Err(SchemeError::BadSpecialForm(
                    "Malformed parameter list".to_string(),
                    other.clone(),
                ));
            }
        }
    }
    Ok(Value::Function {
        params: names,
        vararg,
        body: body.to_vec(),
        env: env.clone(),
    })
}

/// Evaluate cond: pick the first clause whose predicate is truthy. An
/// else-clause matches through the `else` evaluation rule.
fn eval_cond(args: &[Value], env: &Environment) -> Result<Value, SchemeError> {
    for clause in args {
        match clause {
            Value::List(parts) if parts.len() == 2 => {
                if eval(&parts[0], env)?.is_truthy() {
                    return eval(&parts[1], env);
                }
            }
            other => {
                return Err(SchemeError::BadSpecialForm(
                    "Ill-formed cond clause".to_string(),
                    other.clone(),
                ));
            }
        }
    }
    Err(bad_form("No matching cond clause", args))
}

/// Evaluate case: compare the key against each clause's datum list with
/// eqv? semantics, falling back to an else clause when present.
fn eval_case(args: &[Value], env: &Environment) -> Result<Value, SchemeError> {
    let (key_expr, clauses) = match args {
        [key_expr, clauses @ ..] if !clauses.is_empty() => (key_expr, clauses),
        _ => return Err(bad_form("case requires a key and clauses", args)),
    };

    let key = eval(key_expr, env)?;
    for clause in clauses {
        match clause {
            Value::List(parts) if parts.len() == 2 => match &parts[0] {
                Value::Symbol(s) if s == "else" => return eval(&parts[1], env),
                Value::List(datums) => {
                    if datums.iter().any(|datum| datum == &key) {
                        return eval(&parts[1], env);
                    }
                }
                _ => {
                    return Err(SchemeError::BadSpecialForm(
                        "Ill-formed case clause".to_string(),
                        clause.clone(),
                    ));
                }
            },
            other => {
                return Err(SchemeError::BadSpecialForm(
                    "Ill-formed case clause".to_string(),
                    other.clone(),
                ));
            }
        }
    }
    Err(bad_form("No matching case clause", args))
}

/// Function application: evaluate the head, then the arguments left to
/// right, then apply.
fn eval_application(elements: &[Value], env: &Environment) -> Result<Value, SchemeError> {
    let func = eval(&elements[0], env)?;
    let mut args = Vec::with_capacity(elements.len() - 1);
    for arg_expr in &elements[1..] {
        args.push(eval(arg_expr, env)?);
    }
    apply(&func, &args)
}

/// Apply a function value to already-evaluated arguments.
///
/// Builtins are arity-checked against the registry. User functions get a
/// fresh frame over their captured environment with parameters bound in
/// order and any leftovers collected under the rest parameter.
pub fn apply(func: &Value, args: &[Value]) -> Result<Value, SchemeError> {
    match func {
        Value::BuiltinFunction { id, func } | Value::IoFunction { id, func } => {
            if let Some(op) = find_builtin_op(id) {
                op.arity.validate(args)?;
            }
            func(args)
        }
        Value::Function {
            params,
            vararg,
            body,
            env,
        } => {
            let exact_mismatch = vararg.is_none() && args.len() != params.len();
            let variadic_mismatch = vararg.is_some() && args.len() < params.len();
            if exact_mismatch || variadic_mismatch {
                return Err(SchemeError::NumArgs(params.len(), args.to_vec()));
            }

            let frame = env.child();
            for (param, arg) in params.iter().zip(args) {
                frame.define(param, arg.clone());
            }
            if let Some(rest) = vararg {
                frame.define(rest, Value::List(args[params.len()..].to_vec()));
            }

            let mut result = nil();
            for expr in body {
                result = eval(expr, &frame)?;
            }
            Ok(result)
        }
        other => Err(SchemeError::NotFunction(
            "Attempt to apply non-function".to_string(),
            other.to_string(),
        )),
    }
}

/// Read a file, parse every expression in it and evaluate them in order.
/// Returns the value of the last expression, or nil for an empty file.
pub fn load_file(env: &Environment, path: &str) -> Result<Value, SchemeError> {
    let source = fs::read_to_string(path)
        .map_err(|e| SchemeError::Default(format!("could not read {}: {}", path, e)))?;
    let mut result = nil();
    for expr in parser::parse_all(&source)? {
        result = eval(&expr, env)?;
    }
    Ok(result)
}

/// Create the root environment with both builtin tables installed
pub fn create_global_env() -> Environment {
    let env = Environment::new();

    for op in pure_ops() {
        env.define(
            op.id,
            Value::BuiltinFunction {
                id: op.id.to_string(),
                func: op.func(),
            },
        );
    }
    for op in io_ops() {
        env.define(
            op.id,
            Value::IoFunction {
                id: op.id.to_string(),
                func: op.func(),
            },
        );
    }

    env
}
