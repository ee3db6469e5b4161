//! Argument checking for host functions exposed to scripts.
//!
//! Host functions are registered for every argument count up to
//! [`MAX_CHECKED_ARITY`] with untyped parameters, so a wrong call still
//! reaches the function and is reported with all of its problems at once.
//! Positions count the receiver as argument #1.

use crate::error::{ScriptResult, runtime_error};
use rhai::{Dynamic, Engine};
use std::fmt;

pub const MAX_CHECKED_ARITY: usize = 5;

/// One problem with a host function call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallViolation {
    Receiver { expected: &'static str, got: String },
    TooFewArguments { expected: usize, got: usize },
    TooManyArguments { expected: usize, got: usize },
    ArgumentType {
        position: usize,
        expected: &'static str,
        got: String,
    },
}

impl fmt::Display for CallViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallViolation::Receiver { expected, got } => {
                write!(f, "bad receiver ({expected} expected, got {got})")
            }
            CallViolation::TooFewArguments { expected, got } => {
                write!(f, "not enough arguments (expected {expected}, got {got})")
            }
            CallViolation::TooManyArguments { expected, got } => {
                write!(f, "too many arguments (expected {expected}, got {got})")
            }
            CallViolation::ArgumentType {
                position,
                expected,
                got,
            } => write!(f, "bad argument #{position} ({expected} expected, got {got})"),
        }
    }
}

/// Every violation found in one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallValidationError {
    pub function: &'static str,
    pub violations: Vec<CallViolation>,
}

impl fmt::Display for CallValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid call to '{}': ", self.function)?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CallValidationError {}

/// How a value is named in violation messages.
pub fn describe(value: &Dynamic) -> String {
    if let Some(handle) = value.clone().try_cast::<crate::handles::HostHandle>() {
        return handle.kind().name().to_string();
    }
    match value.type_name() {
        "()" => "unit".to_string(),
        "i64" | "i32" => "integer".to_string(),
        "f64" | "f32" => "float".to_string(),
        other => other.to_string(),
    }
}

/// Accumulates violations for a single call.
pub struct CallCheck<'a> {
    function: &'static str,
    args: &'a [Dynamic],
    violations: Vec<CallViolation>,
}

impl<'a> CallCheck<'a> {
    pub fn new(function: &'static str, args: &'a [Dynamic]) -> Self {
        Self {
            function,
            args,
            violations: Vec::new(),
        }
    }

    /// Check argument #1 with `extract`, which returns `None` on a kind
    /// mismatch.
    pub fn receiver<T>(
        &mut self,
        expected: &'static str,
        extract: impl FnOnce(&Dynamic) -> Option<T>,
    ) -> Option<T> {
        let Some(value) = self.args.first() else {
            self.violations.push(CallViolation::Receiver {
                expected,
                got: "no value".to_string(),
            });
            return None;
        };
        let extracted = extract(value);
        if extracted.is_none() {
            self.violations.push(CallViolation::Receiver {
                expected,
                got: describe(value),
            });
        }
        extracted
    }

    /// Check the total argument count, receiver included.
    pub fn arity(&mut self, expected: usize) {
        let got = self.args.len();
        if got < expected {
            self.violations
                .push(CallViolation::TooFewArguments { expected, got });
        } else if got > expected {
            self.violations
                .push(CallViolation::TooManyArguments { expected, got });
        }
    }

    /// Check that argument `position` (1-based) is a string.
    pub fn string(&mut self, position: usize) -> Option<String> {
        let Some(value) = self.args.get(position - 1) else {
            self.violations.push(CallViolation::ArgumentType {
                position,
                expected: "string",
                got: "no value".to_string(),
            });
            return None;
        };
        if value.is_string() {
            return Some(value.to_string());
        }
        self.violations.push(CallViolation::ArgumentType {
            position,
            expected: "string",
            got: describe(value),
        });
        None
    }

    pub fn finish(self) -> Result<(), CallValidationError> {
        if self.violations.is_empty() {
            return Ok(());
        }
        Err(CallValidationError {
            function: self.function,
            violations: self.violations,
        })
    }
}

/// Report a failed check to the running script.
pub fn into_script_error(err: CallValidationError) -> Box<rhai::EvalAltResult> {
    runtime_error(err.to_string())
}

/// Register `body` under `name` for 0 to [`MAX_CHECKED_ARITY`] arguments.
pub fn register_checked<F>(engine: &mut Engine, name: &'static str, body: F)
where
    F: Fn(&[Dynamic]) -> ScriptResult<Dynamic> + Clone + Send + Sync + 'static,
{
    let f = body.clone();
    engine.register_fn(name, move || f(&[]));
    let f = body.clone();
    engine.register_fn(name, move |a: Dynamic| f(&[a]));
    let f = body.clone();
    engine.register_fn(name, move |a: Dynamic, b: Dynamic| f(&[a, b]));
    let f = body.clone();
    engine.register_fn(name, move |a: Dynamic, b: Dynamic, c: Dynamic| f(&[a, b, c]));
    let f = body.clone();
    engine.register_fn(name, move |a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| {
        f(&[a, b, c, d])
    });
    engine.register_fn(
        name,
        move |a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic, e: Dynamic| body(&[a, b, c, d, e]),
    );
}
