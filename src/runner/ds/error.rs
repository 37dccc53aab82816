use std::fmt;
use std::fmt::{Display, Formatter};

use crate::runner::ds::value::JsValue;

#[derive(Debug)]
pub enum EvalError {
    ReferenceError(String),
    TypeError(String),
    SyntaxError(String),
    /// Node kind the dispatch table has no entry for, with its source span.
    UnsupportedSyntax(String),
    InfiniteLoop,
    /// A value raised by evaluated code, catchable by its `try` statements.
    Thrown(JsValue),
}

impl EvalError {
    pub fn new_copy(other: &Self) -> Self {
        match other {
            EvalError::ReferenceError(m) => EvalError::ReferenceError(m.to_string()),
            EvalError::TypeError(m) => EvalError::TypeError(m.to_string()),
            EvalError::SyntaxError(m) => EvalError::SyntaxError(m.to_string()),
            EvalError::UnsupportedSyntax(m) => EvalError::UnsupportedSyntax(m.to_string()),
            EvalError::InfiniteLoop => EvalError::InfiniteLoop,
            EvalError::Thrown(v) => EvalError::Thrown(v.clone()),
        }
    }
}

impl Display for EvalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::ReferenceError(m) => write!(f, "ReferenceError: {}", m),
            EvalError::TypeError(m) => write!(f, "TypeError: {}", m),
            EvalError::SyntaxError(m) => write!(f, "SyntaxError: {}", m),
            EvalError::UnsupportedSyntax(m) => write!(f, "Unsupported expression: {}", m),
            EvalError::InfiniteLoop => {
                write!(f, "Infinite loop detected - reached max iterations")
            }
            EvalError::Thrown(v) => write!(f, "Uncaught {}", v),
        }
    }
}
