//! Core types for the evaluation engine.

use std::rc::Rc;

use crate::runner::ds::error::EvalError;
use crate::runner::ds::object::{FunctionValue, JsObject, JsObjectRef};
use crate::runner::ds::primitives::{NativeRegistry, Primitives};
use crate::runner::ds::scope::new_scope;
use crate::runner::ds::value::JsValue;

/// Completion record type.
/// Statements either complete normally or signal a control-flow exit that
/// propagates until a loop, switch or function boundary absorbs it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompletionType {
    /// Normal completion - execution continues.
    Normal,
    /// Return completion - consumed by the nearest function call.
    Return,
    /// Break completion - consumed by the nearest loop/switch.
    Break,
    /// Continue completion - consumed by the nearest loop.
    Continue,
}

/// Completion record.
/// Every statement evaluation returns one; thrown errors travel as
/// `Err(EvalError)` instead and only `try` statements intercept them.
pub struct Completion {
    pub completion_type: CompletionType,
    pub value: Option<JsValue>,
}

impl Completion {
    pub fn normal() -> Self {
        Completion {
            completion_type: CompletionType::Normal,
            value: None,
        }
    }

    pub fn normal_with_value(value: JsValue) -> Self {
        Completion {
            completion_type: CompletionType::Normal,
            value: Some(value),
        }
    }

    pub fn return_value(value: JsValue) -> Self {
        Completion {
            completion_type: CompletionType::Return,
            value: Some(value),
        }
    }

    pub fn break_completion() -> Self {
        Completion {
            completion_type: CompletionType::Break,
            value: None,
        }
    }

    pub fn continue_completion() -> Self {
        Completion {
            completion_type: CompletionType::Continue,
            value: None,
        }
    }

    pub fn is_normal(&self) -> bool {
        matches!(self.completion_type, CompletionType::Normal)
    }

    pub fn is_abrupt(&self) -> bool {
        !self.is_normal()
    }

    /// The carried value, or undefined if none.
    pub fn get_value(&self) -> JsValue {
        self.value.clone().unwrap_or(JsValue::Undefined)
    }
}

/// Result type for statement evaluation.
pub type EvalResult = Result<Completion, EvalError>;

/// Result type for value-returning operations.
pub type ValueResult = Result<JsValue, EvalError>;

/// Per-loop iteration counter. Exceeding the ceiling is fatal and is never
/// catchable by sandboxed `try` statements.
pub struct LoopChecker {
    count: usize,
    max: usize,
}

impl LoopChecker {
    pub fn new(max: usize) -> Self {
        LoopChecker { count: 0, max }
    }

    pub fn check(&mut self) -> Result<(), EvalError> {
        self.count += 1;
        if self.count > self.max {
            Err(EvalError::InfiniteLoop)
        } else {
            Ok(())
        }
    }
}

/// Evaluation context threaded through every dispatch: the wrapper
/// registry view, the declaration scope of the current invocation and the
/// innermost block scope.
pub struct EvalContext {
    primitives: Primitives,
    pub decl_scope: JsObjectRef,
    pub block_scope: JsObjectRef,
    pub max_iterations: usize,
    safe_function: JsValue,
}

impl EvalContext {
    /// Context for a top-level evaluation (or one function invocation)
    /// whose declaration scope is `scope`. Ensures the wrapped builtin
    /// constructors are reachable from it.
    pub fn new(scope: JsObjectRef, natives: &Rc<NativeRegistry>, max_iterations: usize) -> Self {
        let primitives = Primitives::ensure(&scope, natives);
        let safe_function = JsValue::Object(JsObject::new_function(
            FunctionValue::SafeFunctionCtor {
                scope: new_scope(Some(&scope)),
            },
            Some(natives.function_proto.clone()),
        ));
        EvalContext {
            primitives,
            decl_scope: scope.clone(),
            block_scope: scope,
            max_iterations,
            safe_function,
        }
    }

    /// Child context for calling into a scripted function.
    pub fn for_call(&self, decl_scope: JsObjectRef) -> EvalContext {
        EvalContext::new(decl_scope, self.primitives.natives(), self.max_iterations)
    }

    pub fn primitives(&self) -> &Primitives {
        &self.primitives
    }

    /// The sandboxed substitute handed out whenever a member read would
    /// surface the real `Function` constructor.
    pub fn safe_function(&self) -> JsValue {
        self.safe_function.clone()
    }

    pub fn push_block_scope(&mut self) {
        self.block_scope = new_scope(Some(&self.block_scope));
    }

    pub fn pop_block_scope(&mut self) {
        let parent = self.block_scope.borrow().proto.clone();
        self.block_scope = parent.expect("block scope underflow");
    }
}
