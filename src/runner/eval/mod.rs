//! The tree-walking sandboxed evaluator.

pub mod expression;
pub mod function;
pub mod statement;
pub mod types;

pub use types::{Completion, CompletionType, EvalContext, LoopChecker};
