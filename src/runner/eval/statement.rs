//! Statement execution.
//!
//! Statements produce completion records. Loops absorb `break`, honor
//! `continue` and propagate `return`; the switch reproduces fallthrough
//! with default-restart; every loop carries the iteration guard.

use crate::parser::ast::{
    BlockStatementData, ForInData, ForInLeft, ForInit, ProgramData, StatementType, SwitchCaseData,
    VariableDeclarationData, VariableDeclarationKind,
};
use crate::runner::ds::error::EvalError;
use crate::runner::ds::object::enumerable_keys;
use crate::runner::ds::scope::{can_set_property, object_for_key};
use crate::runner::ds::value::JsValue;

use super::expression::{evaluate_expression, strict_equality, to_boolean};
use super::function::make_function;
use super::types::{Completion, CompletionType, EvalContext, EvalResult, LoopChecker};

/// Evaluate a whole program: the last statement's value, or the payload of
/// a `return` that reached the top.
pub fn execute_program(program: &ProgramData, ctx: &mut EvalContext) -> Result<JsValue, EvalError> {
    let completion = execute_statement_list(&program.body, ctx)?;
    Ok(completion.get_value())
}

/// Run statements in order; an abrupt completion short-circuits the rest.
/// Empty statements are skipped without clobbering the last value.
pub fn execute_statement_list(statements: &[StatementType], ctx: &mut EvalContext) -> EvalResult {
    let mut completion = Completion::normal();
    for statement in statements {
        if matches!(statement, StatementType::EmptyStatement { .. }) {
            continue;
        }
        completion = execute_statement(statement, ctx)?;
        if completion.is_abrupt() {
            return Ok(completion);
        }
    }
    Ok(completion)
}

/// Execute a statement and return its completion.
pub fn execute_statement(statement: &StatementType, ctx: &mut EvalContext) -> EvalResult {
    match statement {
        StatementType::EmptyStatement { .. } => Ok(Completion::normal()),

        StatementType::ExpressionStatement { expression, .. } => {
            let value = evaluate_expression(expression, ctx)?;
            Ok(Completion::normal_with_value(value))
        }

        StatementType::BlockStatement(block) => execute_block_statement(block, ctx),

        StatementType::FunctionDeclaration(data) => {
            let scope = ctx.block_scope.clone();
            let value = make_function(data, &scope, ctx);
            if let Some(id) = &data.id {
                ctx.decl_scope.borrow_mut().set_own(&id.name, value.clone());
            }
            Ok(Completion::normal_with_value(value))
        }

        StatementType::ReturnStatement { argument, .. } => {
            let value = match argument {
                Some(argument) => evaluate_expression(argument, ctx)?,
                None => JsValue::Undefined,
            };
            Ok(Completion::return_value(value))
        }

        StatementType::BreakStatement { .. } => Ok(Completion::break_completion()),

        StatementType::ContinueStatement { .. } => Ok(Completion::continue_completion()),

        StatementType::VariableDeclaration(declaration) => {
            execute_variable_declaration(declaration, ctx)
        }

        StatementType::IfStatement {
            test,
            consequent,
            alternate,
            ..
        } => {
            let test_value = evaluate_expression(test, ctx)?;
            if to_boolean(&test_value) {
                execute_statement(consequent, ctx)
            } else if let Some(alternate) = alternate {
                execute_statement(alternate, ctx)
            } else {
                Ok(Completion::normal())
            }
        }

        StatementType::SwitchStatement {
            discriminant,
            cases,
            ..
        } => {
            let value = evaluate_expression(discriminant, ctx)?;
            ctx.push_block_scope();
            let result = execute_switch_cases(&value, cases, ctx);
            ctx.pop_block_scope();
            result
        }

        StatementType::WhileStatement { test, body, .. } => {
            let mut checker = LoopChecker::new(ctx.max_iterations);
            loop {
                checker.check()?;
                let test_value = evaluate_expression(test, ctx)?;
                if !to_boolean(&test_value) {
                    break;
                }
                let completion = execute_statement(body, ctx)?;
                match completion.completion_type {
                    CompletionType::Break => break,
                    CompletionType::Continue | CompletionType::Normal => {}
                    CompletionType::Return => return Ok(completion),
                }
            }
            Ok(Completion::normal())
        }

        StatementType::ForStatement {
            init,
            test,
            update,
            body,
            ..
        } => {
            // one persistent block layer for the whole statement
            ctx.push_block_scope();
            let result = execute_for_statement(
                init.as_ref(),
                test.as_ref(),
                update.as_ref(),
                body,
                ctx,
            );
            ctx.pop_block_scope();
            result
        }

        StatementType::ForInStatement(data) => {
            let value = evaluate_expression(&data.right, ctx)?;
            ctx.push_block_scope();
            let result = execute_for_in_statement(data, value, ctx);
            ctx.pop_block_scope();
            result
        }

        StatementType::TryStatement {
            block,
            handler,
            finalizer,
            ..
        } => {
            let outcome = execute_try_and_catch(block, handler.as_ref(), ctx);
            // the finalizer runs on every exit path
            if let Some(finalizer) = finalizer {
                let finally_completion = execute_block_statement(finalizer, ctx)?;
                if finally_completion.is_abrupt() {
                    return Ok(finally_completion);
                }
            }
            outcome
        }
    }
}

fn execute_block_statement(block: &BlockStatementData, ctx: &mut EvalContext) -> EvalResult {
    ctx.push_block_scope();
    let result = execute_statement_list(&block.body, ctx);
    ctx.pop_block_scope();
    result
}

/// `let` installs into the block layer; `var` and `const` into the
/// declaration scope. An initializer-less declaration only resets a
/// binding that does not exist yet (hoisting already created most).
fn execute_variable_declaration(
    declaration: &VariableDeclarationData,
    ctx: &mut EvalContext,
) -> EvalResult {
    for declarator in &declaration.declarations {
        let target = if declaration.kind == VariableDeclarationKind::Let {
            ctx.block_scope.clone()
        } else {
            ctx.decl_scope.clone()
        };
        match &declarator.init {
            Some(init) => {
                let value = evaluate_expression(init, ctx)?;
                target.borrow_mut().set_own(&declarator.id.name, value);
            }
            None => {
                if !target.borrow().has_own(&declarator.id.name) {
                    target
                        .borrow_mut()
                        .set_own(&declarator.id.name, JsValue::Undefined);
                }
            }
        }
    }
    Ok(Completion::normal())
}

/// Fallthrough semantics: once a case test matches, all following case
/// bodies run regardless of their own tests, until a `break` or the end.
/// When nothing matched, execution restarts from the `default` case.
fn execute_switch_cases(
    value: &JsValue,
    cases: &[SwitchCaseData],
    ctx: &mut EvalContext,
) -> EvalResult {
    let mut default_case: Option<usize> = None;
    let mut matched = false;
    let mut index = 0;

    loop {
        if index < cases.len() {
            let case = &cases[index];
            match &case.test {
                Some(test) => {
                    if !matched {
                        let test_value = evaluate_expression(test, ctx)?;
                        matched = strict_equality(&test_value, value);
                    }
                }
                None => {
                    if default_case.is_none() {
                        default_case = Some(index);
                    }
                }
            }
            if matched {
                let completion = execute_statement_list(&case.consequent, ctx)?;
                match completion.completion_type {
                    CompletionType::Break => return Ok(Completion::normal()),
                    CompletionType::Return | CompletionType::Continue => return Ok(completion),
                    CompletionType::Normal => {}
                }
            }
            index += 1;
        } else if !matched && default_case.is_some() {
            // go back and run the default handler
            index = default_case.unwrap();
            matched = true;
        } else {
            return Ok(Completion::normal());
        }
    }
}

fn execute_for_statement(
    init: Option<&ForInit>,
    test: Option<&crate::parser::ast::ExpressionType>,
    update: Option<&crate::parser::ast::ExpressionType>,
    body: &StatementType,
    ctx: &mut EvalContext,
) -> EvalResult {
    match init {
        Some(ForInit::VariableDeclaration(declaration)) => {
            execute_variable_declaration(declaration, ctx)?;
        }
        Some(ForInit::Expression(expression)) => {
            evaluate_expression(expression, ctx)?;
        }
        None => {}
    }

    let mut checker = LoopChecker::new(ctx.max_iterations);
    loop {
        checker.check()?;
        if let Some(test) = test {
            let test_value = evaluate_expression(test, ctx)?;
            if !to_boolean(&test_value) {
                break;
            }
        }
        let completion = execute_statement(body, ctx)?;
        match completion.completion_type {
            CompletionType::Break => break,
            CompletionType::Continue | CompletionType::Normal => {}
            CompletionType::Return => return Ok(completion),
        }
        if let Some(update) = update {
            evaluate_expression(update, ctx)?;
        }
    }
    Ok(Completion::normal())
}

/// Enumerates the right-hand value's keys. A `let` loop variable binds in
/// the block layer; anything else writes through the declaration chain.
fn execute_for_in_statement(
    data: &ForInData,
    value: JsValue,
    ctx: &mut EvalContext,
) -> EvalResult {
    let keys: Vec<String> = match &value {
        JsValue::Object(o) => enumerable_keys(o),
        JsValue::String(s) => (0..s.chars().count()).map(|i| i.to_string()).collect(),
        _ => vec![],
    };

    let (name, to_block) = match &data.left {
        ForInLeft::Declaration { kind, id } => {
            let to_block = *kind == VariableDeclarationKind::Let;
            if to_block {
                ctx.block_scope
                    .borrow_mut()
                    .set_own(&id.name, JsValue::Undefined);
            }
            (id.name.clone(), to_block)
        }
        ForInLeft::Identifier(id) => (id.name.clone(), false),
    };

    let mut checker = LoopChecker::new(ctx.max_iterations);
    for key in keys {
        checker.check()?;
        if to_block {
            ctx.block_scope
                .borrow_mut()
                .set_own(&name, JsValue::String(key));
        } else {
            let scope = ctx.decl_scope.clone();
            let owner = object_for_key(&scope, &name, ctx.primitives());
            let target = JsValue::Object(owner);
            if can_set_property(&target, &name, ctx.primitives()) {
                if let JsValue::Object(o) = &target {
                    o.borrow_mut().set_own(&name, JsValue::String(key));
                }
            }
        }
        let completion = execute_statement(&data.body, ctx)?;
        match completion.completion_type {
            CompletionType::Break => break,
            CompletionType::Continue | CompletionType::Normal => {}
            CompletionType::Return => return Ok(completion),
        }
    }
    Ok(Completion::normal())
}

/// The catch parameter binds inside a fresh block layer. The iteration
/// guard's error is fatal and passes through uncaught.
fn execute_try_and_catch(
    block: &BlockStatementData,
    handler: Option<&crate::parser::ast::CatchClauseData>,
    ctx: &mut EvalContext,
) -> EvalResult {
    match execute_block_statement(block, ctx) {
        Ok(completion) => Ok(completion),
        Err(EvalError::InfiniteLoop) => Err(EvalError::InfiniteLoop),
        Err(error) => match handler {
            Some(clause) => {
                ctx.push_block_scope();
                ctx.block_scope
                    .borrow_mut()
                    .set_own(&clause.param.name, error_to_js_value(error));
                let result = execute_block_statement(&clause.body, ctx);
                ctx.pop_block_scope();
                result
            }
            None => Err(error),
        },
    }
}

/// What the catch parameter sees: thrown sandbox values as themselves,
/// engine errors as their message string.
fn error_to_js_value(error: EvalError) -> JsValue {
    match error {
        EvalError::Thrown(value) => value,
        other => JsValue::String(other.to_string()),
    }
}
