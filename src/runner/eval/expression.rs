//! Expression evaluation.
//!
//! One dispatch arm per supported node kind. Deviations from naive host
//! evaluation are deliberate sandbox semantics: equality is strict-only,
//! literals construct through the wrapped constructors in scope, and a
//! member read can never surface the real `Function` constructor.

use crate::parser::ast::{
    AssignmentOperator, BinaryOperator, ExpressionType, LiteralData, LiteralType, LogicalOperator,
    MemberExpressionType, NumberLiteralType, UnaryOperator, UpdateOperator,
};
use crate::runner::ds::error::EvalError;
use crate::runner::ds::object::{self, has_property_raw, JsObjectRef, ObjectKind};
use crate::runner::ds::scope::{can_set_property, get_value, has_property, object_for_key};
use crate::runner::ds::value::{JsNumberType, JsValue};
use crate::runner::std_lib::regexp;

use super::function::{apply_new, call_value, make_function};
use super::types::{EvalContext, ValueResult};

/// Evaluate an expression and return its value.
pub fn evaluate_expression(expr: &ExpressionType, ctx: &mut EvalContext) -> ValueResult {
    match expr {
        ExpressionType::Literal(lit) => evaluate_literal(lit, ctx),

        ExpressionType::Identifier(id) => {
            if id.name == "undefined" {
                Ok(JsValue::Undefined)
            } else if has_property(&ctx.block_scope, &id.name, ctx.primitives()) {
                Ok(get_value(&ctx.block_scope, &id.name, ctx.primitives()))
            } else {
                Err(EvalError::ReferenceError(format!(
                    "{} is not defined",
                    id.name
                )))
            }
        }

        ExpressionType::ThisExpression { .. } => {
            Ok(get_value(&ctx.block_scope, "this", ctx.primitives()))
        }

        ExpressionType::ArrayExpression { elements, .. } => {
            evaluate_array_expression(elements, ctx)
        }

        ExpressionType::ObjectExpression { properties, .. } => {
            evaluate_object_expression(properties, ctx)
        }

        ExpressionType::FunctionExpression(data) => {
            let scope = ctx.block_scope.clone();
            Ok(make_function(data, &scope, ctx))
        }

        ExpressionType::UnaryExpression {
            operator, argument, ..
        } => evaluate_unary_expression(operator, argument, ctx),

        ExpressionType::UpdateExpression {
            operator, argument, ..
        } => {
            let operator = match operator {
                UpdateOperator::PlusPlus => SetOperator::Increment,
                UpdateOperator::MinusMinus => SetOperator::Decrement,
            };
            set_value(argument, None, operator, ctx)
        }

        ExpressionType::BinaryExpression {
            operator,
            left,
            right,
            ..
        } => evaluate_binary_expression(operator, left, right, ctx),

        ExpressionType::LogicalExpression {
            operator,
            left,
            right,
            ..
        } => evaluate_logical_expression(operator, left, right, ctx),

        ExpressionType::AssignmentExpression {
            operator,
            left,
            right,
            ..
        } => {
            let operator = match operator {
                AssignmentOperator::Equals => SetOperator::Assign,
                AssignmentOperator::AddEquals => SetOperator::AddAssign,
                AssignmentOperator::SubtractEquals => SetOperator::SubtractAssign,
            };
            set_value(left, Some(right), operator, ctx)
        }

        ExpressionType::ConditionalExpression {
            test,
            consequent,
            alternate,
            ..
        } => {
            let test_value = evaluate_expression(test, ctx)?;
            if to_boolean(&test_value) {
                evaluate_expression(consequent, ctx)
            } else {
                evaluate_expression(alternate, ctx)
            }
        }

        ExpressionType::CallExpression {
            callee, arguments, ..
        } => evaluate_call_expression(callee, arguments, ctx),

        ExpressionType::NewExpression {
            callee, arguments, ..
        } => {
            // arguments before callee, the evaluator's order everywhere
            let mut args = Vec::with_capacity(arguments.len());
            for argument in arguments {
                args.push(evaluate_expression(argument, ctx)?);
            }
            let target = evaluate_expression(callee, ctx)?;
            apply_new(&target, args, ctx)
        }

        ExpressionType::MemberExpression(member) => {
            let (object, name) = resolve_member(member, ctx)?;
            read_member(&object, &name, ctx)
        }
    }
}

fn evaluate_literal(lit: &LiteralData, ctx: &mut EvalContext) -> ValueResult {
    Ok(match &lit.value {
        LiteralType::NullLiteral => JsValue::Null,
        LiteralType::BooleanLiteral(b) => JsValue::Boolean(*b),
        LiteralType::StringLiteral(s) => JsValue::String(s.clone()),
        LiteralType::NumberLiteral(n) => match n {
            NumberLiteralType::IntegerLiteral(i) => JsValue::Number(JsNumberType::Integer(*i)),
            NumberLiteralType::FloatLiteral(f) => JsValue::Number(JsNumberType::Float(*f)),
        },
        LiteralType::RegExpLiteral(data) => {
            let proto = ctx.primitives().natives().proto_of(
                crate::runner::ds::primitives::BuiltinKind::RegExp,
            );
            regexp::new_regexp(&data.pattern, &data.flags, Some(proto))
        }
    })
}

/// Array literals construct through the `Array` in scope, so the result
/// lives in the sandbox's prototype universe.
fn evaluate_array_expression(elements: &[ExpressionType], ctx: &mut EvalContext) -> ValueResult {
    let ctor = get_value(&ctx.block_scope, "Array", ctx.primitives());
    let array = call_value(&ctor, JsValue::Undefined, vec![], ctx)?;
    for element in elements {
        let value = evaluate_expression(element, ctx)?;
        match &array {
            JsValue::Object(o) => match &mut o.borrow_mut().kind {
                ObjectKind::Array(items) => items.push(value),
                _ => return Err(EvalError::TypeError("push is not a function".to_string())),
            },
            _ => return Err(EvalError::TypeError("push is not a function".to_string())),
        }
    }
    Ok(array)
}

fn evaluate_object_expression(
    properties: &[crate::parser::ast::PropertyData],
    ctx: &mut EvalContext,
) -> ValueResult {
    let ctor = get_value(&ctx.block_scope, "Object", ctx.primitives());
    let object = call_value(&ctor, JsValue::Undefined, vec![], ctx)?;
    for property in properties {
        let value = evaluate_expression(&property.value, ctx)?;
        if let JsValue::Object(o) = &object {
            o.borrow_mut().set_own(&property.key, value);
        }
    }
    Ok(object)
}

fn evaluate_unary_expression(
    operator: &UnaryOperator,
    argument: &ExpressionType,
    ctx: &mut EvalContext,
) -> ValueResult {
    let value = evaluate_expression(argument, ctx)?;
    Ok(match operator {
        UnaryOperator::Plus => JsValue::Number(to_number_type(&value)),
        UnaryOperator::Minus => JsValue::Number(negate(to_number_type(&value))),
        UnaryOperator::BitwiseNot => JsValue::Number(JsNumberType::Integer(!to_i32(&value) as i64)),
        UnaryOperator::LogicalNot => JsValue::Boolean(!to_boolean(&value)),
        UnaryOperator::TypeOf => JsValue::String(get_typeof_string(&value)),
    })
}

fn evaluate_binary_expression(
    operator: &BinaryOperator,
    left: &ExpressionType,
    right: &ExpressionType,
    ctx: &mut EvalContext,
) -> ValueResult {
    let left_value = evaluate_expression(left, ctx)?;
    let right_value = evaluate_expression(right, ctx)?;

    match operator {
        // equality collapses to strict semantics, for == and != as well
        BinaryOperator::LooselyEqual | BinaryOperator::StrictlyEqual => Ok(JsValue::Boolean(
            strict_equality(&left_value, &right_value),
        )),
        BinaryOperator::LooselyUnequal | BinaryOperator::StrictlyUnequal => Ok(JsValue::Boolean(
            !strict_equality(&left_value, &right_value),
        )),

        BinaryOperator::Add => add_values(&left_value, &right_value),
        BinaryOperator::Subtract => subtract_values(&left_value, &right_value),
        BinaryOperator::Multiply => multiply_values(&left_value, &right_value),
        BinaryOperator::Divide => divide_values(&left_value, &right_value),
        BinaryOperator::Modulo => modulo_values(&left_value, &right_value),

        BinaryOperator::LessThan => compare_values(&left_value, &right_value, |o| {
            o == std::cmp::Ordering::Less
        }),
        BinaryOperator::LessThanEqual => compare_values(&left_value, &right_value, |o| {
            o != std::cmp::Ordering::Greater
        }),
        BinaryOperator::GreaterThan => compare_values(&left_value, &right_value, |o| {
            o == std::cmp::Ordering::Greater
        }),
        BinaryOperator::GreaterThanEqual => compare_values(&left_value, &right_value, |o| {
            o != std::cmp::Ordering::Less
        }),

        BinaryOperator::BitwiseAnd => Ok(JsValue::Number(JsNumberType::Integer(
            (to_i32(&left_value) & to_i32(&right_value)) as i64,
        ))),
        BinaryOperator::BitwiseOr => Ok(JsValue::Number(JsNumberType::Integer(
            (to_i32(&left_value) | to_i32(&right_value)) as i64,
        ))),
        BinaryOperator::BitwiseXor => Ok(JsValue::Number(JsNumberType::Integer(
            (to_i32(&left_value) ^ to_i32(&right_value)) as i64,
        ))),

        BinaryOperator::In => match &right_value {
            JsValue::Object(o) => Ok(JsValue::Boolean(has_property_raw(
                o,
                &to_js_string(&left_value),
            ))),
            _ => Err(EvalError::TypeError(
                "Cannot use 'in' operator on a non-object".to_string(),
            )),
        },

        BinaryOperator::InstanceOf => instance_of(&left_value, &right_value),
    }
}

fn instance_of(left: &JsValue, right: &JsValue) -> ValueResult {
    let ctor = match right.as_object() {
        Some(o) if o.borrow().is_function() => o.clone(),
        _ => {
            return Err(EvalError::TypeError(
                "Right-hand side of 'instanceof' is not callable".to_string(),
            ))
        }
    };
    let proto = match ctor.borrow().get_own("prototype") {
        Some(JsValue::Object(p)) => p,
        _ => return Ok(JsValue::Boolean(false)),
    };
    let mut current = match left.as_object() {
        Some(o) => o.borrow().proto.clone(),
        None => return Ok(JsValue::Boolean(false)),
    };
    while let Some(link) = current {
        if std::rc::Rc::ptr_eq(&link, &proto) {
            return Ok(JsValue::Boolean(true));
        }
        current = link.borrow().proto.clone();
    }
    Ok(JsValue::Boolean(false))
}

fn evaluate_logical_expression(
    operator: &LogicalOperator,
    left: &ExpressionType,
    right: &ExpressionType,
    ctx: &mut EvalContext,
) -> ValueResult {
    let left_value = evaluate_expression(left, ctx)?;
    match operator {
        LogicalOperator::And => {
            if !to_boolean(&left_value) {
                Ok(left_value)
            } else {
                evaluate_expression(right, ctx)
            }
        }
        LogicalOperator::Or => {
            if to_boolean(&left_value) {
                Ok(left_value)
            } else {
                evaluate_expression(right, ctx)
            }
        }
    }
}

/// Arguments evaluate first (left to right), then the callee resolves.
/// A member callee's receiver is captured once and becomes `this`.
fn evaluate_call_expression(
    callee: &ExpressionType,
    arguments: &[ExpressionType],
    ctx: &mut EvalContext,
) -> ValueResult {
    let mut args = Vec::with_capacity(arguments.len());
    for argument in arguments {
        args.push(evaluate_expression(argument, ctx)?);
    }
    match callee {
        ExpressionType::MemberExpression(member) => {
            let (object, name) = resolve_member(member, ctx)?;
            let target = read_member(&object, &name, ctx)?;
            if matches!(target, JsValue::Undefined | JsValue::Null) {
                return Err(EvalError::TypeError(format!("{} is not a function", name)));
            }
            call_value(&target, object, args, ctx)
        }
        _ => {
            let target = evaluate_expression(callee, ctx)?;
            call_value(&target, JsValue::Undefined, args, ctx)
        }
    }
}

/// Receiver value and property name of a member expression.
fn resolve_member(
    member: &MemberExpressionType,
    ctx: &mut EvalContext,
) -> Result<(JsValue, String), EvalError> {
    match member {
        MemberExpressionType::SimpleMemberExpression {
            object, property, ..
        } => {
            let object = evaluate_expression(object, ctx)?;
            Ok((object, property.name.clone()))
        }
        MemberExpressionType::ComputedMemberExpression {
            object, property, ..
        } => {
            let object = evaluate_expression(object, ctx)?;
            let property = evaluate_expression(property, ctx)?;
            Ok((object, to_js_string(&property)))
        }
    }
}

/// Property read with primitive redirection and the `Function` guard.
fn read_member(object: &JsValue, name: &str, ctx: &mut EvalContext) -> ValueResult {
    let source = ctx.primitives().get_property_object(object, name)?;
    let value = object::get_property(&source, name).unwrap_or(JsValue::Undefined);
    Ok(check_value(value, ctx))
}

/// The critical sandbox boundary: a read surfacing the real `Function`
/// constructor yields the sandboxed factory instead.
pub fn check_value(value: JsValue, ctx: &EvalContext) -> JsValue {
    if value.same_object(&ctx.primitives().natives().function_ctor) {
        ctx.safe_function()
    } else {
        value
    }
}

pub enum SetOperator {
    Assign,
    AddAssign,
    SubtractAssign,
    Increment,
    Decrement,
}

/// Resolve an assignment/update target to an `(object, name)` pair and
/// apply the operator, honoring the write gate. Rejected writes are
/// silently dropped, never errors.
pub fn set_value(
    left: &ExpressionType,
    right: Option<&ExpressionType>,
    operator: SetOperator,
    ctx: &mut EvalContext,
) -> ValueResult {
    let (target, name) = match left {
        ExpressionType::Identifier(id) => {
            // parent context shadowing: write to the layer that owns it
            let scope = ctx.block_scope.clone();
            let owner = object_for_key(&scope, &id.name, ctx.primitives());
            (JsValue::Object(owner), id.name.clone())
        }
        ExpressionType::MemberExpression(member) => resolve_member(member, ctx)?,
        other => {
            return Err(EvalError::UnsupportedSyntax(format!(
                "{} is not an assignment target",
                other.kind_name()
            )))
        }
    };

    if !can_set_property(&target, &name, ctx.primitives()) {
        return Ok(JsValue::Undefined);
    }

    let current = || match &target {
        JsValue::Object(o) => object::get_property(o, &name).unwrap_or(JsValue::Undefined),
        _ => JsValue::Undefined,
    };

    let (stored, result) = match operator {
        SetOperator::Assign => {
            let value = evaluate_expression(right.unwrap(), ctx)?;
            (value.clone(), value)
        }
        SetOperator::AddAssign => {
            let value = add_values(&current(), &evaluate_expression(right.unwrap(), ctx)?)?;
            (value.clone(), value)
        }
        SetOperator::SubtractAssign => {
            let value = subtract_values(&current(), &evaluate_expression(right.unwrap(), ctx)?)?;
            (value.clone(), value)
        }
        SetOperator::Increment => {
            let old = to_number_type(&current());
            let new = add_numbers(&old, &JsNumberType::Integer(1));
            (JsValue::Number(new), JsValue::Number(old))
        }
        SetOperator::Decrement => {
            let old = to_number_type(&current());
            let new = subtract_numbers(&old, &JsNumberType::Integer(1));
            (JsValue::Number(new), JsValue::Number(old))
        }
    };

    if let JsValue::Object(o) = &target {
        o.borrow_mut().set_own(&name, stored);
    }
    Ok(result)
}

// ============================================================================
// Type conversion helpers
// ============================================================================

pub fn to_boolean(value: &JsValue) -> bool {
    match value {
        JsValue::Undefined => false,
        JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => match n {
            JsNumberType::Integer(0) => false,
            JsNumberType::Float(f) if *f == 0.0 => false,
            JsNumberType::NaN => false,
            _ => true,
        },
        JsValue::String(s) => !s.is_empty(),
        JsValue::Object(_) => true,
    }
}

pub fn get_typeof_string(value: &JsValue) -> String {
    match value {
        JsValue::Undefined => "undefined",
        JsValue::Null => "object",
        JsValue::Boolean(_) => "boolean",
        JsValue::Number(_) => "number",
        JsValue::String(_) => "string",
        JsValue::Object(o) => {
            if o.borrow().is_function() {
                "function"
            } else {
                "object"
            }
        }
    }
    .to_string()
}

pub fn to_js_string(value: &JsValue) -> String {
    value.to_string()
}

pub fn to_number_type(value: &JsValue) -> JsNumberType {
    match value {
        JsValue::Undefined => JsNumberType::NaN,
        JsValue::Null => JsNumberType::Integer(0),
        JsValue::Boolean(true) => JsNumberType::Integer(1),
        JsValue::Boolean(false) => JsNumberType::Integer(0),
        JsValue::Number(n) => n.clone(),
        JsValue::String(s) => string_to_number(s),
        JsValue::Object(o) => {
            let converted = match &o.borrow().kind {
                // a date's primitive value is its timestamp
                ObjectKind::Date(ms) => Some(JsNumberType::from_f64(*ms)),
                ObjectKind::Array(_) => None,
                _ => Some(JsNumberType::NaN),
            };
            match converted {
                Some(n) => n,
                None => string_to_number(&value.to_string()),
            }
        }
    }
}

fn string_to_number(s: &str) -> JsNumberType {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return JsNumberType::Integer(0);
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return JsNumberType::Integer(i);
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        if let Ok(i) = i64::from_str_radix(hex, 16) {
            return JsNumberType::Integer(i);
        }
    }
    match trimmed.parse::<f64>() {
        Ok(f) => JsNumberType::from_f64(f),
        Err(_) => JsNumberType::NaN,
    }
}

pub fn to_i32(value: &JsValue) -> i32 {
    match to_number_type(value) {
        JsNumberType::Integer(i) => i as i32,
        JsNumberType::Float(f) => {
            if f.is_finite() {
                f.trunc() as i64 as i32
            } else {
                0
            }
        }
        _ => 0,
    }
}

// ============================================================================
// Arithmetic operations
// ============================================================================

/// `+` concatenates when either side is a string or an object (objects
/// convert through their string form), otherwise adds numerically.
pub fn add_values(left: &JsValue, right: &JsValue) -> ValueResult {
    let stringy = matches!(left, JsValue::String(_) | JsValue::Object(_))
        || matches!(right, JsValue::String(_) | JsValue::Object(_));
    if stringy {
        return Ok(JsValue::String(format!(
            "{}{}",
            to_js_string(left),
            to_js_string(right)
        )));
    }
    Ok(JsValue::Number(add_numbers(
        &to_number_type(left),
        &to_number_type(right),
    )))
}

pub fn subtract_values(left: &JsValue, right: &JsValue) -> ValueResult {
    Ok(JsValue::Number(subtract_numbers(
        &to_number_type(left),
        &to_number_type(right),
    )))
}

pub fn multiply_values(left: &JsValue, right: &JsValue) -> ValueResult {
    Ok(JsValue::Number(apply_numeric_op(
        &to_number_type(left),
        &to_number_type(right),
        i64::checked_mul,
        |a, b| a * b,
    )))
}

pub fn divide_values(left: &JsValue, right: &JsValue) -> ValueResult {
    let left_num = to_number_type(left);
    let right_num = to_number_type(right);
    if let (JsNumberType::Integer(a), JsNumberType::Integer(b)) = (&left_num, &right_num) {
        if *b != 0 && a % b == 0 {
            return Ok(JsValue::Number(JsNumberType::Integer(a / b)));
        }
    }
    Ok(JsValue::Number(JsNumberType::from_f64(
        left_num.to_f64() / right_num.to_f64(),
    )))
}

pub fn modulo_values(left: &JsValue, right: &JsValue) -> ValueResult {
    let left_num = to_number_type(left);
    let right_num = to_number_type(right);
    if let (JsNumberType::Integer(a), JsNumberType::Integer(b)) = (&left_num, &right_num) {
        if *b != 0 {
            return Ok(JsValue::Number(JsNumberType::Integer(a % b)));
        }
    }
    Ok(JsValue::Number(JsNumberType::from_f64(
        left_num.to_f64() % right_num.to_f64(),
    )))
}

fn add_numbers(left: &JsNumberType, right: &JsNumberType) -> JsNumberType {
    apply_numeric_op(left, right, i64::checked_add, |a, b| a + b)
}

fn subtract_numbers(left: &JsNumberType, right: &JsNumberType) -> JsNumberType {
    apply_numeric_op(left, right, i64::checked_sub, |a, b| a - b)
}

fn apply_numeric_op<F, G>(
    left: &JsNumberType,
    right: &JsNumberType,
    int_op: F,
    float_op: G,
) -> JsNumberType
where
    F: Fn(i64, i64) -> Option<i64>,
    G: Fn(f64, f64) -> f64,
{
    match (left, right) {
        (JsNumberType::Integer(a), JsNumberType::Integer(b)) => match int_op(*a, *b) {
            Some(result) => JsNumberType::Integer(result),
            None => JsNumberType::from_f64(float_op(*a as f64, *b as f64)),
        },
        _ => JsNumberType::from_f64(float_op(left.to_f64(), right.to_f64())),
    }
}

fn negate(n: JsNumberType) -> JsNumberType {
    match n {
        JsNumberType::Integer(i) => JsNumberType::Integer(-i),
        JsNumberType::Float(f) => JsNumberType::Float(-f),
        JsNumberType::NaN => JsNumberType::NaN,
        JsNumberType::PositiveInfinity => JsNumberType::NegativeInfinity,
        JsNumberType::NegativeInfinity => JsNumberType::PositiveInfinity,
    }
}

// ============================================================================
// Comparison operations
// ============================================================================

/// Relational comparison: lexicographic when both sides are strings,
/// numeric otherwise; any NaN makes the comparison false.
fn compare_values<F>(left: &JsValue, right: &JsValue, decide: F) -> ValueResult
where
    F: Fn(std::cmp::Ordering) -> bool,
{
    if let (JsValue::String(a), JsValue::String(b)) = (left, right) {
        return Ok(JsValue::Boolean(decide(a.cmp(b))));
    }
    let a = to_number_type(left).to_f64();
    let b = to_number_type(right).to_f64();
    match a.partial_cmp(&b) {
        Some(ordering) => Ok(JsValue::Boolean(decide(ordering))),
        None => Ok(JsValue::Boolean(false)),
    }
}

pub fn strict_equality(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::Undefined, JsValue::Undefined) => true,
        (JsValue::Null, JsValue::Null) => true,
        (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
        (JsValue::String(a), JsValue::String(b)) => a == b,
        (JsValue::Number(a), JsValue::Number(b)) => {
            if a.is_nan() || b.is_nan() {
                false
            } else {
                a.to_f64() == b.to_f64()
            }
        }
        (JsValue::Object(a), JsValue::Object(b)) => std::rc::Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// Helper for natives that need a callable check with a friendly error.
pub fn require_function(value: &JsValue, what: &str) -> Result<JsObjectRef, EvalError> {
    match value.as_object() {
        Some(o) if o.borrow().is_function() => Ok(o.clone()),
        _ => Err(EvalError::TypeError(format!("{} is not a function", what))),
    }
}

/// Used by natives reading their `this` as an object.
pub fn require_object(value: &JsValue, what: &str) -> Result<JsObjectRef, EvalError> {
    match value.as_object() {
        Some(o) => Ok(o.clone()),
        None => Err(EvalError::TypeError(format!("{} is not an object", what))),
    }
}

/// `Float(NaN)` from arithmetic is normalized, so `is_nan` style checks on
/// the variant are reliable for natives.
pub fn number_value(f: f64) -> JsValue {
    JsValue::Number(JsNumberType::from_f64(f))
}
