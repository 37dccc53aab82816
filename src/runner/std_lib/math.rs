//! The Math global.
//!
//! Not one of the seven wrapped primitives; the template engine seeds it
//! into its root scope, and embedders can do the same with a sandbox
//! scope of their own.

use std::rc::Rc;

use crate::runner::ds::error::EvalError;
use crate::runner::ds::object::{JsObject, JsObjectRef};
use crate::runner::ds::primitives::NativeRegistry;
use crate::runner::ds::value::{JsNumberType, JsValue};
use crate::runner::eval::expression::number_value;
use crate::runner::eval::types::EvalContext;

use super::add_method;
use super::core::number_arg;

pub fn create(registry: &Rc<NativeRegistry>) -> JsObjectRef {
    let math = JsObject::new_plain(Some(registry.object_proto()));
    math.borrow_mut().define(
        "PI",
        JsValue::Number(JsNumberType::Float(std::f64::consts::PI)),
        false,
    );
    math.borrow_mut().define(
        "E",
        JsValue::Number(JsNumberType::Float(std::f64::consts::E)),
        false,
    );
    add_method(registry, &math, "abs", math_abs);
    add_method(registry, &math, "floor", math_floor);
    add_method(registry, &math, "ceil", math_ceil);
    add_method(registry, &math, "round", math_round);
    add_method(registry, &math, "sqrt", math_sqrt);
    add_method(registry, &math, "pow", math_pow);
    add_method(registry, &math, "max", math_max);
    add_method(registry, &math, "min", math_min);
    add_method(registry, &math, "random", math_random);
    math
}

fn unary(args: &[JsValue], op: fn(f64) -> f64) -> JsValue {
    match number_arg(args, 0) {
        Some(f) => number_value(op(f)),
        None => JsValue::Number(JsNumberType::NaN),
    }
}

/// Math.abs
fn math_abs(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    Ok(unary(&args, f64::abs))
}

/// Math.floor
fn math_floor(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    Ok(unary(&args, f64::floor))
}

/// Math.ceil
fn math_ceil(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    Ok(unary(&args, f64::ceil))
}

/// Math.round - halves round toward positive infinity.
fn math_round(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    Ok(unary(&args, |f| (f + 0.5).floor()))
}

/// Math.sqrt
fn math_sqrt(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    Ok(unary(&args, f64::sqrt))
}

/// Math.pow
fn math_pow(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    match (number_arg(&args, 0), number_arg(&args, 1)) {
        (Some(base), Some(exponent)) => Ok(number_value(base.powf(exponent))),
        _ => Ok(JsValue::Number(JsNumberType::NaN)),
    }
}

/// Math.max
fn math_max(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    fold_extremum(args, f64::NEG_INFINITY, f64::max)
}

/// Math.min
fn math_min(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    fold_extremum(args, f64::INFINITY, f64::min)
}

fn fold_extremum(
    args: Vec<JsValue>,
    seed: f64,
    pick: fn(f64, f64) -> f64,
) -> Result<JsValue, EvalError> {
    let mut best = seed;
    for index in 0..args.len() {
        match number_arg(&args, index) {
            Some(f) if !f.is_nan() => best = pick(best, f),
            _ => return Ok(JsValue::Number(JsNumberType::NaN)),
        }
    }
    Ok(number_value(best))
}

/// Math.random
fn math_random(
    _ctx: &mut EvalContext,
    _this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    // xorshift over the clock; template expressions only need variety,
    // not cryptographic quality
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64 ^ (d.as_secs() << 20))
        .unwrap_or(0x9e37_79b9);
    let mut x = nanos | 1;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    Ok(number_value((x % (1 << 53)) as f64 / (1u64 << 53) as f64))
}
