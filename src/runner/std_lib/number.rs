//! Number built-in.

use std::rc::Rc;

use crate::runner::ds::error::EvalError;
use crate::runner::ds::primitives::{BuiltinKind, NativeRegistry};
use crate::runner::ds::value::JsValue;
use crate::runner::eval::expression::{to_js_string, to_number_type};
use crate::runner::eval::types::EvalContext;

use super::add_method;

pub fn register(registry: &Rc<NativeRegistry>) {
    let proto = registry.proto_of(BuiltinKind::Number);
    add_method(registry, &proto, "toFixed", number_to_fixed);
    add_method(registry, &proto, "toString", number_to_string);
    add_method(registry, &proto, "valueOf", number_value_of);
}

/// Number.prototype.toFixed
fn number_to_fixed(
    _ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let value = to_number_type(&this);
    let digits = args
        .first()
        .map(|value| to_number_type(value).to_f64())
        .unwrap_or(0.0);
    if !(0.0..=100.0).contains(&digits) {
        return Err(EvalError::TypeError(
            "toFixed() digits argument must be between 0 and 100".to_string(),
        ));
    }
    if value.is_nan() {
        return Ok(JsValue::String("NaN".to_string()));
    }
    Ok(JsValue::String(format!(
        "{:.*}",
        digits as usize,
        value.to_f64()
    )))
}

/// Number.prototype.toString
fn number_to_string(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    Ok(JsValue::String(to_js_string(&JsValue::Number(
        to_number_type(&this),
    ))))
}

/// Number.prototype.valueOf
fn number_value_of(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    Ok(JsValue::Number(to_number_type(&this)))
}
