//! Object built-in.

use std::rc::Rc;

use crate::runner::ds::error::EvalError;
use crate::runner::ds::primitives::{BuiltinKind, NativeRegistry};
use crate::runner::ds::value::JsValue;
use crate::runner::eval::expression::to_js_string;
use crate::runner::eval::types::EvalContext;

use super::add_method;

pub fn register(registry: &Rc<NativeRegistry>) {
    let proto = registry.object_proto();
    add_method(registry, &proto, "hasOwnProperty", object_has_own_property);
    add_method(registry, &proto, "toString", object_to_string);
    add_method(registry, &proto, "valueOf", object_value_of);

    let ctor = registry.ctor_of(BuiltinKind::Object);
    add_method(registry, &ctor, "keys", object_keys);
}

/// Object.prototype.hasOwnProperty
fn object_has_own_property(
    _ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let name = match args.first() {
        Some(value) => to_js_string(value),
        None => return Ok(JsValue::Boolean(false)),
    };
    Ok(JsValue::Boolean(match this.as_object() {
        Some(o) => o.borrow().has_own(&name),
        None => false,
    }))
}

/// Object.prototype.toString
fn object_to_string(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    Ok(JsValue::String(match this.as_object() {
        Some(o) => format!("[object {}]", o.borrow().class_name()),
        None => to_js_string(&this),
    }))
}

/// Object.prototype.valueOf
fn object_value_of(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    Ok(this)
}

/// Object.keys
fn object_keys(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let keys = match args.first().and_then(|value| value.as_object()) {
        Some(o) => o.borrow().own_enumerable_keys(),
        None => vec![],
    };
    let elements = keys.into_iter().map(JsValue::String).collect();
    Ok(JsValue::Object(
        crate::runner::ds::object::JsObject::new_array(
            elements,
            Some(ctx.primitives().natives().proto_of(BuiltinKind::Array)),
        ),
    ))
}
