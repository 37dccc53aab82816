//! Array built-in.
//!
//! The callback-taking methods snapshot the elements first and re-enter
//! the evaluator for each call, so callbacks that mutate the receiver
//! cannot invalidate the iteration.

use std::rc::Rc;

use crate::runner::ds::error::EvalError;
use crate::runner::ds::object::{JsObject, JsObjectRef, ObjectKind};
use crate::runner::ds::primitives::{BuiltinKind, NativeRegistry};
use crate::runner::ds::value::{JsNumberType, JsValue};
use crate::runner::eval::expression::{strict_equality, to_boolean, to_js_string, to_number_type};
use crate::runner::eval::function::call_value;
use crate::runner::eval::types::EvalContext;

use super::add_method;
use super::core::wrong_this;

pub fn register(registry: &Rc<NativeRegistry>) {
    let proto = registry.proto_of(BuiltinKind::Array);
    add_method(registry, &proto, "push", array_push);
    add_method(registry, &proto, "pop", array_pop);
    add_method(registry, &proto, "shift", array_shift);
    add_method(registry, &proto, "unshift", array_unshift);
    add_method(registry, &proto, "slice", array_slice);
    add_method(registry, &proto, "indexOf", array_index_of);
    add_method(registry, &proto, "join", array_join);
    add_method(registry, &proto, "concat", array_concat);
    add_method(registry, &proto, "reverse", array_reverse);
    add_method(registry, &proto, "map", array_map);
    add_method(registry, &proto, "filter", array_filter);
    add_method(registry, &proto, "forEach", array_for_each);
    add_method(registry, &proto, "reduce", array_reduce);
    add_method(registry, &proto, "toString", array_to_string);

    let ctor = registry.ctor_of(BuiltinKind::Array);
    add_method(registry, &ctor, "isArray", array_is_array);
}

fn this_array(this: &JsValue, method: &str) -> Result<JsObjectRef, EvalError> {
    match this.as_object() {
        Some(o) if matches!(o.borrow().kind, ObjectKind::Array(_)) => Ok(o.clone()),
        _ => Err(wrong_this(method)),
    }
}

fn elements_of(array: &JsObjectRef) -> Vec<JsValue> {
    match &array.borrow().kind {
        ObjectKind::Array(elements) => elements.clone(),
        _ => vec![],
    }
}

fn new_array_value(ctx: &EvalContext, elements: Vec<JsValue>) -> JsValue {
    JsValue::Object(JsObject::new_array(
        elements,
        Some(ctx.primitives().natives().proto_of(BuiltinKind::Array)),
    ))
}

/// Array.prototype.push
fn array_push(
    _ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let array = this_array(&this, "push")?;
    let mut borrowed = array.borrow_mut();
    if let ObjectKind::Array(elements) = &mut borrowed.kind {
        elements.extend(args);
        return Ok(JsValue::Number(JsNumberType::Integer(elements.len() as i64)));
    }
    Err(wrong_this("push"))
}

/// Array.prototype.pop
fn array_pop(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let array = this_array(&this, "pop")?;
    let mut borrowed = array.borrow_mut();
    if let ObjectKind::Array(elements) = &mut borrowed.kind {
        return Ok(elements.pop().unwrap_or(JsValue::Undefined));
    }
    Err(wrong_this("pop"))
}

/// Array.prototype.shift
fn array_shift(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let array = this_array(&this, "shift")?;
    let mut borrowed = array.borrow_mut();
    if let ObjectKind::Array(elements) = &mut borrowed.kind {
        if elements.is_empty() {
            return Ok(JsValue::Undefined);
        }
        return Ok(elements.remove(0));
    }
    Err(wrong_this("shift"))
}

/// Array.prototype.unshift
fn array_unshift(
    _ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let array = this_array(&this, "unshift")?;
    let mut borrowed = array.borrow_mut();
    if let ObjectKind::Array(elements) = &mut borrowed.kind {
        for (offset, value) in args.into_iter().enumerate() {
            elements.insert(offset, value);
        }
        return Ok(JsValue::Number(JsNumberType::Integer(elements.len() as i64)));
    }
    Err(wrong_this("unshift"))
}

fn clamp_index(value: f64, len: usize) -> usize {
    if value.is_nan() {
        return 0;
    }
    if value < 0.0 {
        let back = (-value) as usize;
        len.saturating_sub(back)
    } else {
        (value as usize).min(len)
    }
}

/// Array.prototype.slice
fn array_slice(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let array = this_array(&this, "slice")?;
    let elements = elements_of(&array);
    let len = elements.len();
    let start = args
        .first()
        .map(|value| clamp_index(to_number_type(value).to_f64(), len))
        .unwrap_or(0);
    let end = match args.get(1) {
        None | Some(JsValue::Undefined) => len,
        Some(value) => clamp_index(to_number_type(value).to_f64(), len),
    };
    let slice = if start < end {
        elements[start..end].to_vec()
    } else {
        vec![]
    };
    Ok(new_array_value(ctx, slice))
}

/// Array.prototype.indexOf
fn array_index_of(
    _ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let array = this_array(&this, "indexOf")?;
    let needle = args.first().cloned().unwrap_or(JsValue::Undefined);
    let index = elements_of(&array)
        .iter()
        .position(|element| strict_equality(element, &needle));
    Ok(JsValue::Number(JsNumberType::Integer(match index {
        Some(i) => i as i64,
        None => -1,
    })))
}

/// Array.prototype.join
fn array_join(
    _ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let array = this_array(&this, "join")?;
    let separator = match args.first() {
        None | Some(JsValue::Undefined) => ",".to_string(),
        Some(value) => to_js_string(value),
    };
    let parts: Vec<String> = elements_of(&array)
        .iter()
        .map(|element| match element {
            JsValue::Undefined | JsValue::Null => String::new(),
            other => to_js_string(other),
        })
        .collect();
    Ok(JsValue::String(parts.join(&separator)))
}

/// Array.prototype.concat
fn array_concat(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let array = this_array(&this, "concat")?;
    let mut elements = elements_of(&array);
    for arg in args {
        match &arg {
            JsValue::Object(o) if matches!(o.borrow().kind, ObjectKind::Array(_)) => {
                elements.extend(elements_of(o));
            }
            other => elements.push(other.clone()),
        }
    }
    Ok(new_array_value(ctx, elements))
}

/// Array.prototype.reverse
fn array_reverse(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let array = this_array(&this, "reverse")?;
    if let ObjectKind::Array(elements) = &mut array.borrow_mut().kind {
        elements.reverse();
    }
    Ok(this)
}

/// Array.prototype.map
fn array_map(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let array = this_array(&this, "map")?;
    let callback = args.first().cloned().unwrap_or(JsValue::Undefined);
    let mut mapped = vec![];
    for (index, element) in elements_of(&array).into_iter().enumerate() {
        let value = call_value(
            &callback,
            JsValue::Undefined,
            vec![
                element,
                JsValue::Number(JsNumberType::Integer(index as i64)),
                this.clone(),
            ],
            ctx,
        )?;
        mapped.push(value);
    }
    Ok(new_array_value(ctx, mapped))
}

/// Array.prototype.filter
fn array_filter(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let array = this_array(&this, "filter")?;
    let callback = args.first().cloned().unwrap_or(JsValue::Undefined);
    let mut kept = vec![];
    for (index, element) in elements_of(&array).into_iter().enumerate() {
        let verdict = call_value(
            &callback,
            JsValue::Undefined,
            vec![
                element.clone(),
                JsValue::Number(JsNumberType::Integer(index as i64)),
                this.clone(),
            ],
            ctx,
        )?;
        if to_boolean(&verdict) {
            kept.push(element);
        }
    }
    Ok(new_array_value(ctx, kept))
}

/// Array.prototype.forEach
fn array_for_each(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let array = this_array(&this, "forEach")?;
    let callback = args.first().cloned().unwrap_or(JsValue::Undefined);
    for (index, element) in elements_of(&array).into_iter().enumerate() {
        call_value(
            &callback,
            JsValue::Undefined,
            vec![
                element,
                JsValue::Number(JsNumberType::Integer(index as i64)),
                this.clone(),
            ],
            ctx,
        )?;
    }
    Ok(JsValue::Undefined)
}

/// Array.prototype.reduce
fn array_reduce(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let array = this_array(&this, "reduce")?;
    let callback = args.first().cloned().unwrap_or(JsValue::Undefined);
    let elements = elements_of(&array);
    let mut iter = elements.into_iter().enumerate();
    let mut accumulator = match args.get(1) {
        Some(seed) => seed.clone(),
        None => match iter.next() {
            Some((_, first)) => first,
            None => {
                return Err(EvalError::TypeError(
                    "Reduce of empty array with no initial value".to_string(),
                ))
            }
        },
    };
    for (index, element) in iter {
        accumulator = call_value(
            &callback,
            JsValue::Undefined,
            vec![
                accumulator,
                element,
                JsValue::Number(JsNumberType::Integer(index as i64)),
                this.clone(),
            ],
            ctx,
        )?;
    }
    Ok(accumulator)
}

/// Array.prototype.toString
fn array_to_string(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    Ok(JsValue::String(to_js_string(&this)))
}

/// Array.isArray
fn array_is_array(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    Ok(JsValue::Boolean(match args.first() {
        Some(JsValue::Object(o)) => matches!(o.borrow().kind, ObjectKind::Array(_)),
        _ => false,
    }))
}
