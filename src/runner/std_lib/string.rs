//! String built-in.
//!
//! Receivers arrive as primitive string values through the prototype
//! redirection; indexes are in characters, not bytes.

use std::rc::Rc;

use crate::runner::ds::error::EvalError;
use crate::runner::ds::object::{JsObject, ObjectKind};
use crate::runner::ds::primitives::{BuiltinKind, NativeRegistry};
use crate::runner::ds::value::{JsNumberType, JsValue};
use crate::runner::eval::expression::{to_js_string, to_number_type};
use crate::runner::eval::types::EvalContext;

use super::add_method;
use super::core::string_arg;

pub fn register(registry: &Rc<NativeRegistry>) {
    let proto = registry.proto_of(BuiltinKind::String);
    // the prototype itself behaves as the empty string
    proto
        .borrow_mut()
        .define("length", JsValue::Number(JsNumberType::Integer(0)), false);
    add_method(registry, &proto, "toUpperCase", string_to_upper_case);
    add_method(registry, &proto, "toLowerCase", string_to_lower_case);
    add_method(registry, &proto, "indexOf", string_index_of);
    add_method(registry, &proto, "charAt", string_char_at);
    add_method(registry, &proto, "charCodeAt", string_char_code_at);
    add_method(registry, &proto, "slice", string_slice);
    add_method(registry, &proto, "split", string_split);
    add_method(registry, &proto, "replace", string_replace);
    add_method(registry, &proto, "trim", string_trim);
    add_method(registry, &proto, "search", string_search);
    add_method(registry, &proto, "toString", string_to_string);
    add_method(registry, &proto, "valueOf", string_to_string);
}

fn this_string(this: &JsValue) -> String {
    to_js_string(this)
}

/// String.prototype.toUpperCase
fn string_to_upper_case(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    Ok(JsValue::String(this_string(&this).to_uppercase()))
}

/// String.prototype.toLowerCase
fn string_to_lower_case(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    Ok(JsValue::String(this_string(&this).to_lowercase()))
}

/// String.prototype.indexOf
fn string_index_of(
    _ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let haystack = this_string(&this);
    let needle = string_arg(&args, 0).unwrap_or_else(|| "undefined".to_string());
    let index = match haystack.find(&needle) {
        Some(byte_index) => haystack[..byte_index].chars().count() as i64,
        None => -1,
    };
    Ok(JsValue::Number(JsNumberType::Integer(index)))
}

/// String.prototype.charAt
fn string_char_at(
    _ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let string = this_string(&this);
    let index = args
        .first()
        .map(|value| to_number_type(value).to_f64())
        .unwrap_or(0.0);
    if index < 0.0 || index.is_nan() {
        return Ok(JsValue::String(String::new()));
    }
    Ok(JsValue::String(
        string
            .chars()
            .nth(index as usize)
            .map(|c| c.to_string())
            .unwrap_or_default(),
    ))
}

/// String.prototype.charCodeAt
fn string_char_code_at(
    _ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let string = this_string(&this);
    let index = args
        .first()
        .map(|value| to_number_type(value).to_f64())
        .unwrap_or(0.0);
    if index < 0.0 || index.is_nan() {
        return Ok(JsValue::Number(JsNumberType::NaN));
    }
    Ok(match string.chars().nth(index as usize) {
        Some(c) => JsValue::Number(JsNumberType::Integer(c as i64)),
        None => JsValue::Number(JsNumberType::NaN),
    })
}

/// String.prototype.slice
fn string_slice(
    _ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let chars: Vec<char> = this_string(&this).chars().collect();
    let len = chars.len();
    let clamp = |value: f64| -> usize {
        if value.is_nan() {
            0
        } else if value < 0.0 {
            len.saturating_sub((-value) as usize)
        } else {
            (value as usize).min(len)
        }
    };
    let start = args
        .first()
        .map(|value| clamp(to_number_type(value).to_f64()))
        .unwrap_or(0);
    let end = match args.get(1) {
        None | Some(JsValue::Undefined) => len,
        Some(value) => clamp(to_number_type(value).to_f64()),
    };
    let slice: String = if start < end {
        chars[start..end].iter().collect()
    } else {
        String::new()
    };
    Ok(JsValue::String(slice))
}

/// String.prototype.split
fn string_split(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let string = this_string(&this);
    let parts: Vec<JsValue> = match args.first() {
        None | Some(JsValue::Undefined) => vec![JsValue::String(string)],
        Some(separator) => {
            let separator = to_js_string(separator);
            if separator.is_empty() {
                string
                    .chars()
                    .map(|c| JsValue::String(c.to_string()))
                    .collect()
            } else {
                string
                    .split(&separator)
                    .map(|part| JsValue::String(part.to_string()))
                    .collect()
            }
        }
    };
    Ok(JsValue::Object(JsObject::new_array(
        parts,
        Some(ctx.primitives().natives().proto_of(BuiltinKind::Array)),
    )))
}

/// String.prototype.replace - string patterns replace the first
/// occurrence; regex patterns honor their `g` flag.
fn string_replace(
    _ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let string = this_string(&this);
    let replacement = string_arg(&args, 1).unwrap_or_else(|| "undefined".to_string());
    match args.first() {
        Some(JsValue::Object(o)) => {
            let (matcher, global) = match &o.borrow().kind {
                ObjectKind::RegExp(data) => {
                    (data.matcher.clone(), data.flags.contains('g'))
                }
                _ => (None, false),
            };
            match matcher {
                Some(re) => Ok(JsValue::String(if global {
                    re.replace_all(&string, replacement.as_str()).into_owned()
                } else {
                    re.replace(&string, replacement.as_str()).into_owned()
                })),
                None => Err(EvalError::TypeError(
                    "Invalid regular expression".to_string(),
                )),
            }
        }
        Some(pattern) => {
            let pattern = to_js_string(pattern);
            Ok(JsValue::String(string.replacen(&pattern, &replacement, 1)))
        }
        None => Ok(JsValue::String(string)),
    }
}

/// String.prototype.trim
fn string_trim(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    Ok(JsValue::String(this_string(&this).trim().to_string()))
}

/// String.prototype.search
fn string_search(
    _ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let string = this_string(&this);
    let index = match args.first() {
        Some(JsValue::Object(o)) => match &o.borrow().kind {
            ObjectKind::RegExp(data) => match &data.matcher {
                Some(re) => match re.find(&string) {
                    Some(found) => string[..found.start()].chars().count() as i64,
                    None => -1,
                },
                None => {
                    return Err(EvalError::TypeError(
                        "Invalid regular expression".to_string(),
                    ))
                }
            },
            _ => -1,
        },
        Some(pattern) => match string.find(&to_js_string(pattern)) {
            Some(byte_index) => string[..byte_index].chars().count() as i64,
            None => -1,
        },
        None => -1,
    };
    Ok(JsValue::Number(JsNumberType::Integer(index)))
}

/// String.prototype.toString / valueOf
fn string_to_string(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    Ok(JsValue::String(this_string(&this)))
}
