//! The JSON global and the serde_json bridge.
//!
//! `from_serde`/`to_serde` are also what the CLI and the template
//! engine's `render_json` use to move data in and out of a sandbox.

use std::rc::Rc;

use crate::runner::ds::error::EvalError;
use crate::runner::ds::object::{JsObject, JsObjectRef, ObjectKind};
use crate::runner::ds::primitives::{BuiltinKind, NativeRegistry};
use crate::runner::ds::value::{JsNumberType, JsValue};
use crate::runner::eval::expression::to_js_string;
use crate::runner::eval::types::EvalContext;

use super::add_method;

const MAX_DEPTH: usize = 128;

pub fn create(registry: &Rc<NativeRegistry>) -> JsObjectRef {
    let json = JsObject::new_plain(Some(registry.object_proto()));
    add_method(registry, &json, "parse", json_parse);
    add_method(registry, &json, "stringify", json_stringify);
    json
}

/// Convert parsed JSON into sandbox values. Objects and arrays join the
/// registry's prototype universe so their methods resolve.
pub fn from_serde(value: &serde_json::Value, registry: &Rc<NativeRegistry>) -> JsValue {
    match value {
        serde_json::Value::Null => JsValue::Null,
        serde_json::Value::Bool(b) => JsValue::Boolean(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                JsValue::Number(JsNumberType::Integer(i))
            } else {
                JsValue::Number(JsNumberType::from_f64(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        serde_json::Value::String(s) => JsValue::String(s.clone()),
        serde_json::Value::Array(items) => {
            let elements = items.iter().map(|item| from_serde(item, registry)).collect();
            JsValue::Object(JsObject::new_array(
                elements,
                Some(registry.proto_of(BuiltinKind::Array)),
            ))
        }
        serde_json::Value::Object(entries) => {
            let object = JsObject::new_plain(Some(registry.object_proto()));
            for (key, entry) in entries {
                object
                    .borrow_mut()
                    .set_own(key, from_serde(entry, registry));
            }
            JsValue::Object(object)
        }
    }
}

/// Convert a sandbox value to JSON. Functions and undefined become null;
/// runaway depth (cyclic data) is an error rather than a hang.
pub fn to_serde(value: &JsValue) -> Result<serde_json::Value, EvalError> {
    to_serde_bounded(value, 0)
}

fn to_serde_bounded(value: &JsValue, depth: usize) -> Result<serde_json::Value, EvalError> {
    if depth > MAX_DEPTH {
        return Err(EvalError::TypeError(
            "Converting circular structure to JSON".to_string(),
        ));
    }
    Ok(match value {
        JsValue::Undefined | JsValue::Null => serde_json::Value::Null,
        JsValue::Boolean(b) => serde_json::Value::Bool(*b),
        JsValue::String(s) => serde_json::Value::String(s.clone()),
        JsValue::Number(n) => match n {
            JsNumberType::Integer(i) => serde_json::Value::from(*i),
            other => {
                let f = other.to_f64();
                if f.is_finite() {
                    serde_json::Value::from(f)
                } else {
                    serde_json::Value::Null
                }
            }
        },
        JsValue::Object(o) => {
            let elements = match &o.borrow().kind {
                ObjectKind::Array(elements) => Some(elements.clone()),
                ObjectKind::Function(_) => return Ok(serde_json::Value::Null),
                _ => None,
            };
            match elements {
                Some(elements) => {
                    let mut items = vec![];
                    for element in &elements {
                        items.push(to_serde_bounded(element, depth + 1)?);
                    }
                    serde_json::Value::Array(items)
                }
                None => {
                    let mut map = serde_json::Map::new();
                    let entries: Vec<(String, JsValue)> = {
                        let borrowed = o.borrow();
                        borrowed
                            .own_enumerable_keys()
                            .into_iter()
                            .filter_map(|key| {
                                borrowed.get_own(&key).map(|value| (key, value))
                            })
                            .collect()
                    };
                    for (key, entry) in entries {
                        map.insert(key, to_serde_bounded(&entry, depth + 1)?);
                    }
                    serde_json::Value::Object(map)
                }
            }
        }
    })
}

/// JSON.parse
fn json_parse(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let source = args
        .first()
        .map(to_js_string)
        .unwrap_or_else(|| "undefined".to_string());
    let parsed: serde_json::Value = serde_json::from_str(&source)
        .map_err(|e| EvalError::SyntaxError(format!("JSON.parse: {}", e)))?;
    Ok(from_serde(&parsed, ctx.primitives().natives()))
}

/// JSON.stringify
fn json_stringify(
    _ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    match args.first() {
        None | Some(JsValue::Undefined) => Ok(JsValue::Undefined),
        Some(value) => {
            let serialized = to_serde(value)?;
            Ok(JsValue::String(serialized.to_string()))
        }
    }
}
