//! RegExp built-in.
//!
//! Patterns compile through the `regex` crate. The common template
//! patterns translate directly; `i` and `m` flags become inline groups,
//! `g` only matters to `String.replace`. A pattern the engine cannot
//! compile keeps its source and errors on first use.

use std::cell::RefCell;
use std::rc::Rc;

use crate::runner::ds::error::EvalError;
use crate::runner::ds::object::{JsObject, JsObjectRef, ObjectKind, PropertyMap, RegExpData};
use crate::runner::ds::primitives::{BuiltinKind, NativeRegistry};
use crate::runner::ds::value::JsValue;
use crate::runner::eval::expression::to_js_string;
use crate::runner::eval::types::EvalContext;

use super::add_method;
use super::core::wrong_this;

pub fn register(registry: &Rc<NativeRegistry>) {
    let proto = registry.proto_of(BuiltinKind::RegExp);
    add_method(registry, &proto, "test", regexp_test);
    add_method(registry, &proto, "toString", regexp_to_string);
}

pub fn construct(args: Vec<JsValue>, registry: &Rc<NativeRegistry>) -> Result<JsValue, EvalError> {
    let (source, mut flags) = match args.first() {
        None => (String::new(), String::new()),
        Some(JsValue::Object(o)) => match &o.borrow().kind {
            ObjectKind::RegExp(data) => (data.source.clone(), data.flags.clone()),
            _ => (to_js_string(&JsValue::Object(o.clone())), String::new()),
        },
        Some(other) => (to_js_string(other), String::new()),
    };
    if let Some(flag_arg) = args.get(1) {
        if !matches!(flag_arg, JsValue::Undefined) {
            flags = to_js_string(flag_arg);
        }
    }
    Ok(new_regexp(
        &source,
        &flags,
        Some(registry.proto_of(BuiltinKind::RegExp)),
    ))
}

pub fn new_regexp(source: &str, flags: &str, proto: Option<JsObjectRef>) -> JsValue {
    JsValue::Object(Rc::new(RefCell::new(JsObject {
        kind: ObjectKind::RegExp(RegExpData {
            source: source.to_string(),
            flags: flags.to_string(),
            matcher: compile(source, flags),
        }),
        properties: PropertyMap::new(),
        proto,
    })))
}

fn compile(source: &str, flags: &str) -> Option<regex::Regex> {
    let mut inline = String::new();
    if flags.contains('i') {
        inline.push('i');
    }
    if flags.contains('m') {
        inline.push('m');
    }
    let pattern = if inline.is_empty() {
        source.to_string()
    } else {
        format!("(?{}){}", inline, source)
    };
    match regex::Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            log::debug!("regex {:?} did not compile: {}", source, e);
            None
        }
    }
}

fn this_regexp(this: &JsValue, method: &str) -> Result<JsObjectRef, EvalError> {
    match this.as_object() {
        Some(o) if matches!(o.borrow().kind, ObjectKind::RegExp(_)) => Ok(o.clone()),
        _ => Err(wrong_this(method)),
    }
}

/// RegExp.prototype.test
fn regexp_test(
    _ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let regexp = this_regexp(&this, "test")?;
    let subject = args
        .first()
        .map(to_js_string)
        .unwrap_or_else(|| "undefined".to_string());
    let matched = match &regexp.borrow().kind {
        ObjectKind::RegExp(data) => match &data.matcher {
            Some(re) => re.is_match(&subject),
            None => {
                return Err(EvalError::TypeError(
                    "Invalid regular expression".to_string(),
                ))
            }
        },
        _ => false,
    };
    Ok(JsValue::Boolean(matched))
}

/// RegExp.prototype.toString
fn regexp_to_string(
    _ctx: &mut EvalContext,
    this: JsValue,
    _args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let regexp = this_regexp(&this, "toString")?;
    let rendered = match &regexp.borrow().kind {
        ObjectKind::RegExp(data) => format!("/{}/{}", data.source, data.flags),
        _ => String::new(),
    };
    Ok(JsValue::String(rendered))
}
