//! Registry assembly and builtin construction.

use std::rc::Rc;

use crate::runner::ds::error::EvalError;
use crate::runner::ds::object::JsObject;
use crate::runner::ds::primitives::{BuiltinKind, NativeRegistry};
use crate::runner::ds::value::{JsNumberType, JsValue};
use crate::runner::eval::expression::{to_boolean, to_js_string, to_number_type};
use crate::runner::eval::types::{EvalContext, ValueResult};

use super::{array, date, function, number, object, regexp, string};

/// Install every native method set into a fresh registry.
pub fn install_core(registry: &Rc<NativeRegistry>) {
    object::register(registry);
    array::register(registry);
    string::register(registry);
    number::register(registry);
    function::register(registry);
    date::register(registry);
    regexp::register(registry);
}

/// Construct a value of one of the seven builtin types. This is what both
/// the sandbox-local constructors and their wrapped substitutes run;
/// wrapped callers relink the prototype afterwards.
pub fn construct_builtin(
    kind: BuiltinKind,
    args: Vec<JsValue>,
    ctx: &mut EvalContext,
) -> ValueResult {
    let registry = ctx.primitives().natives().clone();
    Ok(match kind {
        BuiltinKind::Object => match args.into_iter().next() {
            Some(JsValue::Object(o)) => JsValue::Object(o),
            _ => JsValue::Object(JsObject::new_plain(Some(registry.object_proto()))),
        },
        BuiltinKind::String => match args.first() {
            Some(value) => JsValue::String(to_js_string(value)),
            None => JsValue::String(String::new()),
        },
        BuiltinKind::Boolean => {
            JsValue::Boolean(args.first().map(to_boolean).unwrap_or(false))
        }
        BuiltinKind::Number => match args.first() {
            Some(value) => JsValue::Number(to_number_type(value)),
            None => JsValue::Number(JsNumberType::Integer(0)),
        },
        BuiltinKind::Array => {
            let sized = match args.as_slice() {
                [JsValue::Number(JsNumberType::Integer(n))] if *n >= 0 => Some(*n as usize),
                _ => None,
            };
            let elements = match sized {
                Some(n) => vec![JsValue::Undefined; n],
                None => args,
            };
            JsValue::Object(JsObject::new_array(
                elements,
                Some(registry.proto_of(BuiltinKind::Array)),
            ))
        }
        BuiltinKind::Date => return date::construct(args, &registry),
        BuiltinKind::RegExp => return regexp::construct(args, &registry),
    })
}

/// Numeric argument helper: the argument at `index`, converted.
pub fn number_arg(args: &[JsValue], index: usize) -> Option<f64> {
    args.get(index).map(|value| to_number_type(value).to_f64())
}

/// String argument helper: the argument at `index`, converted.
pub fn string_arg(args: &[JsValue], index: usize) -> Option<String> {
    args.get(index).map(to_js_string)
}

/// Internal error for natives hit with a receiver of the wrong kind.
pub fn wrong_this(method: &str) -> EvalError {
    EvalError::TypeError(format!("{} called on incompatible receiver", method))
}
