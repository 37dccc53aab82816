//! Function.prototype plumbing: call and apply re-enter the evaluator.

use std::rc::Rc;

use crate::runner::ds::error::EvalError;
use crate::runner::ds::object::ObjectKind;
use crate::runner::ds::primitives::NativeRegistry;
use crate::runner::ds::value::JsValue;
use crate::runner::eval::function::call_value;
use crate::runner::eval::types::EvalContext;

use super::add_method;

pub fn register(registry: &Rc<NativeRegistry>) {
    let proto = registry.function_proto.clone();
    add_method(registry, &proto, "call", function_call);
    add_method(registry, &proto, "apply", function_apply);
}

/// Function.prototype.call
fn function_call(
    ctx: &mut EvalContext,
    this: JsValue,
    mut args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let this_arg = if args.is_empty() {
        JsValue::Undefined
    } else {
        args.remove(0)
    };
    call_value(&this, this_arg, args, ctx)
}

/// Function.prototype.apply
fn function_apply(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, EvalError> {
    let this_arg = args.first().cloned().unwrap_or(JsValue::Undefined);
    let call_args = match args.get(1) {
        None | Some(JsValue::Undefined) | Some(JsValue::Null) => vec![],
        Some(JsValue::Object(o)) => match &o.borrow().kind {
            ObjectKind::Array(elements) => elements.clone(),
            _ => {
                return Err(EvalError::TypeError(
                    "apply expects an array of arguments".to_string(),
                ))
            }
        },
        Some(_) => {
            return Err(EvalError::TypeError(
                "apply expects an array of arguments".to_string(),
            ))
        }
    };
    call_value(&this, this_arg, call_args, ctx)
}
