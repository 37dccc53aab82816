//! Native methods for the built-in objects.
//!
//! These populate each sandbox's `NativeRegistry` prototypes: Object,
//! Array, String, Number, Function plumbing, Date, RegExp, plus the
//! `Math` and `JSON` globals the template engine seeds into its root
//! scope. Natives are non-enumerable, which is also what makes them
//! non-writable through the property gate.

pub mod array;
pub mod core;
pub mod date;
pub mod function;
pub mod json;
pub mod math;
pub mod number;
pub mod object;
pub mod regexp;
pub mod string;

use crate::runner::ds::object::{FunctionValue, JsObject, JsObjectRef, NativeFn};
use crate::runner::ds::primitives::NativeRegistry;
use crate::runner::ds::value::JsValue;

pub use core::install_core;

/// Attach a native method as a non-enumerable property.
pub(crate) fn add_method(
    registry: &NativeRegistry,
    target: &JsObjectRef,
    name: &'static str,
    func: NativeFn,
) {
    let function = JsObject::new_function(
        FunctionValue::Native { name, func },
        Some(registry.function_proto.clone()),
    );
    target
        .borrow_mut()
        .define(name, JsValue::Object(function), false);
}
