//! Scope chains.
//!
//! A scope layer is an ordinary sandbox object whose prototype link is its
//! parent layer, so variable resolution and prototype-aware property
//! resolution are the same chain walk. Declaration scopes (one per call)
//! and block scopes (one per block) share this representation.

use crate::runner::ds::object::{JsObject, JsObjectRef};
use crate::runner::ds::primitives::Primitives;
use crate::runner::ds::value::JsValue;

/// A fresh scope layer delegating to `parent`.
pub fn new_scope(parent: Option<&JsObjectRef>) -> JsObjectRef {
    JsObject::new_plain(parent.cloned())
}

/// Identifier resolution: walk the null-terminated sandbox chain looking
/// for a layer that owns the name.
pub fn has_property(object: &JsObjectRef, name: &str, primitives: &Primitives) -> bool {
    let mut current = object.clone();
    loop {
        if current.borrow().has_own(name) {
            return true;
        }
        match primitives.get_prototype_of(&JsValue::Object(current)) {
            Some(next) => current = next,
            None => return false,
        }
    }
}

/// Chain-aware read paired with [`has_property`].
pub fn get_value(object: &JsObjectRef, name: &str, primitives: &Primitives) -> JsValue {
    let mut current = object.clone();
    loop {
        if let Some(value) = current.borrow().get_own(name) {
            return value;
        }
        match primitives.get_prototype_of(&JsValue::Object(current)) {
            Some(next) => current = next,
            None => return JsValue::Undefined,
        }
    }
}

/// Assignment target resolution: the nearest layer that already owns the
/// name, or the original object when none does. Writing through this
/// updates outer bindings instead of creating shadowing duplicates.
pub fn object_for_key(object: &JsObjectRef, name: &str, primitives: &Primitives) -> JsObjectRef {
    let mut current = object.clone();
    loop {
        if current.borrow().has_own(name) {
            return current;
        }
        match primitives.get_prototype_of(&JsValue::Object(current.clone())) {
            Some(next) => current = next,
            None => return object.clone(),
        }
    }
}

/// The property-write gate. `__proto__` and the sandbox-local builtins are
/// never writable; own non-enumerable properties (native methods, array
/// `length`) are not writable; own enumerable properties are; otherwise
/// the chain decides. A missing target tolerates the write as a no-op.
pub fn can_set_property(target: &JsValue, name: &str, primitives: &Primitives) -> bool {
    if name == "__proto__" || primitives.is_primitive(target) {
        return false;
    }
    match target {
        JsValue::Object(object) => {
            let mut current = object.clone();
            loop {
                let enumerable = current.borrow().own_enumerable(name);
                if let Some(enumerable) = enumerable {
                    return enumerable;
                }
                if primitives.is_primitive(&JsValue::Object(current.clone())) {
                    return false;
                }
                match primitives.get_prototype_of(&JsValue::Object(current)) {
                    Some(next) => current = next,
                    None => return true,
                }
            }
        }
        JsValue::Null | JsValue::Undefined => true,
        // primitive receivers silently drop writes
        _ => false,
    }
}
