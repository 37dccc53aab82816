//! The substitute-constructor registry at the heart of the sandbox.
//!
//! Every [`crate::runner::api::Sandbox`] owns one `NativeRegistry`: the
//! sandbox-local originals of the seven builtin types, carrying the native
//! methods. Evaluation scopes never see those directly. `Primitives::ensure`
//! installs *wrapped* constructors whose fresh prototypes delegate to the
//! originals, so evaluated code can extend `Array.prototype` (its own copy)
//! without ever mutating shared state.

use std::rc::Rc;

use crate::runner::ds::error::EvalError;
use crate::runner::ds::object::{
    get_property, has_property_raw, FunctionValue, JsObject, JsObjectRef,
};
use crate::runner::ds::value::JsValue;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuiltinKind {
    Object,
    String,
    Boolean,
    Number,
    RegExp,
    Date,
    Array,
}

pub const BUILTIN_KINDS: [BuiltinKind; 7] = [
    BuiltinKind::Object,
    BuiltinKind::String,
    BuiltinKind::Boolean,
    BuiltinKind::Number,
    BuiltinKind::RegExp,
    BuiltinKind::Date,
    BuiltinKind::Array,
];

impl BuiltinKind {
    pub fn name(self) -> &'static str {
        match self {
            BuiltinKind::Object => "Object",
            BuiltinKind::String => "String",
            BuiltinKind::Boolean => "Boolean",
            BuiltinKind::Number => "Number",
            BuiltinKind::RegExp => "RegExp",
            BuiltinKind::Date => "Date",
            BuiltinKind::Array => "Array",
        }
    }

    pub fn index(self) -> usize {
        match self {
            BuiltinKind::Object => 0,
            BuiltinKind::String => 1,
            BuiltinKind::Boolean => 2,
            BuiltinKind::Number => 3,
            BuiltinKind::RegExp => 4,
            BuiltinKind::Date => 5,
            BuiltinKind::Array => 6,
        }
    }
}

/// The sandbox-local originals: one constructor and one prototype per
/// builtin type, plus the function plumbing. Created once per sandbox,
/// never shared across sandboxes.
pub struct NativeRegistry {
    pub ctors: Vec<JsObjectRef>,
    pub protos: Vec<JsObjectRef>,
    pub function_proto: JsObjectRef,
    pub function_ctor: JsObjectRef,
}

impl NativeRegistry {
    pub fn new() -> Rc<Self> {
        let object_proto = JsObject::new_plain(None);
        let function_proto = JsObject::new_plain(Some(object_proto.clone()));

        let mut protos = vec![object_proto.clone()];
        for _ in 1..BUILTIN_KINDS.len() {
            protos.push(JsObject::new_plain(Some(object_proto.clone())));
        }

        let mut ctors = vec![];
        for kind in BUILTIN_KINDS.iter() {
            let ctor = JsObject::new_function(
                FunctionValue::Builtin(*kind),
                Some(function_proto.clone()),
            );
            let proto = protos[kind.index()].clone();
            ctor.borrow_mut()
                .define("prototype", JsValue::Object(proto.clone()), false);
            proto
                .borrow_mut()
                .define("constructor", JsValue::Object(ctor.clone()), false);
            ctors.push(ctor);
        }

        let function_ctor = JsObject::new_function(
            FunctionValue::HostFunctionCtor,
            Some(function_proto.clone()),
        );
        function_proto
            .borrow_mut()
            .define("constructor", JsValue::Object(function_ctor.clone()), false);

        Rc::new(NativeRegistry {
            ctors,
            protos,
            function_proto,
            function_ctor,
        })
    }

    pub fn ctor_of(&self, kind: BuiltinKind) -> JsObjectRef {
        self.ctors[kind.index()].clone()
    }

    pub fn proto_of(&self, kind: BuiltinKind) -> JsObjectRef {
        self.protos[kind.index()].clone()
    }

    pub fn object_proto(&self) -> JsObjectRef {
        self.protos[0].clone()
    }
}

/// Scope-bound view of the registry: resolves wrapped substitutes through
/// the scope chain the way evaluated code would see them.
#[derive(Clone)]
pub struct Primitives {
    scope: JsObjectRef,
    natives: Rc<NativeRegistry>,
}

impl Primitives {
    /// Installs the wrapped constructors into `scope` for every builtin
    /// name not already reachable, then returns the bound view.
    pub fn ensure(scope: &JsObjectRef, natives: &Rc<NativeRegistry>) -> Primitives {
        for kind in BUILTIN_KINDS.iter() {
            if !has_property_raw(scope, kind.name()) {
                let wrapped = wrap(natives, *kind);
                scope.borrow_mut().set_own(kind.name(), wrapped);
            }
        }
        Primitives {
            scope: scope.clone(),
            natives: natives.clone(),
        }
    }

    pub fn natives(&self) -> &Rc<NativeRegistry> {
        &self.natives
    }

    pub fn scope(&self) -> &JsObjectRef {
        &self.scope
    }

    /// The wrapped constructor for `kind` as evaluated code resolves it.
    pub fn lookup_wrapped(&self, kind: BuiltinKind) -> Option<JsObjectRef> {
        match get_property(&self.scope, kind.name()) {
            Some(JsValue::Object(o)) => Some(o),
            _ => None,
        }
    }

    /// The prototype of the wrapped constructor for `kind`.
    pub fn wrapped_proto_of(&self, kind: BuiltinKind) -> JsObjectRef {
        if let Some(ctor) = self.lookup_wrapped(kind) {
            if let Some(JsValue::Object(proto)) = ctor.borrow().get_own("prototype") {
                return proto;
            }
        }
        self.natives.proto_of(kind)
    }

    /// Maps a sandbox-local original (constructor or prototype) to its
    /// wrapped counterpart, so evaluated code never sees the original.
    pub fn replace(&self, object: &JsObjectRef) -> JsObjectRef {
        for (index, ctor) in self.natives.ctors.iter().enumerate() {
            if Rc::ptr_eq(object, ctor) {
                if let Some(wrapped) = self.lookup_wrapped(BUILTIN_KINDS[index]) {
                    return wrapped;
                }
            }
        }
        for (index, proto) in self.natives.protos.iter().enumerate() {
            if Rc::ptr_eq(object, proto) {
                return self.wrapped_proto_of(BUILTIN_KINDS[index]);
            }
        }
        object.clone()
    }

    /// True for the registry's own constructors and prototypes; these can
    /// never be written to from evaluated code.
    pub fn is_primitive(&self, value: &JsValue) -> bool {
        let object = match value.as_object() {
            Some(o) => o,
            None => return false,
        };
        self.natives
            .ctors
            .iter()
            .chain(self.natives.protos.iter())
            .any(|builtin| Rc::ptr_eq(object, builtin))
            || Rc::ptr_eq(object, &self.natives.function_proto)
            || Rc::ptr_eq(object, &self.natives.function_ctor)
    }

    /// The effective prototype as seen from inside the sandbox. Returns
    /// `None` at the root of every chain: lookups terminate at null, never
    /// at an unguarded universal base object.
    pub fn get_prototype_of(&self, value: &JsValue) -> Option<JsObjectRef> {
        let kind = match value {
            JsValue::Null | JsValue::Undefined => return None,
            JsValue::String(_) => Some(BuiltinKind::String),
            JsValue::Boolean(_) => Some(BuiltinKind::Boolean),
            JsValue::Number(_) => Some(BuiltinKind::Number),
            JsValue::Object(_) => None,
        };
        if let Some(kind) = kind {
            return Some(self.wrapped_proto_of(kind));
        }

        let object = value.as_object().unwrap();
        let proto = object.borrow().proto.clone()?;
        if Rc::ptr_eq(&proto, &self.natives.object_proto()) {
            return None;
        }
        let replacement = self.replace(&proto);
        if Rc::ptr_eq(&replacement, object) {
            // a wrapped constructor delegates to its own original; step
            // over to the wrapped Object prototype instead of cycling
            return Some(self.replace(&self.natives.object_proto()));
        }
        Some(replacement)
    }

    /// Redirects property reads on primitive-typed values to the wrapped
    /// prototype, since primitives cannot carry a chain of their own.
    pub fn get_property_object(
        &self,
        value: &JsValue,
        name: &str,
    ) -> Result<JsObjectRef, EvalError> {
        match value {
            JsValue::String(_) | JsValue::Boolean(_) | JsValue::Number(_) => self
                .get_prototype_of(value)
                .ok_or_else(|| EvalError::TypeError(format!("Cannot read property '{}'", name))),
            JsValue::Object(o) => Ok(o.clone()),
            JsValue::Null => Err(EvalError::TypeError(format!(
                "Cannot read property '{}' of null",
                name
            ))),
            JsValue::Undefined => Err(EvalError::TypeError(format!(
                "Cannot read property '{}' of undefined",
                name
            ))),
        }
    }
}

/// Builds a wrapped substitute constructor: a fresh function whose
/// `prototype` inherits from the original's prototype, and whose own
/// prototype link leads back to the original constructor.
fn wrap(natives: &Rc<NativeRegistry>, kind: BuiltinKind) -> JsValue {
    let proto = JsObject::new_plain(Some(natives.proto_of(kind)));
    let func = JsObject::new_function(FunctionValue::Wrapped(kind), Some(natives.ctor_of(kind)));
    func.borrow_mut()
        .define("prototype", JsValue::Object(proto.clone()), false);
    proto
        .borrow_mut()
        .define("constructor", JsValue::Object(func.clone()), false);
    JsValue::Object(func)
}
