use std::cell::RefCell;
use std::rc::Rc;

use crate::parser::ast::FunctionBodyData;
use crate::runner::ds::error::EvalError;
use crate::runner::ds::primitives::BuiltinKind;
use crate::runner::ds::value::{JsNumberType, JsValue};
use crate::runner::eval::types::EvalContext;

pub type JsObjectRef = Rc<RefCell<JsObject>>;

/// Function signature for native methods. Natives receive the evaluation
/// context so they can call back into the evaluator (e.g. `Array.map`).
pub type NativeFn =
    fn(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, EvalError>;

pub struct Property {
    pub value: JsValue,
    pub enumerable: bool,
}

/// An insertion-ordered property bag. Objects here are small; linear
/// lookup beats hashing and keeps `for-in` order stable.
pub struct PropertyMap {
    entries: Vec<(String, Property)>,
}

impl PropertyMap {
    pub fn new() -> Self {
        PropertyMap { entries: vec![] }
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, property)| property)
    }

    pub fn get_value(&self, name: &str) -> Option<JsValue> {
        self.get(name).map(|property| property.value.clone())
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    /// Updates the value of an existing entry (keeping its enumerability)
    /// or inserts a new enumerable one.
    pub fn set_value(&mut self, name: &str, value: JsValue) {
        for (key, property) in self.entries.iter_mut() {
            if key == name {
                property.value = value;
                return;
            }
        }
        self.entries.push((
            name.to_string(),
            Property {
                value,
                enumerable: true,
            },
        ));
    }

    /// Inserts or replaces an entry with an explicit enumerability flag.
    pub fn define(&mut self, name: &str, value: JsValue, enumerable: bool) {
        for (key, property) in self.entries.iter_mut() {
            if key == name {
                *property = Property { value, enumerable };
                return;
            }
        }
        self.entries
            .push((name.to_string(), Property { value, enumerable }));
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn enumerable_keys(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, property)| property.enumerable)
            .map(|(key, _)| key.clone())
            .collect()
    }
}

pub struct RegExpData {
    pub source: String,
    pub flags: String,
    pub matcher: Option<regex::Regex>,
}

pub struct ScriptedFunction {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Rc<FunctionBodyData>,
    pub scope: JsObjectRef,
}

pub enum FunctionValue {
    /// Built-in method backed by a plain function pointer.
    Native { name: &'static str, func: NativeFn },
    /// Function defined by evaluated code, closing over its scope.
    Scripted(Rc<ScriptedFunction>),
    /// One of the sandbox-local originals of the seven builtin types.
    Builtin(BuiltinKind),
    /// A wrapped substitute constructor handed to evaluated code.
    Wrapped(BuiltinKind),
    /// The native `Function` constructor. Never handed out: member reads
    /// that would surface it substitute the safe factory instead.
    HostFunctionCtor,
    /// The sandboxed `Function(args.., body)` factory.
    SafeFunctionCtor { scope: JsObjectRef },
}

pub enum ObjectKind {
    Plain,
    Array(Vec<JsValue>),
    Function(FunctionValue),
    Date(f64),
    RegExp(RegExpData),
}

pub struct JsObject {
    pub kind: ObjectKind,
    pub properties: PropertyMap,
    pub proto: Option<JsObjectRef>,
}

impl JsObject {
    pub fn new_plain(proto: Option<JsObjectRef>) -> JsObjectRef {
        Rc::new(RefCell::new(JsObject {
            kind: ObjectKind::Plain,
            properties: PropertyMap::new(),
            proto,
        }))
    }

    pub fn new_array(elements: Vec<JsValue>, proto: Option<JsObjectRef>) -> JsObjectRef {
        Rc::new(RefCell::new(JsObject {
            kind: ObjectKind::Array(elements),
            properties: PropertyMap::new(),
            proto,
        }))
    }

    pub fn new_function(function: FunctionValue, proto: Option<JsObjectRef>) -> JsObjectRef {
        Rc::new(RefCell::new(JsObject {
            kind: ObjectKind::Function(function),
            properties: PropertyMap::new(),
            proto,
        }))
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, ObjectKind::Function(_))
    }

    pub fn class_name(&self) -> &'static str {
        match self.kind {
            ObjectKind::Plain => "Object",
            ObjectKind::Array(_) => "Array",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Date(_) => "Date",
            ObjectKind::RegExp(_) => "RegExp",
        }
    }

    /// Own-property read, including the virtual properties of the
    /// specialized kinds (array `length`/indices, regexp `source`...).
    pub fn get_own(&self, name: &str) -> Option<JsValue> {
        match &self.kind {
            ObjectKind::Array(elements) => {
                if name == "length" {
                    return Some(JsValue::Number(JsNumberType::Integer(elements.len() as i64)));
                }
                if let Some(index) = array_index(name) {
                    if index < elements.len() {
                        return Some(elements[index].clone());
                    }
                }
            }
            ObjectKind::RegExp(data) => {
                if name == "source" {
                    return Some(JsValue::String(data.source.clone()));
                }
                if name == "flags" {
                    return Some(JsValue::String(data.flags.clone()));
                }
            }
            _ => {}
        }
        self.properties.get_value(name)
    }

    pub fn has_own(&self, name: &str) -> bool {
        match &self.kind {
            ObjectKind::Array(elements) => {
                if name == "length" {
                    return true;
                }
                if let Some(index) = array_index(name) {
                    if index < elements.len() {
                        return true;
                    }
                }
            }
            ObjectKind::RegExp(_) => {
                if name == "source" || name == "flags" {
                    return true;
                }
            }
            _ => {}
        }
        self.properties.has(name)
    }

    /// Enumerability of an own property; `None` when not an own property.
    pub fn own_enumerable(&self, name: &str) -> Option<bool> {
        match &self.kind {
            ObjectKind::Array(elements) => {
                if name == "length" {
                    return Some(false);
                }
                if let Some(index) = array_index(name) {
                    if index < elements.len() {
                        return Some(true);
                    }
                }
            }
            ObjectKind::RegExp(_) => {
                if name == "source" || name == "flags" {
                    return Some(false);
                }
            }
            _ => {}
        }
        self.properties.get(name).map(|property| property.enumerable)
    }

    /// Own-property write. Array index writes go to the element storage,
    /// growing the array the way the host language would.
    pub fn set_own(&mut self, name: &str, value: JsValue) {
        if let ObjectKind::Array(elements) = &mut self.kind {
            if let Some(index) = array_index(name) {
                if index < elements.len() {
                    elements[index] = value;
                } else {
                    while elements.len() < index {
                        elements.push(JsValue::Undefined);
                    }
                    elements.push(value);
                }
                return;
            }
        }
        self.properties.set_value(name, value);
    }

    pub fn define(&mut self, name: &str, value: JsValue, enumerable: bool) {
        self.properties.define(name, value, enumerable);
    }

    /// Own enumerable keys in enumeration order (array indices first).
    pub fn own_enumerable_keys(&self) -> Vec<String> {
        let mut keys = vec![];
        if let ObjectKind::Array(elements) = &self.kind {
            for index in 0..elements.len() {
                keys.push(index.to_string());
            }
        }
        keys.extend(self.properties.enumerable_keys());
        keys
    }
}

fn array_index(name: &str) -> Option<usize> {
    if name.is_empty() || (name.len() > 1 && name.starts_with('0')) {
        return None;
    }
    name.parse::<usize>().ok()
}

/// Read a property through the raw prototype chain.
pub fn get_property(object: &JsObjectRef, name: &str) -> Option<JsValue> {
    let mut current = object.clone();
    loop {
        let (own, proto) = {
            let borrowed = current.borrow();
            (borrowed.get_own(name), borrowed.proto.clone())
        };
        if own.is_some() {
            return own;
        }
        match proto {
            Some(next) => current = next,
            None => return None,
        }
    }
}

/// `in`-operator semantics: own or inherited, raw chain.
pub fn has_property_raw(object: &JsObjectRef, name: &str) -> bool {
    let mut current = object.clone();
    loop {
        let (has, proto) = {
            let borrowed = current.borrow();
            (borrowed.has_own(name), borrowed.proto.clone())
        };
        if has {
            return true;
        }
        match proto {
            Some(next) => current = next,
            None => return false,
        }
    }
}

/// Keys visited by `for-in`: own enumerable keys plus the enumerable keys
/// of the raw prototype chain, deduplicated.
pub fn enumerable_keys(object: &JsObjectRef) -> Vec<String> {
    let mut keys: Vec<String> = vec![];
    let mut current = Some(object.clone());
    while let Some(obj) = current {
        let (own_keys, proto) = {
            let borrowed = obj.borrow();
            (borrowed.own_enumerable_keys(), borrowed.proto.clone())
        };
        for key in own_keys {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        current = proto;
    }
    keys
}
