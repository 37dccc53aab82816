//! Function values and call machinery.
//!
//! Every invocation of a scripted function gets a fresh declaration scope
//! chained to the captured one. An absent receiver becomes `null` inside
//! the sandbox: evaluated code never observes a host global object.

use std::rc::Rc;

use crate::parser::ast::{FunctionBodyData, FunctionData};
use crate::parser::{parse_to_ast, prepare_ast};
use crate::runner::ds::error::EvalError;
use crate::runner::ds::object::{
    FunctionValue, JsObject, JsObjectRef, NativeFn, ObjectKind, ScriptedFunction,
};
use crate::runner::ds::primitives::BuiltinKind;
use crate::runner::ds::scope::new_scope;
use crate::runner::ds::value::JsValue;
use crate::runner::std_lib::core::construct_builtin;

use super::expression::to_js_string;
use super::statement::execute_statement_list;
use super::types::{CompletionType, EvalContext, ValueResult};

/// Build a callable from a function AST, closing over `scope`.
pub fn make_function(data: &FunctionData, scope: &JsObjectRef, ctx: &EvalContext) -> JsValue {
    let natives = ctx.primitives().natives();
    let scripted = ScriptedFunction {
        name: data.id.as_ref().map(|id| id.name.clone()),
        params: data.params.iter().map(|p| p.name.clone()).collect(),
        body: data.body.clone(),
        scope: scope.clone(),
    };
    let func = JsObject::new_function(
        FunctionValue::Scripted(Rc::new(scripted)),
        Some(natives.function_proto.clone()),
    );
    let proto = JsObject::new_plain(Some(natives.object_proto()));
    proto
        .borrow_mut()
        .define("constructor", JsValue::Object(func.clone()), false);
    func.borrow_mut()
        .define("prototype", JsValue::Object(proto), false);
    JsValue::Object(func)
}

enum Callable {
    Native(NativeFn),
    Scripted(Rc<ScriptedFunction>),
    Builtin(BuiltinKind),
    Wrapped(BuiltinKind, JsObjectRef),
    SafeCtor(JsObjectRef),
    HostCtor,
}

fn resolve_callable(value: &JsValue) -> Result<Callable, EvalError> {
    let object = match value.as_object() {
        Some(o) => o,
        None => {
            return Err(EvalError::TypeError(format!(
                "{} is not a function",
                value
            )))
        }
    };
    let borrowed = object.borrow();
    match &borrowed.kind {
        ObjectKind::Function(function) => Ok(match function {
            FunctionValue::Native { func, .. } => Callable::Native(*func),
            FunctionValue::Scripted(scripted) => Callable::Scripted(scripted.clone()),
            FunctionValue::Builtin(kind) => Callable::Builtin(*kind),
            FunctionValue::Wrapped(kind) => Callable::Wrapped(*kind, object.clone()),
            FunctionValue::SafeFunctionCtor { scope } => Callable::SafeCtor(scope.clone()),
            FunctionValue::HostFunctionCtor => Callable::HostCtor,
        }),
        _ => Err(EvalError::TypeError(format!(
            "{} is not a function",
            value
        ))),
    }
}

/// Call any function value.
pub fn call_value(
    callee: &JsValue,
    this: JsValue,
    args: Vec<JsValue>,
    ctx: &mut EvalContext,
) -> ValueResult {
    match resolve_callable(callee)? {
        Callable::Native(func) => func(ctx, this, args),
        Callable::Scripted(scripted) => call_scripted(&scripted, this, args, ctx),
        Callable::Builtin(kind) => construct_builtin(kind, args, ctx),
        Callable::Wrapped(kind, wrapper) => {
            let value = construct_builtin(kind, args, ctx)?;
            Ok(relink_prototype(value, &wrapper))
        }
        Callable::SafeCtor(scope) => build_safe_function(&scope, args, ctx),
        Callable::HostCtor => Err(EvalError::TypeError(
            "Function constructor is not available".to_string(),
        )),
    }
}

/// `new` for both wrapped and ordinary function values.
pub fn apply_new(target: &JsValue, args: Vec<JsValue>, ctx: &mut EvalContext) -> ValueResult {
    match resolve_callable(target).map_err(|_| {
        EvalError::TypeError(format!("{} is not a constructor", target))
    })? {
        Callable::Wrapped(kind, wrapper) => {
            // construct through the underlying builtin, then relink so
            // later lookups walk the sandbox's own prototype
            let value = construct_builtin(kind, args, ctx)?;
            Ok(relink_prototype(value, &wrapper))
        }
        Callable::Builtin(kind) => construct_builtin(kind, args, ctx),
        Callable::Scripted(scripted) => {
            let proto = match target.as_object().unwrap().borrow().get_own("prototype") {
                Some(JsValue::Object(p)) => p,
                _ => ctx.primitives().natives().object_proto(),
            };
            let instance = JsObject::new_plain(Some(proto));
            let result = call_scripted(&scripted, JsValue::Object(instance.clone()), args, ctx)?;
            Ok(match result {
                JsValue::Object(o) => JsValue::Object(o),
                _ => JsValue::Object(instance),
            })
        }
        Callable::Native(func) => func(ctx, JsValue::Undefined, args),
        Callable::SafeCtor(scope) => build_safe_function(&scope, args, ctx),
        Callable::HostCtor => Err(EvalError::TypeError(
            "Function constructor is not available".to_string(),
        )),
    }
}

fn relink_prototype(value: JsValue, wrapper: &JsObjectRef) -> JsValue {
    if let JsValue::Object(instance) = &value {
        if let Some(JsValue::Object(proto)) = wrapper.borrow().get_own("prototype") {
            instance.borrow_mut().proto = Some(proto);
        }
    }
    value
}

/// One invocation of a scripted function: fresh declaration scope, `this`
/// and `arguments` bound, declared parameters bound positionally (extra
/// arguments ignored, missing ones left unbound).
pub fn call_scripted(
    scripted: &Rc<ScriptedFunction>,
    this: JsValue,
    args: Vec<JsValue>,
    ctx: &mut EvalContext,
) -> ValueResult {
    let scope = new_scope(Some(&scripted.scope));
    {
        let arguments = JsObject::new_array(
            args.clone(),
            Some(ctx.primitives().natives().proto_of(BuiltinKind::Array)),
        );
        let mut layer = scope.borrow_mut();
        layer.set_own(
            "this",
            match this {
                JsValue::Undefined => JsValue::Null,
                other => other,
            },
        );
        layer.set_own("arguments", JsValue::Object(arguments));
        for (index, arg) in args.into_iter().enumerate() {
            match scripted.params.get(index) {
                Some(param) => layer.set_own(param, arg),
                None => break,
            }
        }
    }

    let mut child = ctx.for_call(scope);
    let completion = execute_statement_list(&scripted.body.body, &mut child)?;
    Ok(match completion.completion_type {
        CompletionType::Return => completion.get_value(),
        _ => JsValue::Undefined,
    })
}

/// The sandboxed `Function(params.., body)` factory: the body compiles
/// through the same restricted parser and evaluator, never the host.
fn build_safe_function(
    factory_scope: &JsObjectRef,
    args: Vec<JsValue>,
    ctx: &mut EvalContext,
) -> ValueResult {
    let mut args = args;
    let source = match args.pop() {
        Some(value) => to_js_string(&value),
        None => String::new(),
    };
    let params: Vec<String> = args.iter().map(to_js_string).collect();

    let program = prepare_ast(
        parse_to_ast(&source).map_err(|e| EvalError::SyntaxError(e.message))?,
    );
    let body = Rc::new(FunctionBodyData {
        meta: program.meta,
        body: program.body,
    });

    let natives = ctx.primitives().natives();
    let scripted = ScriptedFunction {
        name: None,
        params,
        body,
        scope: factory_scope.clone(),
    };
    let func = JsObject::new_function(
        FunctionValue::Scripted(Rc::new(scripted)),
        Some(natives.function_proto.clone()),
    );
    let proto = JsObject::new_plain(Some(natives.object_proto()));
    proto
        .borrow_mut()
        .define("constructor", JsValue::Object(func.clone()), false);
    func.borrow_mut()
        .define("prototype", JsValue::Object(proto), false);
    Ok(JsValue::Object(func))
}
