//! Public evaluation entry points.
//!
//! A [`Sandbox`] is one isolated evaluation universe: its own builtin
//! constructors and prototypes, its own iteration ceiling. Nothing is
//! shared between sandboxes, and nothing evaluated inside one can reach
//! host state.

use std::rc::Rc;

use crate::parser::ast::ProgramData;
use crate::parser::{parse_to_ast, prepare_ast};
use crate::runner::ds::error::EvalError;
use crate::runner::ds::object::{JsObject, JsObjectRef};
use crate::runner::ds::primitives::{BuiltinKind, NativeRegistry};
use crate::runner::ds::scope::new_scope;
use crate::runner::ds::value::JsValue;
use crate::runner::eval::function::call_value;
use crate::runner::eval::statement::execute_program;
use crate::runner::eval::types::EvalContext;
use crate::runner::std_lib;

const DEFAULT_MAX_ITERATIONS: usize = 1_000_000;

pub struct Sandbox {
    natives: Rc<NativeRegistry>,
    max_iterations: usize,
}

impl Sandbox {
    pub fn new() -> Self {
        Self::with_max_iterations(DEFAULT_MAX_ITERATIONS)
    }

    /// The iteration ceiling is the single safety knob: every loop aborts
    /// with [`EvalError::InfiniteLoop`] once it runs `max_iterations`
    /// times.
    pub fn with_max_iterations(max_iterations: usize) -> Self {
        let natives = NativeRegistry::new();
        std_lib::install_core(&natives);
        Sandbox {
            natives,
            max_iterations,
        }
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn natives(&self) -> &Rc<NativeRegistry> {
        &self.natives
    }

    /// 'eval' with a controlled environment: parse, hoist and walk the
    /// tree against a fresh scope layered over `parent`.
    pub fn eval(&self, source: &str, parent: Option<&JsObjectRef>) -> Result<JsValue, EvalError> {
        let program = self.prepare(source)?;
        self.eval_ast(&program, parent)
    }

    /// Evaluate an already-prepared AST.
    pub fn eval_ast(
        &self,
        program: &ProgramData,
        parent: Option<&JsObjectRef>,
    ) -> Result<JsValue, EvalError> {
        self.eval_ast_in_scope(program, new_scope(parent))
    }

    /// Evaluate against a caller-built scope layer (the template engine
    /// layers data objects this way).
    pub fn eval_ast_in_scope(
        &self,
        program: &ProgramData,
        scope: JsObjectRef,
    ) -> Result<JsValue, EvalError> {
        let mut ctx = EvalContext::new(scope, &self.natives, self.max_iterations);
        execute_program(program, &mut ctx)
    }

    /// Parse and hoist without evaluating.
    pub fn prepare(&self, source: &str) -> Result<ProgramData, EvalError> {
        let program = parse_to_ast(source).map_err(|e| EvalError::SyntaxError(e.message))?;
        Ok(prepare_ast(program))
    }

    /// The `Function(params.., body)` surrogate: builds a callable that
    /// evaluates through this sandbox.
    pub fn function(
        &self,
        params: &[&str],
        body: &str,
        parent: Option<&JsObjectRef>,
    ) -> Result<JsValue, EvalError> {
        let scope = new_scope(parent);
        let mut ctx = EvalContext::new(scope, &self.natives, self.max_iterations);
        let mut args: Vec<JsValue> = params
            .iter()
            .map(|p| JsValue::String(p.to_string()))
            .collect();
        args.push(JsValue::String(body.to_string()));
        let factory = ctx.safe_function();
        call_value(&factory, JsValue::Undefined, args, &mut ctx)
    }

    /// Call a function value obtained from evaluation.
    pub fn call(
        &self,
        function: &JsValue,
        this: JsValue,
        args: Vec<JsValue>,
    ) -> Result<JsValue, EvalError> {
        let scope = new_scope(None);
        let mut ctx = EvalContext::new(scope, &self.natives, self.max_iterations);
        call_value(function, this, args, &mut ctx)
    }

    /// A fresh scope layer over `parent`, for seeding host bindings.
    pub fn scope(&self, parent: Option<&JsObjectRef>) -> JsObjectRef {
        new_scope(parent)
    }

    /// A plain data object in this sandbox's prototype universe.
    pub fn new_object(&self) -> JsObjectRef {
        JsObject::new_plain(Some(self.natives.object_proto()))
    }

    /// A data array in this sandbox's prototype universe.
    pub fn new_array(&self, elements: Vec<JsValue>) -> JsObjectRef {
        JsObject::new_array(elements, Some(self.natives.proto_of(BuiltinKind::Array)))
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}
