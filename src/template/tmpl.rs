//! The template engine.
//!
//! Renders bracket-delimited templates against a data value. Templates
//! compile once (keyed by their source string) into text parts and
//! prepared expression ASTs; rendering evaluates those in the engine's
//! sandbox with the data object layered into the scope chain.
//!
//! A template that is exactly one expression returns the raw value.
//! Mixed templates return a string where falsy expression values, except
//! the number zero, render as the empty string. `{ name: expr, ... }`
//! shorthands render the space-joined names of the truthy expressions.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use regex::Regex;

use crate::parser::ast::ProgramData;
use crate::parser::free_variables;
use crate::runner::api::Sandbox;
use crate::runner::ds::error::EvalError;
use crate::runner::ds::object::JsObjectRef;
use crate::runner::ds::primitives::Primitives;
use crate::runner::ds::scope::has_property;
use crate::runner::ds::value::JsValue;
use crate::runner::eval::expression::{to_boolean, to_js_string};
use crate::runner::std_lib::{json, math};

use super::brackets::{self, Brackets, Fragment, LoopKeys};

pub struct TemplateEngine {
    sandbox: Sandbox,
    brackets: Brackets,
    cache: RefCell<HashMap<String, Rc<CompiledTemplate>>>,
    error_handler: RefCell<Option<Box<dyn Fn(&EvalError)>>>,
    math: JsObjectRef,
    json: JsObjectRef,
}

struct CompiledTemplate {
    parts: Vec<Part>,
    /// the whole template is one expression: render the raw value
    single: bool,
}

enum Part {
    Text(String),
    Expr(ExprPart),
}

enum ExprPart {
    Empty,
    Raw {
        program: Rc<ProgramData>,
        free: Vec<String>,
    },
    Shorthand(Vec<ShorthandPair>),
}

struct ShorthandPair {
    name: String,
    program: Rc<ProgramData>,
    free: Vec<String>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self::with_sandbox(Sandbox::new())
    }

    pub fn with_sandbox(sandbox: Sandbox) -> Self {
        let math = math::create(sandbox.natives());
        let json = json::create(sandbox.natives());
        TemplateEngine {
            sandbox,
            brackets: Brackets::default_pair(),
            cache: RefCell::new(HashMap::new()),
            error_handler: RefCell::new(None),
            math,
            json,
        }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn brackets(&self) -> &Brackets {
        &self.brackets
    }

    /// Reconfigure the bracket pair; compiled templates are discarded
    /// since their split depends on it.
    pub fn set_brackets(&mut self, pair: Option<&str>) -> Result<(), EvalError> {
        self.brackets = Brackets::set(pair)?;
        self.cache.borrow_mut().clear();
        log::debug!("brackets set to \"{} {}\"", self.brackets.open(), self.brackets.close());
        Ok(())
    }

    /// Expression evaluation errors degrade to empty output and are
    /// reported here instead of aborting the render.
    pub fn set_error_handler(&self, handler: impl Fn(&EvalError) + 'static) {
        *self.error_handler.borrow_mut() = Some(Box::new(handler));
    }

    pub fn clear_error_handler(&self) {
        *self.error_handler.borrow_mut() = None;
    }

    pub fn has_expr(&self, text: &str) -> bool {
        brackets::has_expr(text, &self.brackets)
    }

    pub fn loop_keys(&self, expr: &str) -> LoopKeys {
        brackets::loop_keys(expr, &self.brackets)
    }

    /// Render a template against a data value.
    pub fn render(&self, template: &str, data: &JsValue) -> Result<JsValue, EvalError> {
        if template.is_empty() {
            return Ok(JsValue::String(String::new()));
        }
        let compiled = self.compile(template)?;
        let scope = self.render_scope(data);

        if compiled.single {
            for part in &compiled.parts {
                if let Part::Expr(expr) = part {
                    return Ok(self.eval_raw(expr, &scope));
                }
            }
            return Ok(JsValue::Undefined);
        }

        let mut out = String::new();
        for part in &compiled.parts {
            match part {
                Part::Text(text) => out.push_str(text),
                Part::Expr(expr) => {
                    let value = self.eval_raw(expr, &scope);
                    if to_boolean(&value) || is_zero(&value) {
                        out.push_str(&to_js_string(&value));
                    }
                }
            }
        }
        Ok(JsValue::String(out))
    }

    /// Render with serde_json data, converting it into this sandbox.
    pub fn render_json(
        &self,
        template: &str,
        data: &serde_json::Value,
    ) -> Result<JsValue, EvalError> {
        let data = json::from_serde(data, self.sandbox.natives());
        self.render(template, &data)
    }

    /// The scope chain for one render: a fresh layer over the data
    /// object, with `this`, `Math` and `JSON` reachable.
    fn render_scope(&self, data: &JsValue) -> JsObjectRef {
        let scope = self.sandbox.scope(data.as_object());
        {
            let mut layer = scope.borrow_mut();
            layer.set_own(
                "this",
                match data {
                    JsValue::Undefined => JsValue::Null,
                    other => other.clone(),
                },
            );
        }
        let primitives = Primitives::ensure(&scope, self.sandbox.natives());
        for (name, global) in [("Math", &self.math), ("JSON", &self.json)] {
            if !has_property(&scope, name, &primitives) {
                scope
                    .borrow_mut()
                    .set_own(name, JsValue::Object(global.clone()));
            }
        }
        scope
    }

    fn report(&self, error: &EvalError) {
        log::debug!("template expression failed: {}", error);
        if let Some(handler) = self.error_handler.borrow().as_ref() {
            handler(error);
        }
    }

    /// Evaluate one expression part; failures report and degrade to
    /// undefined. The iteration guard stays fatal.
    fn eval_raw(&self, expr: &ExprPart, scope: &JsObjectRef) -> JsValue {
        match expr {
            ExprPart::Empty => JsValue::Undefined,
            ExprPart::Raw { program, free } => {
                match self.eval_program(program, free, scope) {
                    Ok(value) => value,
                    Err(error) => {
                        self.report(&error);
                        JsValue::Undefined
                    }
                }
            }
            ExprPart::Shorthand(pairs) => {
                let mut names = vec![];
                for pair in pairs {
                    let truthy = match self.eval_program(&pair.program, &pair.free, scope) {
                        Ok(value) => to_boolean(&value),
                        Err(error) => {
                            self.report(&error);
                            false
                        }
                    };
                    if truthy {
                        names.push(pair.name.as_str());
                    }
                }
                JsValue::String(names.join(" ").trim().to_string())
            }
        }
    }

    fn eval_program(
        &self,
        program: &Rc<ProgramData>,
        free: &[String],
        scope: &JsObjectRef,
    ) -> Result<JsValue, EvalError> {
        // template variables are soft: unresolvable names read undefined
        let primitives = Primitives::ensure(scope, self.sandbox.natives());
        for name in free {
            if !has_property(scope, name, &primitives) {
                scope.borrow_mut().set_own(name, JsValue::Undefined);
            }
        }
        match self.sandbox.eval_ast_in_scope(program, scope.clone()) {
            Err(EvalError::InfiniteLoop) => Err(EvalError::InfiniteLoop),
            other => other,
        }
    }

    fn compile(&self, template: &str) -> Result<Rc<CompiledTemplate>, EvalError> {
        if let Some(compiled) = self.cache.borrow().get(template) {
            return Ok(compiled.clone());
        }
        log::debug!("compiling template ({} bytes)", template.len());

        let fragments = brackets::split(template, &self.brackets);
        let mut parts = vec![];
        let mut expr_count = 0;
        let mut text_seen = false;
        for fragment in fragments {
            match fragment {
                Fragment::Text(text) => {
                    if !text.is_empty() {
                        text_seen = true;
                    }
                    parts.push(Part::Text(text));
                }
                Fragment::Expr(source) => {
                    expr_count += 1;
                    parts.push(Part::Expr(self.compile_expr(&source)?));
                }
            }
        }
        let compiled = Rc::new(CompiledTemplate {
            single: expr_count == 1 && !text_seen,
            parts,
        });
        self.cache
            .borrow_mut()
            .insert(template.to_string(), compiled.clone());
        Ok(compiled)
    }

    fn compile_expr(&self, source: &str) -> Result<ExprPart, EvalError> {
        if source.trim().is_empty() {
            return Ok(ExprPart::Empty);
        }
        if let Some(list) = extract_shorthand_list(source) {
            let mut pairs = vec![];
            for (name, expr) in list {
                let program = Rc::new(self.sandbox.prepare(&expr)?);
                let free = free_variables(&program);
                pairs.push(ShorthandPair {
                    name,
                    program,
                    free,
                });
            }
            return Ok(ExprPart::Shorthand(pairs));
        }
        let program = Rc::new(self.sandbox.prepare(source)?);
        let free = free_variables(&program);
        Ok(ExprPart::Raw { program, free })
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    // `name:` opener of a class shorthand; quoted or CSS-flavored
    static ref CSNAME: Regex = Regex::new(
        r#"^\s*(?:"([^"]*)"|'([^']*)'|(-?[_A-Za-z\x{A0}-\x{FF}][-\w\x{A0}-\x{FF}]*))\s*:"#
    )
    .unwrap();
    static ref SPACES: Regex = Regex::new(r"\s+").unwrap();
}

/// Try to read `name: expr, name: expr ...`; `None` when the source does
/// not open with a shorthand name. Trailing segments that stop matching
/// are dropped, as the splitter has always done.
fn extract_shorthand_list(source: &str) -> Option<Vec<(String, String)>> {
    let mut rest = source;
    let mut list = vec![];
    while let Some(captures) = CSNAME.captures(rest) {
        let name = match (captures.get(1), captures.get(2), captures.get(3)) {
            (Some(quoted), _, _) | (_, Some(quoted), _) => {
                SPACES.replace_all(quoted.as_str(), " ").trim().to_string()
            }
            (_, _, Some(ident)) => ident.as_str().to_string(),
            _ => break,
        };
        rest = &rest[captures.get(0).unwrap().end()..];
        let (expr, remainder) = split_at_top_level_comma(rest);
        list.push((name, expr.trim().to_string()));
        match remainder {
            Some(remainder) => rest = remainder,
            None => {
                rest = "";
                break;
            }
        }
    }
    if list.is_empty() {
        None
    } else {
        Some(list)
    }
}

/// Zero survives falsy-to-empty conversion in text templates.
fn is_zero(value: &JsValue) -> bool {
    match value {
        JsValue::Number(n) => !n.is_nan() && n.to_f64() == 0.0,
        _ => false,
    }
}

/// Split at the first comma outside brackets and quotes.
fn split_at_top_level_comma(source: &str) -> (&str, Option<&str>) {
    let bytes: Vec<char> = source.chars().collect();
    let mut depth = 0i32;
    let mut i = 0;
    let mut byte_pos = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            '\'' | '"' => {
                // skip the quoted run
                let quote = c;
                i += 1;
                byte_pos += c.len_utf8();
                while i < bytes.len() {
                    let q = bytes[i];
                    i += 1;
                    byte_pos += q.len_utf8();
                    if q == '\\' && i < bytes.len() {
                        byte_pos += bytes[i].len_utf8();
                        i += 1;
                    } else if q == quote {
                        break;
                    }
                }
                continue;
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                return (&source[..byte_pos], Some(&source[byte_pos + 1..]));
            }
            _ => {}
        }
        byte_pos += c.len_utf8();
        i += 1;
    }
    (source, None)
}
