//! # brackish - micro-templating with a sandboxed expression engine
//!
//! A small templating engine for component-based UIs featuring:
//! - Bracket-delimited expressions (`{ expr }`) with configurable pairs
//! - PEG parser for a restricted, auditable JavaScript expression subset
//! - Tree-walking sandboxed evaluator (no host `eval`, CSP-safe by design)
//! - Prototype-aware scope chains with `var`/`let` semantics
//! - Wrapped built-in constructors so sandboxed code can never touch
//!   shared prototypes
//!
//! ## Quick Start
//!
//! ### Rendering templates
//!
//! ```
//! use brackish::template::TemplateEngine;
//!
//! let engine = TemplateEngine::new();
//! let out = engine
//!     .render_json("Hi { name }!", &serde_json::json!({ "name": "rust" }))
//!     .unwrap();
//! assert_eq!(out.to_string(), "Hi rust!");
//! ```
//!
//! A template that is a single expression returns the raw value instead of
//! a string, and `{ name: expr, ... }` shorthands return a space-joined
//! list of the truthy keys:
//!
//! ```
//! use brackish::template::TemplateEngine;
//!
//! let engine = TemplateEngine::new();
//! let data = serde_json::json!({ "done": true, "hidden": false });
//! let v = engine.render_json("{ done: done, hidden: hidden }", &data).unwrap();
//! assert_eq!(v.to_string(), "done");
//! ```
//!
//! ### Evaluating expressions directly
//!
//! ```
//! use brackish::runner::api::Sandbox;
//!
//! let sandbox = Sandbox::new();
//! let v = sandbox
//!     .eval("[1, 2, 3].map(function (x) { return x + 1 }).join('-')", None)
//!     .unwrap();
//! assert_eq!(v.to_string(), "2-3-4");
//! ```
//!
//! ## Sandbox Architecture
//!
//! Expressions are never compiled to host code. The parser produces an AST
//! for a restricted grammar and the evaluator walks it against a chain of
//! scope layers. Each [`runner::api::Sandbox`] owns a fresh set of built-in
//! constructors; evaluation scopes receive *wrapped* substitutes whose
//! prototypes delegate to the sandbox-local originals, so property writes
//! from evaluated code can never leak into shared state. Identifier and
//! property lookups terminate at `null` rather than falling through to an
//! unguarded root object, and every loop carries an iteration counter that
//! turns runaway templates into a hard error instead of a hang.
//!
//! ## Modules
//!
//! - **[`parser`]** - PEG parser, AST types, hoisting pass
//! - **[`runner`]** - Sandboxed tree-walking evaluator
//!   - **[`runner::ds`]** - Values, objects, scope chains, wrapped builtins
//!   - **[`runner::eval`]** - Expression/statement dispatch
//!   - **[`runner::std_lib`]** - Native methods for the built-in types
//! - **[`template`]** - Bracket splitter and the template engine itself

#[macro_use]
extern crate lazy_static;

pub mod parser;
pub mod runner;
pub mod template;
