//! The templating layer: bracket splitting and rendering.

pub mod brackets;
pub mod tmpl;

pub use brackets::{Brackets, Fragment, LoopKeys};
pub use tmpl::TemplateEngine;
