//! A small dirty-checking binding engine that satisfies the harness's
//! compilation contract: component registration, scopes with digest/apply,
//! `{{ }}` interpolation and a handful of `ng-*` directives.

pub mod compiler;
pub mod controller;
pub mod expr;
pub mod module;
pub mod scope;

pub use compiler::Compiler;
pub use controller::Controller;
pub use expr::{Expr, Part};
pub use module::{ComponentDefinition, Module};
pub use scope::{BindingScope, WeakBindingScope, DIGEST_TTL};

use thiserror::Error;

use crate::core::dom::DocumentError;

#[derive(Error, Debug)]
pub enum BindingError {
    #[error("Syntax error in '{expression}': {message}")]
    Syntax { expression: String, message: String },
    #[error("Controller has no method '{0}'")]
    UnknownMethod(String),
    #[error("Expression '{0}' cannot be assigned to")]
    NotAssignable(String),
    #[error("No controller in scope for '{0}'")]
    NoController(String),
    #[error("Model error: {0}")]
    Model(#[from] serde_json::Error),
    #[error("{0} digest iterations reached without the model stabilising")]
    DigestOverflow(usize),
    #[error("Digest already in progress")]
    DigestInProgress,
    #[error("Template has no root element: {0}")]
    EmptyTemplate(String),
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
    #[error("{} listener errors: {}", .0.len(), summarize(.0))]
    Listeners(Vec<BindingError>),
}

fn summarize(errors: &[BindingError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, BindingError>;
