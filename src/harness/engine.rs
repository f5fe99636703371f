//! The seam between the harness and a template-compilation engine.
//!
//! The harness never looks inside an engine: it compiles, digests and asks
//! for the controller attached to the compiled root. Engine failures travel
//! as `anyhow::Error` and reach callers unchanged.

use std::any::Any;
use std::sync::Arc;

use crate::core::dom::{Document, NodeId};

/// A change-detection context.
pub trait Scope: Send + Sync {
    /// Re-evaluate bindings now.
    fn digest(&self) -> anyhow::Result<()>;

    /// Digest from the root of the scope hierarchy.
    fn apply(&self) -> anyhow::Result<()>;
}

/// Per-component state attached to a compiled root.
pub trait IsolateScope: Send + Sync {
    /// The controller instance, type-erased. The harness downcasts it to
    /// `parking_lot::RwLock<C>`.
    fn controller(&self) -> Option<Arc<dyn Any + Send + Sync>>;
}

pub trait TemplateCompiler {
    type Scope: Scope + Clone + 'static;

    fn document(&self) -> &Document;

    /// Compile `template` and link it against `scope`, returning the live root.
    fn compile(&self, template: &str, scope: &Self::Scope) -> anyhow::Result<NodeId>;

    fn isolate_scope(&self, node: NodeId) -> Option<Arc<dyn IsolateScope>>;

    /// Drops engine state kept for a compiled tree that was discarded. The
    /// tree is already gone from the document when this runs.
    fn release(&self, _root: NodeId) {}
}
