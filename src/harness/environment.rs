//! Per-test document lifecycle.

use crate::core::dom::{Document, NodeId};
use crate::Result;

/// Owns the ambient document for one test case. Nodes attached to `body`
/// are detached (and their listeners dropped) on teardown or drop.
pub struct TestEnvironment {
    document: Document,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            document: Document::new_html(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn body(&self) -> NodeId {
        // new_html always creates a body
        self.document
            .body()
            .unwrap_or_else(|| self.document.document_node())
    }

    /// Appends `node` to the body.
    pub fn attach(&self, node: NodeId) -> Result<()> {
        Ok(self.document.append_child(self.body(), node)?)
    }

    pub fn teardown(&self) -> Result<()> {
        let body = self.body();
        let children = self.document.get_children(body);
        let count = children.len();
        for child in children {
            self.document.remove_subtree(child)?;
        }
        tracing::trace!(count, "test environment torn down");
        Ok(())
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestEnvironment {
    fn drop(&mut self) {
        if let Err(error) = self.teardown() {
            tracing::warn!(%error, "test environment teardown failed");
        }
    }
}
