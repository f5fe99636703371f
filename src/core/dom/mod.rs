//! Synthetic document tree: an arena of nodes behind a shareable handle.

pub mod document;
pub mod node;
pub mod parser;
pub mod serializer;

pub use document::{Document, DocumentError, Result};
pub use node::{AttributeMap, Node, NodeId, NodeType};
pub use serializer::is_void_element;
