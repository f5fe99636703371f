use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use thiserror::Error;

use super::node::{Node, NodeId, NodeType};
use crate::core::css::{SelectorEngine, SelectorError};
use crate::core::events::{Event, EventCallback, EventSystem, ListenerId};

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Hierarchy request error: {0}")]
    Hierarchy(String),
    #[error("Query error: {0}")]
    Query(#[from] SelectorError),
}

pub type Result<T> = std::result::Result<T, DocumentError>;

/// Shared handle to a synthetic document.
///
/// Cloning is cheap and every clone sees the same tree, which is what lets
/// event listeners and binding watchers capture the document they act on.
#[derive(Clone)]
pub struct Document {
    document_node: NodeId,
    nodes: Arc<DashMap<NodeId, Arc<RwLock<Node>>>>,
    events: Arc<EventSystem>,
    selectors: Arc<SelectorEngine>,
}

impl Document {
    pub fn new() -> Self {
        let document_node = NodeId::new();
        let nodes = DashMap::new();
        nodes.insert(
            document_node,
            Arc::new(RwLock::new(Node::new_document(document_node))),
        );
        Self {
            document_node,
            nodes: Arc::new(nodes),
            events: Arc::new(EventSystem::new()),
            selectors: Arc::new(SelectorEngine::new()),
        }
    }

    /// A document with the usual `html`, `head` and `body` skeleton.
    pub fn new_html() -> Self {
        let document = Self::new();
        let html = document.create_element("html");
        let head = document.create_element("head");
        let body = document.create_element("body");
        for (parent, child) in [(html, head), (html, body), (document.document_node, html)] {
            if let Err(error) = document.append_child(parent, child) {
                tracing::warn!(%parent, %child, %error, "failed to build document skeleton");
            }
        }
        document
    }

    pub fn document_node(&self) -> NodeId {
        self.document_node
    }

    pub fn body(&self) -> Option<NodeId> {
        self.descendants(self.document_node)
            .into_iter()
            .find(|&id| self.tag_name(id).as_deref() == Some("body"))
    }

    pub fn create_node(&self, node_type: NodeType, content: String) -> NodeId {
        let node_id = NodeId::new();
        let node = match node_type {
            NodeType::Element => Node::new_element(content, node_id),
            NodeType::Text => Node::new_text(content, node_id),
            NodeType::Comment => Node::new_comment(content, node_id),
            NodeType::Document => Node::new_document(node_id),
            NodeType::DocumentType => Node::new_doctype(content, node_id),
        };
        self.nodes.insert(node_id, Arc::new(RwLock::new(node)));
        node_id
    }

    pub fn create_element(&self, tag_name: &str) -> NodeId {
        self.create_node(NodeType::Element, tag_name.to_string())
    }

    pub fn create_text_node(&self, text: &str) -> NodeId {
        self.create_node(NodeType::Text, text.to_string())
    }

    pub fn create_comment(&self, text: &str) -> NodeId {
        self.create_node(NodeType::Comment, text.to_string())
    }

    pub fn get_node(&self, node_id: NodeId) -> Option<Arc<RwLock<Node>>> {
        self.nodes.get(&node_id).map(|e| e.value().clone())
    }

    fn require(&self, node_id: NodeId) -> Result<Arc<RwLock<Node>>> {
        self.get_node(node_id)
            .ok_or(DocumentError::NodeNotFound(node_id))
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn append_child(&self, parent_id: NodeId, child_id: NodeId) -> Result<()> {
        let parent = self.require(parent_id)?;
        let child = self.require(child_id)?;
        if !parent.read().node_type.is_event_target() {
            return Err(DocumentError::Hierarchy(format!(
                "node {} cannot have children",
                parent_id
            )));
        }
        if parent_id == child_id || self.is_ancestor(child_id, parent_id) {
            return Err(DocumentError::Hierarchy(format!(
                "node {} is an ancestor of {}",
                child_id, parent_id
            )));
        }
        self.detach(child_id)?;
        parent.write().children.push(child_id);
        child.write().parent = Some(parent_id);
        Ok(())
    }

    pub fn remove_child(&self, parent_id: NodeId, child_id: NodeId) -> Result<()> {
        let parent = self.require(parent_id)?;
        let child = self.require(child_id)?;
        if child.read().parent != Some(parent_id) {
            return Err(DocumentError::InvalidOperation(format!(
                "node {} is not a child of {}",
                child_id, parent_id
            )));
        }
        parent.write().children.retain(|id| *id != child_id);
        child.write().parent = None;
        Ok(())
    }

    /// Unlinks a node from its parent, if any. The subtree stays alive.
    pub fn detach(&self, node_id: NodeId) -> Result<()> {
        let parent = self.require(node_id)?.read().parent;
        match parent {
            Some(parent_id) => self.remove_child(parent_id, node_id),
            None => Ok(()),
        }
    }

    /// Detaches a subtree and forgets every node and listener in it.
    pub fn remove_subtree(&self, node_id: NodeId) -> Result<()> {
        self.detach(node_id)?;
        let mut doomed = self.descendants(node_id);
        doomed.push(node_id);
        for id in doomed {
            self.events.remove_node_listeners(id);
            self.nodes.remove(&id);
        }
        Ok(())
    }

    fn is_ancestor(&self, ancestor: NodeId, mut node_id: NodeId) -> bool {
        while let Some(parent) = self.get_parent(node_id) {
            if parent == ancestor {
                return true;
            }
            node_id = parent;
        }
        false
    }

    pub fn get_children(&self, node_id: NodeId) -> Vec<NodeId> {
        self.get_node(node_id)
            .map(|node| node.read().children.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn get_parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.get_node(node_id).and_then(|node| node.read().parent)
    }

    /// Element children only, skipping text and comments.
    pub fn element_children(&self, node_id: NodeId) -> Vec<NodeId> {
        self.get_children(node_id)
            .into_iter()
            .filter(|&id| self.node_type(id) == Some(NodeType::Element))
            .collect()
    }

    /// All nodes below `root` in document (pre-)order, `root` excluded.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.get_children(root).into_iter().rev().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.get_children(id).into_iter().rev());
        }
        out
    }

    pub fn node_type(&self, node_id: NodeId) -> Option<NodeType> {
        self.get_node(node_id).map(|node| node.read().node_type)
    }

    pub fn tag_name(&self, node_id: NodeId) -> Option<String> {
        self.get_node(node_id).and_then(|node| {
            let node = node.read();
            node.is_element().then(|| node.tag_name.clone())
        })
    }

    pub fn is_input(&self, node_id: NodeId) -> bool {
        self.get_node(node_id)
            .map(|node| node.read().is_input())
            .unwrap_or(false)
    }

    pub fn get_attribute(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.get_node(node_id)
            .and_then(|node| node.read().get_attribute(name))
    }

    pub fn has_attribute(&self, node_id: NodeId, name: &str) -> bool {
        self.get_node(node_id)
            .map(|node| node.read().has_attribute(name))
            .unwrap_or(false)
    }

    pub fn set_attribute(&self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let node = self.require(node_id)?;
        let mut node = node.write();
        if !node.is_element() {
            return Err(DocumentError::InvalidOperation(format!(
                "cannot set attribute '{}' on non-element {}",
                name, node_id
            )));
        }
        node.attributes.set(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn remove_attribute(&self, node_id: NodeId, name: &str) -> Result<Option<String>> {
        let node = self.require(node_id)?;
        let removed = node.write().attributes.remove(name);
        Ok(removed)
    }

    pub fn is_checked(&self, node_id: NodeId) -> bool {
        self.get_node(node_id)
            .map(|node| node.read().is_checked())
            .unwrap_or(false)
    }

    pub fn set_checked(&self, node_id: NodeId, checked: bool) -> Result<()> {
        let node = self.require(node_id)?;
        node.write().checked = Some(checked);
        Ok(())
    }

    /// Concatenated text of the node and its descendants.
    pub fn text_content(&self, node_id: NodeId) -> String {
        let Some(node) = self.get_node(node_id) else {
            return String::new();
        };
        let node_type = node.read().node_type;
        match node_type {
            NodeType::Text | NodeType::Comment => node.read().text_content.clone(),
            _ => self
                .descendants(node_id)
                .into_iter()
                .filter(|&id| self.node_type(id) == Some(NodeType::Text))
                .filter_map(|id| self.get_node(id))
                .map(|text| text.read().text_content.clone())
                .collect(),
        }
    }

    /// Text nodes get new data; elements get their children replaced by one text node.
    pub fn set_text_content(&self, node_id: NodeId, text: &str) -> Result<()> {
        let node = self.require(node_id)?;
        let node_type = node.read().node_type;
        match node_type {
            NodeType::Text | NodeType::Comment => {
                node.write().text_content = text.to_string();
                Ok(())
            }
            NodeType::Element => {
                for child in self.get_children(node_id) {
                    self.remove_subtree(child)?;
                }
                if !text.is_empty() {
                    let text_id = self.create_text_node(text);
                    self.append_child(node_id, text_id)?;
                }
                Ok(())
            }
            _ => Err(DocumentError::InvalidOperation(format!(
                "cannot set text content of {:?} node",
                node_type
            ))),
        }
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        self.query_selector_within(self.document_node, selector)
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.query_selector_all_within(self.document_node, selector)
    }

    /// First descendant of `root` matching `selector`, in document order.
    pub fn query_selector_within(&self, root: NodeId, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.selectors.query_selector(selector, root, self)?)
    }

    pub fn query_selector_all_within(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        Ok(self.selectors.query_selector_all(selector, root, self)?)
    }

    pub fn add_event_listener<F>(
        &self,
        node_id: NodeId,
        event_type: &str,
        capture: bool,
        callback: F,
    ) -> Result<ListenerId>
    where
        F: Fn(&mut Event) + Send + Sync + 'static,
    {
        let callback: EventCallback = Arc::new(callback);
        self.require(node_id)?;
        Ok(self
            .events
            .add_listener(node_id, event_type, capture, callback))
    }

    pub fn remove_event_listener(&self, listener: ListenerId) -> bool {
        self.events.remove_listener(listener)
    }

    /// Dispatches `event` at `target`. Returns `false` when a listener cancelled it.
    pub fn dispatch_event(&self, target: NodeId, event: &mut Event) -> Result<bool> {
        let node_type = self
            .node_type(target)
            .ok_or(DocumentError::NodeNotFound(target))?;
        if !node_type.is_event_target() {
            return Err(DocumentError::InvalidOperation(format!(
                "{:?} node {} is not an event target",
                node_type, target
            )));
        }
        Ok(self.events.dispatch(self, target, event))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("document_node", &self.document_node)
            .field("node_count", &self.nodes.len())
            .field("listener_count", &self.events.listener_count())
            .finish()
    }
}
