use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn new() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    Element = 1,
    Text = 3,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
}

impl NodeType {
    /// Whether nodes of this type carry `dispatchEvent`.
    pub fn is_event_target(&self) -> bool {
        matches!(self, NodeType::Element | NodeType::Document)
    }
}

/// Attributes in insertion order, so serialized markup is stable across passes.
/// Names are stored lowercased and looked up ASCII case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct AttributeMap {
    map: SmallVec<[(String, String); 8]>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self {
            map: SmallVec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&String> {
        self.map
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn set(&mut self, name: String, value: String) {
        if let Some((_, v)) = self.map.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            *v = value;
        } else {
            self.map.push((name.to_ascii_lowercase(), value));
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.map.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.map.remove(pos).1)
    }

    pub fn has(&self, name: &str) -> bool {
        self.map.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &String)> {
        self.map.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub node_type: NodeType,
    pub tag_name: String,
    pub text_content: String,
    pub attributes: AttributeMap,
    pub parent: Option<NodeId>,
    pub children: SmallVec<[NodeId; 8]>,
    /// `checked` IDL state; `None` until set, then it stops following the attribute.
    pub checked: Option<bool>,
}

impl Node {
    fn blank(id: NodeId, node_type: NodeType, tag_name: String, text_content: String) -> Self {
        Self {
            id,
            node_type,
            tag_name,
            text_content,
            attributes: AttributeMap::new(),
            parent: None,
            children: SmallVec::new(),
            checked: None,
        }
    }

    pub fn new_element(tag_name: String, id: NodeId) -> Self {
        Self::blank(id, NodeType::Element, tag_name.to_lowercase(), String::new())
    }

    pub fn new_text(content: String, id: NodeId) -> Self {
        Self::blank(id, NodeType::Text, "#text".to_string(), content)
    }

    pub fn new_comment(content: String, id: NodeId) -> Self {
        Self::blank(id, NodeType::Comment, "#comment".to_string(), content)
    }

    pub fn new_document(id: NodeId) -> Self {
        Self::blank(id, NodeType::Document, "#document".to_string(), String::new())
    }

    pub fn new_doctype(name: String, id: NodeId) -> Self {
        Self::blank(id, NodeType::DocumentType, name, String::new())
    }

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.has(name)
    }

    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    pub fn is_input(&self) -> bool {
        self.is_element() && self.tag_name == "input"
    }

    /// Lower-cased `type` of an `<input>`, defaulting to `text`.
    pub fn input_type(&self) -> Option<String> {
        if !self.is_input() {
            return None;
        }
        Some(
            self.get_attribute("type")
                .map(|t| t.to_ascii_lowercase())
                .unwrap_or_else(|| "text".to_string()),
        )
    }

    pub fn is_checked(&self) -> bool {
        self.checked.unwrap_or_else(|| self.has_attribute("checked"))
    }

    pub fn is_disabled(&self) -> bool {
        self.is_element() && self.has_attribute("disabled")
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace())
            .into_iter()
            .flatten()
    }
}
