use super::document::Document;
use super::node::{NodeId, NodeType};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void_element(tag_name: &str) -> bool {
    VOID_ELEMENTS.contains(&tag_name)
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

impl Document {
    /// Markup of the node itself and its subtree.
    pub fn outer_html(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        self.serialize_node(node_id, &mut out);
        out
    }

    /// Markup of the node's children.
    pub fn inner_html(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        for child in self.get_children(node_id) {
            self.serialize_node(child, &mut out);
        }
        out
    }

    fn serialize_node(&self, node_id: NodeId, out: &mut String) {
        let Some(node) = self.get_node(node_id) else {
            return;
        };
        let node = node.read().clone();
        match node.node_type {
            NodeType::Element => {
                out.push('<');
                out.push_str(&node.tag_name);
                for (name, value) in node.attributes.entries() {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_attribute(value, out);
                    out.push('"');
                }
                out.push('>');
                if is_void_element(&node.tag_name) {
                    return;
                }
                for &child in node.children.iter() {
                    self.serialize_node(child, out);
                }
                out.push_str("</");
                out.push_str(&node.tag_name);
                out.push('>');
            }
            NodeType::Text => escape_text(&node.text_content, out),
            NodeType::Comment => {
                out.push_str("<!--");
                out.push_str(&node.text_content);
                out.push_str("-->");
            }
            NodeType::DocumentType => {
                out.push_str("<!DOCTYPE ");
                out.push_str(&node.tag_name);
                out.push('>');
            }
            NodeType::Document => {
                for &child in node.children.iter() {
                    self.serialize_node(child, out);
                }
            }
        }
    }
}
