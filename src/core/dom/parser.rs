use html5ever::tendril::TendrilSink;
use html5ever::{parse_fragment, LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use super::document::{Document, Result};
use super::node::NodeId;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

impl Document {
    /// Parses `html` as a body fragment and returns its detached top-level nodes.
    ///
    /// The nodes belong to this document but have no parent until the caller
    /// appends them somewhere.
    pub fn parse_fragment(&self, html: &str) -> Result<Vec<NodeId>> {
        let parse_start = std::time::Instant::now();
        let context = QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from("body"),
        );
        let dom = parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new())
            .one(html);

        // The fragment algorithm wraps the result in a synthetic <html> element.
        let container = dom.document.children.borrow().first().cloned();
        let mut roots = Vec::new();
        if let Some(container) = container {
            for child in container.children.borrow().iter() {
                if let Some(id) = self.import_handle(child)? {
                    roots.push(id);
                }
            }
        }
        tracing::debug!(
            nodes = roots.len(),
            "fragment parsing completed in {:?}",
            parse_start.elapsed()
        );
        Ok(roots)
    }

    fn import_handle(&self, handle: &Handle) -> Result<Option<NodeId>> {
        let id = match &handle.data {
            NodeData::Element { name, attrs, .. } => {
                let id = self.create_element(&name.local);
                for attr in attrs.borrow().iter() {
                    self.set_attribute(id, &attr.name.local, &attr.value)?;
                }
                for child in handle.children.borrow().iter() {
                    if let Some(child_id) = self.import_handle(child)? {
                        self.append_child(id, child_id)?;
                    }
                }
                id
            }
            NodeData::Text { contents } => self.create_text_node(&contents.borrow()),
            NodeData::Comment { contents } => self.create_comment(contents),
            _ => return Ok(None),
        };
        Ok(Some(id))
    }
}
