//! Routing of a trigger request to the event synthesizer or to a target's
//! own trigger capability.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::synthesizer::synthesize;
use crate::core::dom::{Document, NodeId};
use crate::{HarnessError, Result};

/// Something that can trigger events on itself without the synthesizer.
pub trait SelfTrigger: Send + Sync {
    fn trigger(&self, event_name: &str, data: Option<&Value>) -> Result<()>;
}

/// A wrapper-like object around a node. Every accessor is optional;
/// [`Triggerable::from_handle`] picks exactly one of them.
pub trait NodeHandle: Send + Sync {
    /// The element the wrapper was built around.
    fn element(&self) -> Option<NodeId> {
        None
    }

    /// The rendered root of a mounted component.
    fn root_node(&self) -> Option<NodeId> {
        None
    }

    fn native_trigger(&self) -> Option<Arc<dyn SelfTrigger>> {
        None
    }
}

#[derive(Clone)]
pub enum Triggerable {
    Selector(String),
    NativeNode(NodeId),
    /// A wrapper whose node receives synthesized events.
    WrapperWithNode(NodeId),
    /// A wrapper with no usable node that triggers events itself.
    WrapperWithNativeTrigger(Arc<dyn SelfTrigger>),
    SelfTriggering(Arc<dyn SelfTrigger>),
}

impl fmt::Debug for Triggerable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selector(selector) => f.debug_tuple("Selector").field(selector).finish(),
            Self::NativeNode(node) => f.debug_tuple("NativeNode").field(node).finish(),
            Self::WrapperWithNode(node) => f.debug_tuple("WrapperWithNode").field(node).finish(),
            Self::WrapperWithNativeTrigger(_) => f.write_str("WrapperWithNativeTrigger(..)"),
            Self::SelfTriggering(_) => f.write_str("SelfTriggering(..)"),
        }
    }
}

impl Triggerable {
    /// Resolves a handle in precedence order: an `<input>` element, any
    /// other dispatchable element, the root node, then the native trigger.
    pub fn from_handle(document: &Document, handle: &dyn NodeHandle) -> Result<Self> {
        let element = handle.element();
        if let Some(input) = element.filter(|&node| document.is_input(node)) {
            return Ok(Self::WrapperWithNode(input));
        }
        if let Some(node) = element.filter(|&node| is_dispatchable(document, node)) {
            return Ok(Self::WrapperWithNode(node));
        }
        if let Some(root) = handle.root_node() {
            return Ok(Self::WrapperWithNode(root));
        }
        handle
            .native_trigger()
            .map(Self::WrapperWithNativeTrigger)
            .ok_or(HarnessError::UntriggerableTarget)
    }
}

impl From<&str> for Triggerable {
    fn from(selector: &str) -> Self {
        Self::Selector(selector.to_string())
    }
}

impl From<String> for Triggerable {
    fn from(selector: String) -> Self {
        Self::Selector(selector)
    }
}

impl From<&String> for Triggerable {
    fn from(selector: &String) -> Self {
        Self::Selector(selector.clone())
    }
}

impl From<NodeId> for Triggerable {
    fn from(node: NodeId) -> Self {
        Self::NativeNode(node)
    }
}

fn is_dispatchable(document: &Document, node: NodeId) -> bool {
    document
        .node_type(node)
        .is_some_and(|node_type| node_type.is_event_target())
}

/// Dispatches `event_name` at `target`. Selectors are resolved with
/// `query_one`, normally the owning wrapper's scoped query.
pub fn dispatch<Q>(
    document: &Document,
    target: &Triggerable,
    event_name: &str,
    data: Option<&Value>,
    query_one: Q,
) -> Result<()>
where
    Q: FnOnce(&str) -> Result<Option<NodeId>>,
{
    match target {
        Triggerable::Selector(selector) => {
            let node = query_one(selector)?
                .ok_or_else(|| HarnessError::ElementNotFound(selector.clone()))?;
            synthesize(document, node, event_name, data)
        }
        Triggerable::NativeNode(node) | Triggerable::WrapperWithNode(node) => {
            synthesize(document, *node, event_name, data)
        }
        Triggerable::WrapperWithNativeTrigger(native) => {
            tracing::trace!(event = event_name, "delegating to wrapper's native trigger");
            native.trigger(event_name, data)
        }
        Triggerable::SelfTriggering(target) => {
            tracing::trace!(event = event_name, "delegating to self-triggering target");
            target.trigger(event_name, data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl SelfTrigger for Recorder {
        fn trigger(&self, event_name: &str, _data: Option<&Value>) -> Result<()> {
            self.calls.lock().push(event_name.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct Handle {
        element: Option<NodeId>,
        root: Option<NodeId>,
        native: Option<Arc<Recorder>>,
    }

    impl NodeHandle for Handle {
        fn element(&self) -> Option<NodeId> {
            self.element
        }

        fn root_node(&self) -> Option<NodeId> {
            self.root
        }

        fn native_trigger(&self) -> Option<Arc<dyn SelfTrigger>> {
            self.native.clone().map(|r| r as Arc<dyn SelfTrigger>)
        }
    }

    fn no_query(_: &str) -> Result<Option<NodeId>> {
        Ok(None)
    }

    fn count_clicks(doc: &Document, node: NodeId) -> Arc<Mutex<usize>> {
        let hits = Arc::new(Mutex::new(0));
        let counter = hits.clone();
        doc.add_event_listener(node, "click", false, move |_| *counter.lock() += 1)
            .unwrap();
        hits
    }

    fn resolved_node(doc: &Document, handle: &Handle) -> Option<NodeId> {
        match Triggerable::from_handle(doc, handle).unwrap() {
            Triggerable::WrapperWithNode(node) => Some(node),
            _ => None,
        }
    }

    #[test]
    fn selector_miss_is_element_not_found() {
        let doc = Document::new();
        let err = dispatch(&doc, &"#missing".into(), "click", None, no_query).unwrap_err();
        assert!(matches!(err, HarnessError::ElementNotFound(s) if s == "#missing"));
    }

    #[test]
    fn input_element_wins_over_root() {
        let doc = Document::new();
        let root = doc.create_element("div");
        let input = doc.create_element("input");
        doc.append_child(root, input).unwrap();
        let input_hits = count_clicks(&doc, input);
        let handle = Handle {
            element: Some(input),
            root: Some(root),
            native: Some(Arc::default()),
        };
        let target = Triggerable::from_handle(&doc, &handle).unwrap();
        dispatch(&doc, &target, "click", None, no_query).unwrap();
        assert_eq!(*input_hits.lock(), 1);
    }

    #[test]
    fn plain_element_wins_over_root() {
        let doc = Document::new();
        let root = doc.create_element("div");
        let button = doc.create_element("button");
        doc.append_child(root, button).unwrap();
        let button_hits = count_clicks(&doc, button);
        let root_hits = count_clicks(&doc, root);
        let handle = Handle {
            element: Some(button),
            root: Some(root),
            native: None,
        };
        assert_eq!(resolved_node(&doc, &handle), Some(button));

        let target = Triggerable::from_handle(&doc, &handle).unwrap();
        dispatch(&doc, &target, "click", None, no_query).unwrap();
        assert_eq!(*button_hits.lock(), 1);
        // Reaches the root only by bubbling.
        assert_eq!(*root_hits.lock(), 1);
    }

    #[test]
    fn undispatchable_element_falls_back_to_root() {
        let doc = Document::new();
        let root = doc.create_element("section");
        let text = doc.create_text_node("label");
        let root_hits = count_clicks(&doc, root);
        let handle = Handle {
            element: Some(text),
            root: Some(root),
            native: None,
        };
        assert_eq!(resolved_node(&doc, &handle), Some(root));
        let target = Triggerable::from_handle(&doc, &handle).unwrap();
        dispatch(&doc, &target, "click", None, no_query).unwrap();
        assert_eq!(*root_hits.lock(), 1);
    }

    #[test]
    fn root_wins_over_native_trigger() {
        let doc = Document::new();
        let root = doc.create_element("section");
        let root_hits = count_clicks(&doc, root);
        let recorder = Arc::new(Recorder::default());
        let handle = Handle {
            element: None,
            root: Some(root),
            native: Some(recorder.clone()),
        };
        let target = Triggerable::from_handle(&doc, &handle).unwrap();
        dispatch(&doc, &target, "click", None, no_query).unwrap();
        assert_eq!(*root_hits.lock(), 1);
        assert!(recorder.calls.lock().is_empty());
    }

    #[test]
    fn native_trigger_receives_unsupported_names() {
        let doc = Document::new();
        let recorder = Arc::new(Recorder::default());
        let handle = Handle {
            native: Some(recorder.clone()),
            ..Handle::default()
        };
        let target = Triggerable::from_handle(&doc, &handle).unwrap();
        assert!(matches!(target, Triggerable::WrapperWithNativeTrigger(_)));
        dispatch(&doc, &target, "focus", None, no_query).unwrap();
        assert_eq!(*recorder.calls.lock(), vec!["focus".to_string()]);
    }

    #[test]
    fn empty_handle_is_untriggerable() {
        let doc = Document::new();
        assert!(matches!(
            Triggerable::from_handle(&doc, &Handle::default()),
            Err(HarnessError::UntriggerableTarget)
        ));
    }
}
