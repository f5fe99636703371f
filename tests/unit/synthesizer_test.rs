use std::sync::Arc;

use component_harness::core::dom::Document;
use component_harness::core::events::EventPhase;
use component_harness::harness::synthesize;
use component_harness::HarnessError;
use parking_lot::Mutex;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

fn recorder(doc: &Document, node: component_harness::NodeId, event: &str) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    doc.add_event_listener(node, event, false, move |e| {
        sink.lock().push(format!(
            "{}:{:?}:{}:{}",
            e.event_type,
            e.phase(),
            e.bubbles,
            e.cancelable
        ));
    })
    .unwrap();
    log
}

#[test]
fn test_mouse_events_bubble_to_ancestors() {
    let doc = Document::new();
    let root = doc.parse_fragment("<div><button>go</button></div>").unwrap()[0];
    let button = doc.get_children(root)[0];
    let log = recorder(&doc, root, "mousedown");

    assert_ok!(synthesize(&doc, button, "mousedown", None));

    assert_eq!(
        *log.lock(),
        vec![format!("mousedown:{:?}:true:true", EventPhase::Bubbling)]
    );
}

#[test]
fn test_keyboard_events_take_their_init_from_data() {
    let doc = Document::new();
    let root = doc.parse_fragment("<form><input></form>").unwrap()[0];
    let input = doc.get_children(root)[0];
    let parent_log = recorder(&doc, root, "keyup");
    let keys = Arc::new(Mutex::new(Vec::new()));
    let sink = keys.clone();
    doc.add_event_listener(input, "keyup", false, move |e| {
        if let Some(init) = e.as_keyboard() {
            sink.lock().push((init.key.clone(), init.alt_key));
        }
    })
    .unwrap();

    synthesize(&doc, input, "keyup", Some(&json!({ "key": "Tab", "altKey": true }))).unwrap();
    // No bubbles flag in the dictionary, so the form never sees it.
    assert!(parent_log.lock().is_empty());

    synthesize(&doc, input, "keyup", Some(&json!({ "key": "q", "bubbles": true }))).unwrap();
    assert_eq!(parent_log.lock().len(), 1);
    assert_eq!(
        *keys.lock(),
        vec![("Tab".to_string(), true), ("q".to_string(), false)]
    );
}

#[test]
fn test_refused_and_unknown_names() {
    let doc = Document::new();
    let input = doc.create_element("input");
    for name in ["focus", "change", "blur", "select"] {
        assert!(matches!(
            synthesize(&doc, input, name, None),
            Err(HarnessError::UnsupportedEventKind(n)) if n == name
        ));
    }
    assert!(matches!(
        synthesize(&doc, input, "dblclick", None),
        Err(HarnessError::UnknownEventKind(n)) if n == "dblclick"
    ));
}

#[test]
fn test_removed_node_is_not_dispatchable() {
    let doc = Document::new();
    let node = doc.create_element("div");
    doc.remove_subtree(node).unwrap();
    assert_err!(synthesize(&doc, node, "mouseup", None));
    assert!(matches!(
        synthesize(&doc, node, "click", None),
        Err(HarnessError::NotDispatchable(id)) if id == node
    ));
}

#[test]
fn test_click_on_checkbox_runs_activation() {
    let doc = Document::new();
    let input = doc.parse_fragment(r#"<input type="checkbox">"#).unwrap()[0];
    synthesize(&doc, input, "click", Some(&json!({ "ignored": true }))).unwrap();
    assert!(doc.is_checked(input));
}
