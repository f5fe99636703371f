#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use common::{app_module, init_tracing, Toggle};
use component_harness::binding::{BindingScope, Compiler};
use component_harness::core::dom::Document;
use component_harness::harness::SelfTrigger;
use component_harness::{mount, HarnessError, Triggerable, Wrapper};
use parking_lot::Mutex;
use serde_json::{json, Value};

async fn mounted() -> Wrapper<Toggle> {
    init_tracing();
    let compiler = Compiler::new(Document::new(), app_module());
    mount(&compiler, &BindingScope::new_root(), "toggle").await.unwrap()
}

#[tokio::test]
async fn test_focus_is_unsupported() {
    let wrapper = mounted().await;
    let err = wrapper.trigger("input[type=checkbox]", "focus", None).unwrap_err();
    assert!(matches!(err, HarnessError::UnsupportedEventKind(name) if name == "focus"));
}

#[tokio::test]
async fn test_bogus_event_is_unknown() {
    let wrapper = mounted().await;
    let err = wrapper.trigger("input[type=checkbox]", "bogus", None).unwrap_err();
    assert!(matches!(err, HarnessError::UnknownEventKind(name) if name == "bogus"));
}

#[tokio::test]
async fn test_selector_without_match() {
    let wrapper = mounted().await;
    let err = wrapper.trigger("textarea", "click", None).unwrap_err();
    assert!(matches!(err, HarnessError::ElementNotFound(selector) if selector == "textarea"));
    assert_eq!(wrapper.controller().read().change_count, 0);
}

#[tokio::test]
async fn test_native_node_target() {
    let wrapper = mounted().await;
    let checkbox = wrapper.query_one("#toggle").unwrap().unwrap();
    wrapper.trigger(checkbox, "click", None).unwrap();
    assert!(wrapper.controller().read().value);
}

#[tokio::test]
async fn test_wrapper_target_dispatches_on_its_root() {
    let wrapper = mounted().await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    wrapper
        .document()
        .add_event_listener(wrapper.root(), "keydown", false, move |e| {
            if let Some(init) = e.as_keyboard() {
                sink.lock().push(init.key.clone());
            }
        })
        .unwrap();

    wrapper
        .trigger(wrapper.clone(), "keydown", Some(&json!({ "key": "Enter" })))
        .unwrap();
    assert_eq!(*seen.lock(), vec!["Enter".to_string()]);
}

struct Recorder(Mutex<Vec<(String, Value)>>);

impl SelfTrigger for Recorder {
    fn trigger(&self, event_name: &str, data: Option<&Value>) -> component_harness::Result<()> {
        self.0
            .lock()
            .push((event_name.to_string(), data.cloned().unwrap_or(Value::Null)));
        Ok(())
    }
}

#[tokio::test]
async fn test_self_triggering_target_receives_any_event() {
    let wrapper = mounted().await;
    let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
    wrapper
        .trigger(
            Triggerable::SelfTriggering(recorder.clone()),
            "change",
            Some(&json!({ "value": 1 })),
        )
        .unwrap();
    assert_eq!(
        *recorder.0.lock(),
        vec![("change".to_string(), json!({ "value": 1 }))]
    );
}
