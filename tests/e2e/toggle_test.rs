#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{app_module, init_tracing, Toggle};
use component_harness::binding::{BindingScope, Compiler};
use component_harness::harness::{synthesize, TestEnvironment};
use component_harness::{mount, Wrapper};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tokio::time::Instant;

#[tokio::test]
async fn test_clicking_checkbox_in_component_raises_change() {
    init_tracing();
    let env = TestEnvironment::new();
    let compiler = Compiler::new(env.document().clone(), app_module());
    let scope = BindingScope::new_root();
    let sut: Wrapper<Toggle> = mount(&compiler, &scope, "<toggle></toggle>").await.unwrap();
    env.attach(sut.root()).unwrap();
    assert!(!sut.is_checked("input[type=checkbox]").unwrap());

    sut.trigger("input[type=checkbox]", "click", None).unwrap();

    assert!(sut.is_checked("input[type=checkbox]").unwrap());
    assert_eq!(sut.text("#changeCount").unwrap().trim(), "1");
    let ctrl = sut.controller().read();
    assert!(ctrl.value);
    assert_eq!(ctrl.change_count, 1);
}

#[tokio::test]
async fn test_second_click_toggles_back() {
    let compiler = Compiler::new(component_harness::Document::new(), app_module());
    let sut: Wrapper<Toggle> = mount(&compiler, &BindingScope::new_root(), "toggle").await.unwrap();

    sut.trigger("input[type=checkbox]", "click", None).unwrap();
    sut.trigger("input[type=checkbox]", "click", None).unwrap();

    assert!(!sut.is_checked("#toggle").unwrap());
    assert_eq!(sut.text("#changeCount").unwrap(), "2");
    assert!(sut.text("label").unwrap().contains("Toggle value: false"));
}

#[tokio::test]
async fn test_clicking_the_label_toggles_its_control() {
    let compiler = Compiler::new(component_harness::Document::new(), app_module());
    let sut: Wrapper<Toggle> = mount(&compiler, &BindingScope::new_root(), "toggle").await.unwrap();

    sut.trigger("label", "click", None).unwrap();

    assert!(sut.controller().read().value);
    assert_eq!(sut.text("#changeCount").unwrap(), "1");
}

#[tokio::test]
async fn test_model_changes_reach_the_view_after_apply() {
    let compiler = Compiler::new(component_harness::Document::new(), app_module());
    let sut: Wrapper<Toggle> = mount(&compiler, &BindingScope::new_root(), "toggle").await.unwrap();

    sut.controller().write().value = true;
    sut.apply().unwrap();

    assert!(sut.is_checked("#toggle").unwrap());
    // Model-originated changes do not fire ng-change.
    assert_eq!(sut.text("#changeCount").unwrap(), "0");
}

#[tokio::test(start_paused = true)]
async fn test_settle_returns_after_one_interval_when_stable() {
    let compiler = Compiler::new(component_harness::Document::new(), app_module());
    let sut: Wrapper<Toggle> = mount(&compiler, &BindingScope::new_root(), "toggle").await.unwrap();
    sut.trigger("#toggle", "click", None).unwrap();

    let start = Instant::now();
    sut.settle().await.unwrap();
    assert_eq!(start.elapsed(), Duration::from_millis(50));
    assert_eq!(sut.text("#changeCount").unwrap(), "1");
}

#[test]
fn test_vanilla_dom_checkbox_raises_change() {
    init_tracing();
    let env = TestEnvironment::new();
    let doc = env.document();
    let chk = doc.create_element("input");
    doc.set_attribute(chk, "type", "checkbox").unwrap();
    let clicked = Arc::new(Mutex::new(false));
    let changed = Arc::new(Mutex::new(false));
    let (c, ch) = (clicked.clone(), changed.clone());
    doc.add_event_listener(chk, "click", false, move |_| *c.lock() = true)
        .unwrap();
    doc.add_event_listener(chk, "change", false, move |_| *ch.lock() = true)
        .unwrap();
    env.attach(chk).unwrap();

    synthesize(doc, chk, "click", None).unwrap();

    assert!(*clicked.lock());
    assert!(*changed.lock());
    env.teardown().unwrap();
    assert!(!doc.contains(chk));
}
