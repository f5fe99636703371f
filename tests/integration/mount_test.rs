#[path = "../common/mod.rs"]
mod common;

use std::time::Duration;

use common::{app_module, init_tracing, Toggle};
use component_harness::binding::{BindingError, BindingScope, Compiler};
use component_harness::core::dom::Document;
use component_harness::harness::TemplateCompiler;
use component_harness::{
    mount, mount_until, mount_with, normalize_template, HarnessConfig, HarnessError, Wrapper,
};
use proptest::prelude::*;
use tokio::time::Instant;

fn compiler() -> Compiler {
    Compiler::new(Document::new(), app_module())
}

#[tokio::test]
async fn test_mount_by_tag_name() {
    init_tracing();
    let compiler = compiler();
    let scope = BindingScope::new_root();
    let wrapper: Wrapper<Toggle> = mount(&compiler, &scope, "toggle").await.unwrap();

    assert_eq!(compiler.document().tag_name(wrapper.root()).as_deref(), Some("toggle"));
    assert!(!wrapper.controller().read().value);
    // The initial digest has already rendered bindings.
    assert_eq!(wrapper.text("#changeCount").unwrap(), "0");
    assert!(wrapper.text("label").unwrap().contains("Toggle value: false"));
}

#[tokio::test]
async fn test_unregistered_component_is_reported() {
    init_tracing();
    let compiler = compiler();
    let err = mount::<Toggle, _>(&compiler, &BindingScope::new_root(), "fancy-toggle")
        .await
        .unwrap_err();
    match &err {
        HarnessError::ComponentNotFound { template } => {
            assert_eq!(template, "<fancy-toggle></fancy-toggle>")
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("mocked"));
    // The compiled element does not outlive the failed mount.
    assert_eq!(compiler.document().node_count(), 1);
}

#[tokio::test]
async fn test_controller_type_must_match() {
    let compiler = compiler();
    let scope = BindingScope::new_root();
    let result = mount::<String, _>(&compiler, &scope, "<toggle></toggle>").await;
    assert!(matches!(result, Err(HarnessError::ComponentNotFound { .. })));
    assert_eq!(compiler.document().node_count(), 1);
    assert_eq!(scope.watcher_count(), 0);
}

#[tokio::test]
async fn test_engine_errors_propagate_unchanged() {
    let compiler = compiler();
    let err = mount::<Toggle, _>(&compiler, &BindingScope::new_root(), "<!-- nothing -->")
        .await
        .unwrap_err();
    let HarnessError::Engine(inner) = err else {
        panic!("expected an engine error");
    };
    assert!(matches!(
        inner.downcast_ref::<BindingError>(),
        Some(BindingError::EmptyTemplate(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_resolves_once_truthy() {
    init_tracing();
    let compiler = compiler();
    let scope = BindingScope::new_root();
    let start = Instant::now();
    let wrapper = mount_with(
        &compiler,
        &scope,
        "toggle",
        &HarnessConfig::default(),
        Some(|_: Wrapper<Toggle>| async move { start.elapsed() >= Duration::from_millis(300) }),
    )
    .await
    .unwrap();

    let waited = start.elapsed();
    assert!(waited >= Duration::from_millis(300));
    assert!(waited < Duration::from_millis(400));
    assert_eq!(wrapper.text("#changeCount").unwrap(), "0");
}

#[tokio::test(start_paused = true)]
async fn test_mount_until_polls_the_mounted_wrapper() {
    init_tracing();
    let compiler = compiler();
    let scope = BindingScope::new_root();
    let start = Instant::now();
    let wrapper = mount_until(&compiler, &scope, "toggle", |w: Wrapper<Toggle>| async move {
        if start.elapsed() >= Duration::from_millis(100) {
            w.text("#changeCount").ok()
        } else {
            None
        }
    })
    .await
    .unwrap();

    assert!(start.elapsed() >= Duration::from_millis(100));
    assert!(start.elapsed() < Duration::from_millis(200));
    assert!(wrapper.text("label").unwrap().contains("Toggle value: false"));
}

#[tokio::test(start_paused = true)]
async fn test_mount_until_reports_unregistered_component_before_polling() {
    let compiler = compiler();
    let start = Instant::now();
    let err = mount_until(
        &compiler,
        &BindingScope::new_root(),
        "missing-toggle",
        |_: Wrapper<Toggle>| async { true },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, HarnessError::ComponentNotFound { .. }));
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_sees_the_wrapper() {
    let compiler = compiler();
    let scope = BindingScope::new_root();
    let mounted = mount_with(
        &compiler,
        &scope,
        "toggle",
        &HarnessConfig::default(),
        Some(|w: Wrapper<Toggle>| async move {
            w.query_one("input[type=checkbox]").is_ok_and(|found| found.is_some())
        }),
    )
    .await;
    tokio_test::assert_ok!(mounted);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_times_out() {
    init_tracing();
    let compiler = compiler();
    let scope = BindingScope::new_root();
    let start = Instant::now();
    let err = mount_with(
        &compiler,
        &scope,
        "toggle",
        &HarnessConfig::default(),
        Some(|_: Wrapper<Toggle>| async { serde_json::Value::Null }),
    )
    .await
    .unwrap_err();

    match err {
        HarnessError::WaitTimeout { budget, elapsed } => {
            assert_eq!(budget, Duration::from_secs(1));
            assert!(elapsed >= Duration::from_secs(1));
            assert!(elapsed <= Duration::from_millis(1050));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(start.elapsed() >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_wait_budget_is_configurable() {
    let compiler = compiler();
    let config = HarnessConfig {
        poll_interval_ms: 10,
        wait_timeout_ms: 100,
        ..HarnessConfig::default()
    };
    let start = Instant::now();
    let err = mount_with(
        &compiler,
        &BindingScope::new_root(),
        "toggle",
        &config,
        Some(|_: Wrapper<Toggle>| async { false }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, HarnessError::WaitTimeout { .. }));
    assert!(start.elapsed() < Duration::from_millis(150));
}

proptest! {
    #[test]
    fn test_bare_tags_expand_to_element_pairs(tag in "[a-z][a-z0-9-]{0,12}") {
        let once = normalize_template(&tag).into_owned();
        prop_assert_eq!(&once, &format!("<{0}></{0}>", tag));
        prop_assert_eq!(normalize_template(&once).into_owned(), once);
    }

    #[test]
    fn test_markup_passes_through(body in "[a-z ]{0,8}", tag in "[a-z]{1,6}") {
        let markup = format!("<{0}>{1}</{0}>", tag, body);
        prop_assert_eq!(normalize_template(&markup).into_owned(), markup);
    }
}
