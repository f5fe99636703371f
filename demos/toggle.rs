//! Mounts a toggle component, clicks its checkbox and prints what changed.
//!
//! RUST_LOG=component_harness=debug cargo run --example toggle

use anyhow::Result;
use component_harness::binding::{
    BindingError, BindingScope, Compiler, ComponentDefinition, Controller, Module,
};
use component_harness::harness::TestEnvironment;
use component_harness::{mount_with, HarnessConfig, Wrapper};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

const TEMPLATE: &str = r#"
<div>
    <label for="toggle">
    <input id="toggle" type="checkbox"
           ng-model="$ctrl.value" ng-change="$ctrl.onChanged()"/>Toggle value: {{ $ctrl.value }}</label>
    <span id="changeCount">{{ $ctrl.changeCount }}</span>
</div>
"#;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Toggle {
    value: bool,
    change_count: u32,
}

impl Controller for Toggle {
    fn invoke(&mut self, method: &str, _args: &[Value]) -> Result<Value, BindingError> {
        match method {
            "onChanged" => {
                self.change_count += 1;
                Ok(Value::Null)
            }
            other => Err(BindingError::UnknownMethod(other.to_string())),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = HarnessConfig::from_env();
    let env = TestEnvironment::new();
    let module =
        Module::new("app").component("toggle", ComponentDefinition::new(TEMPLATE, Toggle::default));
    let compiler = Compiler::new(env.document().clone(), module);
    let scope = BindingScope::new_root();

    let sut: Wrapper<Toggle> = mount_with(
        &compiler,
        &scope,
        "toggle",
        &config,
        Some(|w: Wrapper<Toggle>| async move { w.query_one("#changeCount").is_ok_and(|n| n.is_some()) }),
    )
    .await?;
    env.attach(sut.root())?;
    info!(markup = %sut.outer_html(), "mounted");

    sut.trigger("input[type=checkbox]", "click", None)?;
    sut.settle().await?;

    info!(
        checked = sut.is_checked("input[type=checkbox]")?,
        change_count = %sut.text("#changeCount")?,
        "after click"
    );
    println!("{:?}", *sut.controller().read());
    Ok(())
}
