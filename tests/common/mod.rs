#![allow(dead_code)]

use std::sync::Once;

use component_harness::binding::{BindingError, ComponentDefinition, Controller, Module};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TOGGLE_TEMPLATE: &str = r#"
<div>
    <label for="toggle">
    <input id="toggle"
           ng-change="$ctrl.onChanged()"
           type="checkbox"
           ng-model="$ctrl.value"
    />Toggle value: {{ $ctrl.value }}</label>
    <span id="changeCount">{{ $ctrl.changeCount }}</span>
</div>
"#;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Toggle {
    pub value: bool,
    pub change_count: u32,
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

pub fn app_module() -> Module {
    Module::new("app").component("toggle", ComponentDefinition::new(TOGGLE_TEMPLATE, Toggle::default))
}

static TRACING: Once = Once::new();

/// Installs a `RUST_LOG`-aware subscriber that writes through the test harness.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}
