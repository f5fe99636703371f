//! Component test harness over a synthetic document.
//!
//! Mount a component through a template-compilation engine, drive synthetic
//! input events at it and assert on the resulting DOM and controller state:
//!
//! ```rust,ignore
//! let wrapper: Wrapper<Toggle> = mount(&compiler, &root_scope, "toggle").await?;
//! wrapper.trigger("input[type=checkbox]", "click", None)?;
//! assert_eq!(wrapper.text("#changeCount")?.trim(), "1");
//! ```
//!
//! Notes for callers:
//!  - Everything runs on one logical thread. `settle` and the `wait_for` poll
//!    are the only operations that yield; prefer a current-thread Tokio runtime.
//!  - The engine is a black box behind [`harness::TemplateCompiler`] and
//!    [`harness::Scope`]; [`binding`] ships a small reference engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod binding;
pub mod core;
pub mod harness;

pub use crate::core::dom::{Document, NodeId};
pub use crate::harness::{
    mount, mount_sync, mount_until, mount_with, normalize_template, Poller, Triggerable, Truthy,
    Wrapper,
};

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error(
        "Unable to retrieve the isolated scope for {template}: check that the component is \
         registered and that any backend it initialises from is mocked correctly"
    )]
    ComponentNotFound { template: String },
    #[error("No element matches selector '{0}'")]
    ElementNotFound(String),
    #[error("Trigger target exposes neither a node nor a trigger capability")]
    UntriggerableTarget,
    #[error("No event class is known for event '{0}'")]
    UnknownEventKind(String),
    #[error("Synthesizing '{0}' events is not supported; drive it through the engine's model instead")]
    UnsupportedEventKind(String),
    #[error("Node {0} cannot dispatch events")]
    NotDispatchable(NodeId),
    #[error("Predicate produced no truthy value within {budget:?} (waited {elapsed:?})")]
    WaitTimeout { budget: Duration, elapsed: Duration },
    #[error("Invalid init dictionary for '{event}': {reason}")]
    InvalidEventInit { event: String, reason: String },
    #[error("Document error: {0}")]
    Document(#[from] crate::core::dom::DocumentError),
    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, HarnessError>;

/// Timing knobs for settling and polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Sleep between markup snapshots in `Wrapper::settle`.
    pub settle_interval_ms: u64,
    /// Sleep between falsy `wait_for` probes.
    pub poll_interval_ms: u64,
    /// Wall-clock budget for `wait_for`, measured from the first probe.
    pub wait_timeout_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            settle_interval_ms: 50,
            poll_interval_ms: 50,
            wait_timeout_ms: 1000,
        }
    }
}

fn env_var_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    parse_or(key, std::env::var(key).ok(), default)
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, raw = %raw, "ignoring unparsable harness setting");
                default
            }
        },
        None => default,
    }
}

impl HarnessConfig {
    /// Defaults overridden by `HARNESS_SETTLE_INTERVAL_MS`,
    /// `HARNESS_POLL_INTERVAL_MS` and `HARNESS_WAIT_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            settle_interval_ms: env_var_or("HARNESS_SETTLE_INTERVAL_MS", defaults.settle_interval_ms),
            poll_interval_ms: env_var_or("HARNESS_POLL_INTERVAL_MS", defaults.poll_interval_ms),
            wait_timeout_ms: env_var_or("HARNESS_WAIT_TIMEOUT_MS", defaults.wait_timeout_ms),
        }
    }

    pub fn from_json(raw: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}
