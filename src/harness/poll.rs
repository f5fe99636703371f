//! Deadline-bounded polling of a predicate.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::{HarnessConfig, HarnessError, Result};

/// Values a `wait_for` predicate may produce, judged the way a script
/// engine judges truthiness.
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl Truthy for usize {
    fn is_truthy(&self) -> bool {
        *self != 0
    }
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for &str {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> Truthy for Vec<T> {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Truthy> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.as_ref().is_some_and(Truthy::is_truthy)
    }
}

impl<T: Truthy, E> Truthy for std::result::Result<T, E> {
    fn is_truthy(&self) -> bool {
        self.as_ref().is_ok_and(Truthy::is_truthy)
    }
}

impl Truthy for serde_json::Value {
    fn is_truthy(&self) -> bool {
        use serde_json::Value;
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Value::String(s) => !s.is_empty(),
            // Arrays and objects are truthy even when empty.
            Value::Array(_) | Value::Object(_) => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    pub interval: Duration,
    pub deadline: Duration,
}

impl Poller {
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.poll_interval(), config.wait_timeout())
    }

    /// Probes immediately, then every `interval`, until the probe yields a
    /// truthy value. Fails with `WaitTimeout` once `deadline` has elapsed
    /// since the first probe without one.
    pub async fn until<F, Fut, T>(&self, mut probe: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = T>,
        T: Truthy,
    {
        let start = Instant::now();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let value = probe().await;
            if value.is_truthy() {
                tracing::debug!(attempts, elapsed = ?start.elapsed(), "wait_for satisfied");
                return Ok(value);
            }
            let elapsed = start.elapsed();
            if elapsed >= self.deadline {
                tracing::warn!(attempts, ?elapsed, "wait_for timed out");
                return Err(HarnessError::WaitTimeout {
                    budget: self.deadline,
                    elapsed,
                });
            }
            tracing::trace!(attempts, ?elapsed, "wait_for falsy, sleeping");
            sleep(self.interval).await;
        }
    }
}
