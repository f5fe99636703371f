use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::time::{sleep, Instant};

use super::engine::Scope;
use super::trigger::{self, NodeHandle, Triggerable};
use crate::core::dom::{Document, NodeId};
use crate::{HarnessConfig, HarnessError, Result};

/// Handle to a mounted component: its rendered root, its controller and the
/// scope that drives change detection.
pub struct Wrapper<C> {
    root: NodeId,
    document: Document,
    controller: Arc<RwLock<C>>,
    scope: Arc<dyn Scope>,
    config: HarnessConfig,
}

impl<C> Clone for Wrapper<C> {
    fn clone(&self) -> Self {
        Self {
            root: self.root,
            document: self.document.clone(),
            controller: self.controller.clone(),
            scope: self.scope.clone(),
            config: self.config.clone(),
        }
    }
}

impl<C> std::fmt::Debug for Wrapper<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wrapper")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C: Send + Sync + 'static> Wrapper<C> {
    pub(crate) fn new(
        root: NodeId,
        document: Document,
        controller: Arc<RwLock<C>>,
        scope: Arc<dyn Scope>,
        config: HarnessConfig,
    ) -> Self {
        Self {
            root,
            document,
            controller,
            scope,
            config,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The live controller instance, shared with the engine.
    pub fn controller(&self) -> &Arc<RwLock<C>> {
        &self.controller
    }

    pub fn scope(&self) -> &Arc<dyn Scope> {
        &self.scope
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn digest(&self) -> Result<()> {
        Ok(self.scope.digest()?)
    }

    pub fn apply(&self) -> Result<()> {
        Ok(self.scope.apply()?)
    }

    /// First descendant of the root matching `selector`.
    pub fn query_one(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.document.query_selector_within(self.root, selector)?)
    }

    pub fn query_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        Ok(self.document.query_selector_all_within(self.root, selector)?)
    }

    fn require(&self, selector: &str) -> Result<NodeId> {
        self.query_one(selector)?
            .ok_or_else(|| HarnessError::ElementNotFound(selector.to_string()))
    }

    /// Dispatches the event, then runs apply and digest so the DOM already
    /// reflects the reaction when this returns.
    pub fn trigger(
        &self,
        target: impl Into<Triggerable>,
        event_name: &str,
        data: Option<&Value>,
    ) -> Result<()> {
        let target = target.into();
        tracing::debug!(?target, event = event_name, "trigger");
        trigger::dispatch(&self.document, &target, event_name, data, |selector| {
            self.query_one(selector)
        })?;
        self.apply()?;
        self.digest()
    }

    /// Digests until two markup snapshots taken one settle interval apart
    /// are identical. Unbounded; see [`Wrapper::settle_within`].
    pub async fn settle(&self) -> Result<()> {
        let mut passes = 0u32;
        loop {
            passes += 1;
            self.digest()?;
            let snapshot = self.outer_html();
            sleep(self.config.settle_interval()).await;
            if snapshot == self.outer_html() {
                tracing::debug!(passes, "settled");
                return Ok(());
            }
        }
    }

    /// `settle` that gives up with `WaitTimeout` once `timeout` has passed.
    pub async fn settle_within(&self, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        match tokio::time::timeout(timeout, self.settle()).await {
            Ok(result) => result,
            Err(_) => Err(HarnessError::WaitTimeout {
                budget: timeout,
                elapsed: start.elapsed(),
            }),
        }
    }

    pub fn outer_html(&self) -> String {
        self.document.outer_html(self.root)
    }

    /// Text content of the first match.
    pub fn text(&self, selector: &str) -> Result<String> {
        let node = self.require(selector)?;
        Ok(self.document.text_content(node))
    }

    pub fn is_checked(&self, selector: &str) -> Result<bool> {
        let node = self.require(selector)?;
        Ok(self.document.is_checked(node))
    }
}

impl<C: Send + Sync + 'static> NodeHandle for Wrapper<C> {
    fn root_node(&self) -> Option<NodeId> {
        Some(self.root)
    }
}

impl<C> From<Wrapper<C>> for Triggerable {
    fn from(wrapper: Wrapper<C>) -> Self {
        Triggerable::WrapperWithNode(wrapper.root)
    }
}

impl<C> From<&Wrapper<C>> for Triggerable {
    fn from(wrapper: &Wrapper<C>) -> Self {
        Triggerable::WrapperWithNode(wrapper.root)
    }
}
