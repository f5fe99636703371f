use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;

use super::engine::{Scope, TemplateCompiler};
use super::poll::{Poller, Truthy};
use super::wrapper::Wrapper;
use crate::core::dom::NodeId;
use crate::{HarnessConfig, HarnessError, Result};

/// A bare tag name becomes an empty element pair; anything containing `<`
/// is taken as markup already.
pub fn normalize_template(tag_or_template: &str) -> Cow<'_, str> {
    if tag_or_template.contains('<') {
        Cow::Borrowed(tag_or_template)
    } else {
        Cow::Owned(format!("<{0}></{0}>", tag_or_template))
    }
}

fn discard<E: TemplateCompiler>(compiler: &E, root: NodeId) {
    if let Err(error) = compiler.document().remove_subtree(root) {
        tracing::warn!(%root, %error, "failed to remove unmounted tree");
    }
    compiler.release(root);
}

/// Compiles, digests and wraps a component without yielding.
pub fn mount_sync<C, E>(
    compiler: &E,
    scope: &E::Scope,
    tag_or_template: &str,
    config: &HarnessConfig,
) -> Result<Wrapper<C>>
where
    C: Send + Sync + 'static,
    E: TemplateCompiler,
{
    let template = normalize_template(tag_or_template);
    let root = compiler.compile(&template, scope)?;
    scope.digest()?;

    let controller = compiler
        .isolate_scope(root)
        .and_then(|isolate| isolate.controller())
        .and_then(|controller| controller.downcast::<RwLock<C>>().ok());
    let Some(controller) = controller else {
        tracing::warn!(template = %template, %root, "no controller attached to compiled root");
        discard(compiler, root);
        return Err(HarnessError::ComponentNotFound {
            template: template.into_owned(),
        });
    };

    let bound: Arc<dyn Scope> = Arc::new(scope.clone());
    let wrapper = Wrapper::new(
        root,
        compiler.document().clone(),
        controller,
        bound,
        config.clone(),
    );
    wrapper.digest()?;
    tracing::debug!(template = %template, %root, "mounted component");
    Ok(wrapper)
}

/// Mounts with timing taken from [`HarnessConfig::from_env`].
pub async fn mount<C, E>(compiler: &E, scope: &E::Scope, tag_or_template: &str) -> Result<Wrapper<C>>
where
    C: Send + Sync + 'static,
    E: TemplateCompiler,
{
    mount_sync(compiler, scope, tag_or_template, &HarnessConfig::from_env())
}

/// Mounts, then polls `wait_for` until it yields a truthy value.
pub async fn mount_until<C, E, F, Fut, T>(
    compiler: &E,
    scope: &E::Scope,
    tag_or_template: &str,
    wait_for: F,
) -> Result<Wrapper<C>>
where
    C: Send + Sync + 'static,
    E: TemplateCompiler,
    F: FnMut(Wrapper<C>) -> Fut,
    Fut: Future<Output = T>,
    T: Truthy,
{
    mount_with(
        compiler,
        scope,
        tag_or_template,
        &HarnessConfig::from_env(),
        Some(wait_for),
    )
    .await
}

pub async fn mount_with<C, E, F, Fut, T>(
    compiler: &E,
    scope: &E::Scope,
    tag_or_template: &str,
    config: &HarnessConfig,
    wait_for: Option<F>,
) -> Result<Wrapper<C>>
where
    C: Send + Sync + 'static,
    E: TemplateCompiler,
    F: FnMut(Wrapper<C>) -> Fut,
    Fut: Future<Output = T>,
    T: Truthy,
{
    let wrapper = mount_sync(compiler, scope, tag_or_template, config)?;
    if let Some(mut wait_for) = wait_for {
        Poller::from_config(config)
            .until(|| wait_for(wrapper.clone()))
            .await?;
    }
    Ok(wrapper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dom::{Document, NodeType};
    use crate::harness::engine::IsolateScope;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct CountingScope(Arc<AtomicUsize>);

    impl Scope for CountingScope {
        fn digest(&self) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn apply(&self) -> anyhow::Result<()> {
            self.digest()
        }
    }

    struct Counter(u32);

    struct Isolate(Arc<RwLock<Counter>>);

    impl IsolateScope for Isolate {
        fn controller(&self) -> Option<Arc<dyn Any + Send + Sync>> {
            Some(self.0.clone())
        }
    }

    /// Attaches a `Counter` to `<counter>` roots and nothing else.
    struct StubCompiler {
        document: Document,
        compiled: RwLock<Vec<String>>,
        released: RwLock<Vec<NodeId>>,
    }

    impl TemplateCompiler for StubCompiler {
        type Scope = CountingScope;

        fn document(&self) -> &Document {
            &self.document
        }

        fn compile(&self, template: &str, _scope: &CountingScope) -> anyhow::Result<NodeId> {
            self.compiled.write().push(template.to_string());
            let nodes = self.document.parse_fragment(template)?;
            nodes
                .into_iter()
                .find(|&id| self.document.node_type(id) == Some(NodeType::Element))
                .ok_or_else(|| anyhow::anyhow!("empty template"))
        }

        fn isolate_scope(&self, node: NodeId) -> Option<Arc<dyn IsolateScope>> {
            (self.document.tag_name(node).as_deref() == Some("counter"))
                .then(|| Arc::new(Isolate(Arc::new(RwLock::new(Counter(7))))) as Arc<dyn IsolateScope>)
        }

        fn release(&self, root: NodeId) {
            self.released.write().push(root);
        }
    }

    fn compiler() -> StubCompiler {
        StubCompiler {
            document: Document::new(),
            compiled: RwLock::new(Vec::new()),
            released: RwLock::new(Vec::new()),
        }
    }

    #[test]
    fn bare_tags_are_expanded() {
        assert_eq!(normalize_template("toggle"), "<toggle></toggle>");
        assert_eq!(normalize_template("<toggle value=1>"), "<toggle value=1>");
    }

    #[test]
    fn mount_digests_twice_and_exposes_controller() {
        let compiler = compiler();
        let scope = CountingScope::default();
        let wrapper: Wrapper<Counter> =
            mount_sync(&compiler, &scope, "counter", &HarnessConfig::default()).unwrap();
        assert_eq!(*compiler.compiled.read(), vec!["<counter></counter>".to_string()]);
        assert_eq!(scope.0.load(Ordering::SeqCst), 2);
        assert_eq!(wrapper.controller().read().0, 7);
    }

    #[test]
    fn missing_isolate_is_component_not_found() {
        let compiler = compiler();
        let err = mount_sync::<Counter, _>(&compiler, &CountingScope::default(), "<div></div>", &HarnessConfig::default())
            .unwrap_err();
        assert!(matches!(err, HarnessError::ComponentNotFound { template } if template == "<div></div>"));
    }

    #[test]
    fn failed_mount_discards_the_compiled_tree() {
        let compiler = compiler();
        let err = mount_sync::<Counter, _>(
            &compiler,
            &CountingScope::default(),
            "<div><span></span></div>",
            &HarnessConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, HarnessError::ComponentNotFound { .. }));
        let released = compiler.released.read().clone();
        assert_eq!(released.len(), 1);
        assert!(compiler.document.get_node(released[0]).is_none());
        // Only the document node is left.
        assert_eq!(compiler.document.node_count(), 1);
    }

    #[test]
    fn wrong_controller_type_is_component_not_found() {
        let compiler = compiler();
        let err = mount_sync::<String, _>(&compiler, &CountingScope::default(), "counter", &HarnessConfig::default())
            .unwrap_err();
        assert!(matches!(err, HarnessError::ComponentNotFound { .. }));
    }

    #[test]
    fn engine_errors_pass_through() {
        let compiler = compiler();
        let err = mount_sync::<Counter, _>(&compiler, &CountingScope::default(), "<!-- only -->", &HarnessConfig::default())
            .unwrap_err();
        match err {
            HarnessError::Engine(inner) => assert_eq!(inner.to_string(), "empty template"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
