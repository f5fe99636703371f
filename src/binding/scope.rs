use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};

use super::controller::{get_path, set_path, Controller, DynController};
use super::expr::Expr;
use super::{BindingError, Result};
use crate::harness::{IsolateScope, Scope, Truthy};

/// Dirty-checking passes allowed before a digest is declared unstable.
pub const DIGEST_TTL: usize = 10;

type Getter = Box<dyn Fn(&BindingScope) -> Result<Value> + Send + Sync>;
type Listener = Box<dyn Fn(&Value, Option<&Value>) -> Result<()> + Send + Sync>;

struct Watcher {
    getter: Getter,
    listener: Listener,
    last: Option<Value>,
}

/// State shared by every scope in one hierarchy.
#[derive(Default)]
struct Shared {
    digesting: AtomicBool,
    pending: Mutex<Vec<BindingError>>,
}

struct ScopeInner {
    id: u64,
    parent: Option<Weak<ScopeInner>>,
    isolate: bool,
    locals: RwLock<Map<String, Value>>,
    controller: Option<Arc<dyn DynController>>,
    watchers: RwLock<Vec<Watcher>>,
    children: RwLock<Vec<BindingScope>>,
    shared: Arc<Shared>,
}

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// A node in the scope hierarchy. Clones share state.
///
/// Parents own their children; children hold a weak link back. Isolate
/// scopes stop local lookups at their boundary and may carry a controller
/// reachable as `$ctrl`.
#[derive(Clone)]
pub struct BindingScope {
    inner: Arc<ScopeInner>,
}

/// Non-owning handle for event listeners held by the document.
#[derive(Clone)]
pub struct WeakBindingScope(Weak<ScopeInner>);

impl WeakBindingScope {
    pub fn upgrade(&self) -> Option<BindingScope> {
        self.0.upgrade().map(|inner| BindingScope { inner })
    }
}

impl BindingScope {
    pub fn new_root() -> Self {
        Self::build(None, false, None, Arc::new(Shared::default()))
    }

    fn build(
        parent: Option<&BindingScope>,
        isolate: bool,
        controller: Option<Arc<dyn DynController>>,
        shared: Arc<Shared>,
    ) -> Self {
        let scope = Self {
            inner: Arc::new(ScopeInner {
                id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
                parent: parent.map(|p| Arc::downgrade(&p.inner)),
                isolate,
                locals: RwLock::new(Map::new()),
                controller,
                watchers: RwLock::new(Vec::new()),
                children: RwLock::new(Vec::new()),
                shared,
            }),
        };
        if let Some(parent) = parent {
            parent.inner.children.write().push(scope.clone());
        }
        scope
    }

    pub fn new_child(&self) -> Self {
        Self::build(Some(self), false, None, self.inner.shared.clone())
    }

    /// Isolate child holding `controller` as `$ctrl`.
    pub fn new_isolate<C: Controller>(&self, controller: Arc<RwLock<C>>) -> Self {
        self.new_isolate_dyn(Some(controller as Arc<dyn DynController>))
    }

    pub(crate) fn new_isolate_dyn(&self, controller: Option<Arc<dyn DynController>>) -> Self {
        Self::build(Some(self), true, controller, self.inner.shared.clone())
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn is_isolate(&self) -> bool {
        self.inner.isolate
    }

    pub fn downgrade(&self) -> WeakBindingScope {
        WeakBindingScope(Arc::downgrade(&self.inner))
    }

    pub fn parent(&self) -> Option<BindingScope> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| BindingScope { inner })
    }

    pub fn root(&self) -> BindingScope {
        let mut scope = self.clone();
        while let Some(parent) = scope.parent() {
            scope = parent;
        }
        scope
    }

    fn children(&self) -> Vec<BindingScope> {
        self.inner.children.read().clone()
    }

    /// Removes this scope (and its watchers) from its parent.
    pub fn destroy(&self) {
        if let Some(parent) = self.parent() {
            parent
                .inner
                .children
                .write()
                .retain(|child| !Arc::ptr_eq(&child.inner, &self.inner));
        }
        self.inner.watchers.write().clear();
    }

    pub fn set(&self, name: &str, value: Value) {
        self.inner.locals.write().insert(name.to_string(), value);
    }

    /// Local lookup through parents, stopping at an isolate boundary.
    pub fn get(&self, name: &str) -> Value {
        self.find_local_owner(name)
            .and_then(|owner| owner.inner.locals.read().get(name).cloned())
            .unwrap_or(Value::Null)
    }

    fn find_local_owner(&self, name: &str) -> Option<BindingScope> {
        let mut scope = Some(self.clone());
        while let Some(current) = scope {
            if current.inner.locals.read().contains_key(name) {
                return Some(current);
            }
            if current.inner.isolate {
                return None;
            }
            scope = current.parent();
        }
        None
    }

    fn resolve_controller(&self, expression: &str) -> Result<Arc<dyn DynController>> {
        let mut scope = Some(self.clone());
        while let Some(current) = scope {
            if let Some(controller) = &current.inner.controller {
                return Ok(controller.clone());
            }
            if current.inner.isolate {
                break;
            }
            scope = current.parent();
        }
        Err(BindingError::NoController(expression.to_string()))
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Path { root, segments } if root == "$ctrl" => {
                self.resolve_controller(&expr.to_string())?.read_path(segments)
            }
            Expr::Path { root, segments } => {
                let local = self.get(root);
                Ok(get_path(&local, segments).cloned().unwrap_or(Value::Null))
            }
            Expr::Not(inner) => Ok(Value::Bool(!self.eval(inner)?.is_truthy())),
            Expr::Call { path, args } => {
                let (receiver, method) = match path.split_first() {
                    Some((receiver, method)) if receiver == "$ctrl" && !method.is_empty() => {
                        (receiver, method.join("."))
                    }
                    _ => return Err(BindingError::UnknownMethod(path.join("."))),
                };
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>>>()?;
                tracing::trace!(receiver = %receiver, method = %method, "invoking controller method");
                self.resolve_controller(&expr.to_string())?.invoke(&method, &args)
            }
        }
    }

    pub fn eval_str(&self, source: &str) -> Result<Value> {
        self.eval(&Expr::parse(source)?)
    }

    pub fn assign(&self, expr: &Expr, value: Value) -> Result<()> {
        match expr {
            Expr::Path { root, segments } if root == "$ctrl" => {
                if segments.is_empty() {
                    return Err(BindingError::NotAssignable(expr.to_string()));
                }
                self.resolve_controller(&expr.to_string())?.write_path(segments, value)
            }
            Expr::Path { root, segments } => {
                let owner = self.find_local_owner(root).unwrap_or_else(|| self.clone());
                let mut locals = owner.inner.locals.write();
                let slot = locals.entry(root.clone()).or_insert(Value::Null);
                set_path(slot, segments, value)
            }
            _ => Err(BindingError::NotAssignable(expr.to_string())),
        }
    }

    /// Registers a watcher. `listener` runs on the first digest and whenever
    /// the getter's value changes afterwards.
    pub fn watch_with<G, L>(&self, getter: G, listener: L)
    where
        G: Fn(&BindingScope) -> Result<Value> + Send + Sync + 'static,
        L: Fn(&Value, Option<&Value>) -> Result<()> + Send + Sync + 'static,
    {
        self.inner.watchers.write().push(Watcher {
            getter: Box::new(getter),
            listener: Box::new(listener),
            last: None,
        });
    }

    pub fn watch<L>(&self, source: &str, listener: L) -> Result<()>
    where
        L: Fn(&Value, Option<&Value>) -> Result<()> + Send + Sync + 'static,
    {
        let expr = Expr::parse(source)?;
        self.watch_with(move |scope| scope.eval(&expr), listener);
        Ok(())
    }

    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.read().len()
            + self.children().iter().map(BindingScope::watcher_count).sum::<usize>()
    }

    /// Queues an error raised outside a digest, e.g. in an event listener.
    /// The next digest on this hierarchy returns it.
    pub fn report(&self, error: BindingError) {
        tracing::warn!(scope = self.inner.id, %error, "binding error queued");
        let mut pending = self.inner.shared.pending.lock();
        match error {
            BindingError::Listeners(errors) => pending.extend(errors),
            error => pending.push(error),
        }
    }

    /// Dirty-checks this scope and its descendants until nothing changes.
    pub fn digest(&self) -> Result<()> {
        if self.inner.shared.digesting.swap(true, Ordering::SeqCst) {
            return Err(BindingError::DigestInProgress);
        }
        let result = self.digest_until_clean();
        self.inner.shared.digesting.store(false, Ordering::SeqCst);
        result?;
        self.take_pending()
    }

    fn digest_until_clean(&self) -> Result<()> {
        for pass in 1..=DIGEST_TTL {
            if !self.digest_once()? {
                tracing::trace!(scope = self.inner.id, passes = pass, "digest clean");
                return Ok(());
            }
        }
        Err(BindingError::DigestOverflow(DIGEST_TTL))
    }

    fn digest_once(&self) -> Result<bool> {
        let mut watchers = std::mem::take(&mut *self.inner.watchers.write());
        let mut dirty = false;
        let mut failure = None;
        for watcher in watchers.iter_mut() {
            let value = match (watcher.getter)(self) {
                Ok(value) => value,
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            };
            if watcher.last.as_ref() == Some(&value) {
                continue;
            }
            dirty = true;
            let previous = watcher.last.replace(value.clone());
            if let Err(error) = (watcher.listener)(&value, previous.as_ref()) {
                failure = Some(error);
                break;
            }
        }
        {
            let mut slot = self.inner.watchers.write();
            let added = std::mem::take(&mut *slot);
            *slot = watchers;
            slot.extend(added);
        }
        if let Some(error) = failure {
            return Err(error);
        }
        for child in self.children() {
            dirty |= child.digest_once()?;
        }
        Ok(dirty)
    }

    /// Drains the queue. Several queued errors come back as one
    /// `Listeners` error in the order they were reported.
    fn take_pending(&self) -> Result<()> {
        let mut pending = std::mem::take(&mut *self.inner.shared.pending.lock());
        match pending.len() {
            0 => Ok(()),
            1 => Err(pending.remove(0)),
            _ => Err(BindingError::Listeners(pending)),
        }
    }

    /// Digest from the root.
    pub fn apply(&self) -> Result<()> {
        self.root().digest()
    }

    /// Runs `f` against this scope, then digests from the root. An error
    /// from `f` wins over one from the digest; the digest's error is queued
    /// again for the next digest.
    pub fn apply_with<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&BindingScope) -> Result<T>,
    {
        let result = f(self);
        let digested = self.apply();
        match (result, digested) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(error)) | (Err(error), Ok(())) => Err(error),
            (Err(error), Err(BindingError::DigestInProgress)) => Err(error),
            (Err(error), Err(digest_error)) => {
                self.report(digest_error);
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingScope")
            .field("id", &self.inner.id)
            .field("isolate", &self.inner.isolate)
            .field("has_controller", &self.inner.controller.is_some())
            .finish()
    }
}

impl Scope for BindingScope {
    fn digest(&self) -> anyhow::Result<()> {
        Ok(BindingScope::digest(self)?)
    }

    fn apply(&self) -> anyhow::Result<()> {
        Ok(BindingScope::apply(self)?)
    }
}

impl IsolateScope for BindingScope {
    fn controller(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.inner.controller.clone().map(|controller| controller.into_any())
    }
}
