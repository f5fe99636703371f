use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{BindingError, Result};

/// Component state reachable from templates as `$ctrl`.
///
/// Fields are read and written through the serde representation, so
/// templates see the names the serde attributes produce.
pub trait Controller: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Handles `$ctrl.method(args)` calls from templates.
    fn invoke(&mut self, method: &str, _args: &[Value]) -> Result<Value> {
        Err(BindingError::UnknownMethod(method.to_string()))
    }
}

/// Object-safe view of a `RwLock<C: Controller>`.
pub(crate) trait DynController: Send + Sync {
    fn read_path(&self, path: &[String]) -> Result<Value>;
    fn write_path(&self, path: &[String], value: Value) -> Result<()>;
    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value>;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<C: Controller> DynController for RwLock<C> {
    fn read_path(&self, path: &[String]) -> Result<Value> {
        let tree = serde_json::to_value(&*self.read())?;
        Ok(get_path(&tree, path).cloned().unwrap_or(Value::Null))
    }

    fn write_path(&self, path: &[String], value: Value) -> Result<()> {
        let mut guard = self.write();
        let mut tree = serde_json::to_value(&*guard)?;
        set_path(&mut tree, path, value)?;
        *guard = serde_json::from_value(tree)?;
        Ok(())
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value> {
        self.write().invoke(method, args)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub(crate) fn get_path<'v>(tree: &'v Value, path: &[String]) -> Option<&'v Value> {
    path.iter().try_fold(tree, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Sets `value` at `path`, creating intermediate objects for missing keys.
pub(crate) fn set_path(tree: &mut Value, path: &[String], value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        *tree = value;
        return Ok(());
    };
    let mut node = tree;
    for segment in parents {
        if node.is_null() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return Err(BindingError::NotAssignable(path.join("."))),
        };
    }
    if node.is_null() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        _ => Err(BindingError::NotAssignable(path.join("."))),
    }
}
