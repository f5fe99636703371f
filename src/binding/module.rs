use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::controller::{Controller, DynController};

type ControllerFactory = Arc<dyn Fn() -> Arc<dyn DynController> + Send + Sync>;

/// Template plus a way to build a fresh controller for each instance.
#[derive(Clone)]
pub struct ComponentDefinition {
    template: String,
    factory: ControllerFactory,
}

impl ComponentDefinition {
    pub fn new<C, F>(template: impl Into<String>, factory: F) -> Self
    where
        C: Controller,
        F: Fn() -> C + Send + Sync + 'static,
    {
        Self {
            template: template.into(),
            factory: Arc::new(move || Arc::new(RwLock::new(factory())) as Arc<dyn DynController>),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub(crate) fn instantiate(&self) -> Arc<dyn DynController> {
        (self.factory)()
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

/// Named registry of components.
#[derive(Clone, Debug, Default)]
pub struct Module {
    name: String,
    components: HashMap<String, ComponentDefinition>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers `name` (camelCase) as the element `kebab-case`.
    pub fn component(mut self, name: &str, definition: ComponentDefinition) -> Self {
        let tag = to_kebab_case(name);
        tracing::debug!(module = %self.name, %tag, "registered component");
        self.components.insert(tag, definition);
        self
    }

    pub fn lookup(&self, tag_name: &str) -> Option<&ComponentDefinition> {
        self.components.get(&tag_name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

pub fn to_kebab_case(name: &str) -> String {
    let mut tag = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                tag.push('-');
            }
            tag.push(c.to_ascii_lowercase());
        } else {
            tag.push(c);
        }
    }
    tag
}
