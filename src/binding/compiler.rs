//! Template compilation and directive linking.
//!
//! Supported directives:
//!  - `{{ expr }}` in text and attribute values
//!  - registered component tags, expanded with their own template under an
//!    isolate scope holding a fresh controller
//!  - `ng-model` on checkbox, radio and text inputs, with `ng-change`
//!  - `ng-click`

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use super::expr::{parse_interpolation, render, Expr, Part};
use super::module::{ComponentDefinition, Module};
use super::scope::BindingScope;
use super::{BindingError, Result};
use crate::core::dom::{Document, NodeId, NodeType};
use crate::harness::{IsolateScope, TemplateCompiler, Truthy};

pub struct Compiler {
    document: Document,
    module: Module,
    isolates: DashMap<NodeId, BindingScope>,
}

fn interpolate(scope: &BindingScope, parts: &[Part]) -> Result<Value> {
    let mut out = String::new();
    for part in parts {
        match part {
            Part::Text(text) => out.push_str(text),
            Part::Expr(expr) => out.push_str(&render(&scope.eval(expr)?)),
        }
    }
    Ok(Value::String(out))
}

impl Compiler {
    pub fn new(document: Document, module: Module) -> Self {
        Self {
            document,
            module,
            isolates: DashMap::new(),
        }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    /// The isolate scope created for a component element.
    pub fn isolate(&self, node: NodeId) -> Option<BindingScope> {
        self.isolates.get(&node).map(|entry| entry.value().clone())
    }

    /// Destroys isolate scopes whose component element has left the
    /// document. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        let stale: Vec<NodeId> = self
            .isolates
            .iter()
            .map(|entry| *entry.key())
            .filter(|&node| !self.document.contains(node))
            .collect();
        for node in &stale {
            if let Some((_, scope)) = self.isolates.remove(node) {
                scope.destroy();
            }
        }
        if !stale.is_empty() {
            tracing::debug!(dropped = stale.len(), "pruned isolate scopes");
        }
        stale.len()
    }

    /// Parses `template`, links every top-level node against `scope` and
    /// returns the first element.
    pub fn compile_template(&self, template: &str, scope: &BindingScope) -> Result<NodeId> {
        self.prune();
        let nodes = self.document.parse_fragment(template)?;
        let root = nodes
            .iter()
            .copied()
            .find(|&id| self.document.node_type(id) == Some(NodeType::Element))
            .ok_or_else(|| BindingError::EmptyTemplate(template.to_string()))?;
        for node in nodes {
            self.link(node, scope)?;
        }
        tracing::debug!(%root, scope = scope.id(), "compiled template");
        Ok(root)
    }

    fn link(&self, node: NodeId, scope: &BindingScope) -> Result<()> {
        match self.document.node_type(node) {
            Some(NodeType::Text) => self.link_text(node, scope),
            Some(NodeType::Element) => self.link_element(node, scope),
            _ => Ok(()),
        }
    }

    fn link_text(&self, node: NodeId, scope: &BindingScope) -> Result<()> {
        let Some(parts) = parse_interpolation(&self.document.text_content(node))? else {
            return Ok(());
        };
        let document = self.document.clone();
        scope.watch_with(
            move |scope| interpolate(scope, &parts),
            move |value, _| Ok(document.set_text_content(node, &render(value))?),
        );
        Ok(())
    }

    fn link_element(&self, node: NodeId, scope: &BindingScope) -> Result<()> {
        let Some(element) = self.document.get_node(node) else {
            return Ok(());
        };
        let (tag, attributes) = {
            let element = element.read();
            let attributes: Vec<(String, String)> = element
                .attributes
                .entries()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            (element.tag_name.clone(), attributes)
        };

        if let Some(definition) = self.module.lookup(&tag) {
            return self.expand_component(node, &tag, definition, scope);
        }

        let attribute = |wanted: &str| {
            attributes
                .iter()
                .find(|(name, _)| name == wanted)
                .map(|(_, value)| value.as_str())
        };
        let change = attribute("ng-change").map(Expr::parse).transpose()?;

        for (name, value) in &attributes {
            match name.as_str() {
                "ng-model" => self.bind_model(node, scope, Expr::parse(value)?, change.clone())?,
                "ng-click" => self.bind_event(node, scope, "click", Expr::parse(value)?)?,
                "ng-change" => {
                    if attribute("ng-model").is_none() {
                        tracing::warn!(%node, "ng-change without ng-model is ignored");
                    }
                }
                _ => {
                    if let Some(parts) = parse_interpolation(value)? {
                        self.bind_attribute(node, scope, name.clone(), parts);
                    }
                }
            }
        }

        for child in self.document.get_children(node) {
            self.link(child, scope)?;
        }
        Ok(())
    }

    fn expand_component(
        &self,
        node: NodeId,
        tag: &str,
        definition: &ComponentDefinition,
        scope: &BindingScope,
    ) -> Result<()> {
        for child in self.document.get_children(node) {
            self.document.remove_subtree(child)?;
        }
        let isolate = scope.new_isolate_dyn(Some(definition.instantiate()));
        for child in self.document.parse_fragment(definition.template())? {
            self.document.append_child(node, child)?;
        }
        self.isolates.insert(node, isolate.clone());
        for child in self.document.get_children(node) {
            self.link(child, &isolate)?;
        }
        tracing::debug!(%node, tag, scope = isolate.id(), "expanded component");
        Ok(())
    }

    fn bind_attribute(&self, node: NodeId, scope: &BindingScope, name: String, parts: Vec<Part>) {
        let document = self.document.clone();
        scope.watch_with(
            move |scope| interpolate(scope, &parts),
            move |value, _| Ok(document.set_attribute(node, &name, &render(value))?),
        );
    }

    fn bind_model(
        &self,
        node: NodeId,
        scope: &BindingScope,
        model: Expr,
        change: Option<Expr>,
    ) -> Result<()> {
        if !model.is_assignable() {
            return Err(BindingError::NotAssignable(model.to_string()));
        }
        let input_type = self
            .document
            .get_node(node)
            .and_then(|element| element.read().input_type());
        let getter = {
            let model = model.clone();
            move |scope: &BindingScope| scope.eval(&model)
        };
        let document = self.document.clone();

        match input_type.as_deref() {
            Some("checkbox") => {
                scope.watch_with(getter, move |value, _| {
                    Ok(document.set_checked(node, value.is_truthy())?)
                });
                self.bind_view(node, scope, "change", model, change, move |document| {
                    Some(Value::Bool(document.is_checked(node)))
                })
            }
            Some("radio") => {
                let own = self
                    .document
                    .get_attribute(node, "value")
                    .unwrap_or_else(|| "on".to_string());
                let own_value = Value::String(own);
                let watched = own_value.clone();
                scope.watch_with(getter, move |value, _| {
                    Ok(document.set_checked(node, *value == watched)?)
                });
                self.bind_view(node, scope, "change", model, change, move |document| {
                    document.is_checked(node).then(|| own_value.clone())
                })
            }
            _ => {
                scope.watch_with(getter, move |value, _| {
                    Ok(document.set_attribute(node, "value", &render(value))?)
                });
                self.bind_view(node, scope, "input", model, change, move |document| {
                    Some(Value::String(
                        document.get_attribute(node, "value").unwrap_or_default(),
                    ))
                })
            }
        }
    }

    /// View to model: on `event`, read the view value and, when it differs
    /// from the model, assign it and evaluate `change`, inside an apply.
    fn bind_view<R>(
        &self,
        node: NodeId,
        scope: &BindingScope,
        event: &str,
        model: Expr,
        change: Option<Expr>,
        read_view: R,
    ) -> Result<()>
    where
        R: Fn(&Document) -> Option<Value> + Send + Sync + 'static,
    {
        let weak = scope.downgrade();
        let document = self.document.clone();
        self.document.add_event_listener(node, event, false, move |_| {
            let (Some(scope), Some(view_value)) = (weak.upgrade(), read_view(&document)) else {
                return;
            };
            let outcome = scope.apply_with(|scope| {
                if scope.eval(&model)? == view_value {
                    return Ok(());
                }
                scope.assign(&model, view_value.clone())?;
                if let Some(change) = &change {
                    scope.eval(change)?;
                }
                Ok(())
            });
            if let Err(error) = outcome {
                scope.report(error);
            }
        })?;
        Ok(())
    }

    fn bind_event(&self, node: NodeId, scope: &BindingScope, event: &str, expr: Expr) -> Result<()> {
        let weak = scope.downgrade();
        self.document.add_event_listener(node, event, false, move |_| {
            let Some(scope) = weak.upgrade() else {
                return;
            };
            if let Err(error) = scope.apply_with(|scope| scope.eval(&expr).map(drop)) {
                scope.report(error);
            }
        })?;
        Ok(())
    }
}

impl TemplateCompiler for Compiler {
    type Scope = BindingScope;

    fn document(&self) -> &Document {
        &self.document
    }

    fn compile(&self, template: &str, scope: &BindingScope) -> anyhow::Result<NodeId> {
        Ok(self.compile_template(template, scope)?)
    }

    fn isolate_scope(&self, node: NodeId) -> Option<Arc<dyn IsolateScope>> {
        self.isolate(node)
            .map(|scope| Arc::new(scope) as Arc<dyn IsolateScope>)
    }

    fn release(&self, _root: NodeId) {
        self.prune();
    }
}
