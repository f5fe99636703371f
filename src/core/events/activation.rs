//! Activation behavior run around `click` dispatch: checkbox and radio
//! toggling, and labels forwarding clicks to their control.

use super::{Event, MouseEventInit};
use crate::core::dom::{Document, NodeId};

const LABELABLE: &[&str] = &["input", "button", "select", "textarea"];

pub(super) enum ActivationState {
    Checkbox { input: NodeId, previous: bool },
    Radio { input: NodeId, previous: Vec<(NodeId, bool)> },
    Label { control: NodeId, init: MouseEventInit },
}

fn top_ancestor(document: &Document, mut node_id: NodeId) -> NodeId {
    while let Some(parent) = document.get_parent(node_id) {
        node_id = parent;
    }
    node_id
}

fn radio_group(document: &Document, input: NodeId) -> Vec<NodeId> {
    let Some(name) = document.get_attribute(input, "name").filter(|n| !n.is_empty()) else {
        return vec![input];
    };
    let root = top_ancestor(document, input);
    document
        .descendants(root)
        .into_iter()
        .filter(|&id| {
            document.get_node(id).is_some_and(|node| {
                let node = node.read();
                node.input_type().as_deref() == Some("radio")
                    && node.get_attribute("name").as_deref() == Some(name.as_str())
            })
        })
        .collect()
}

fn labeled_control(document: &Document, label: NodeId) -> Option<NodeId> {
    if let Some(for_id) = document.get_attribute(label, "for") {
        let root = top_ancestor(document, label);
        return document.descendants(root).into_iter().find(|&id| {
            document.get_attribute(id, "id").as_deref() == Some(for_id.as_str())
                && is_labelable(document, id)
        });
    }
    document
        .descendants(label)
        .into_iter()
        .find(|&id| is_labelable(document, id))
}

fn is_labelable(document: &Document, node_id: NodeId) -> bool {
    document
        .tag_name(node_id)
        .is_some_and(|tag| LABELABLE.contains(&tag.as_str()))
}

pub(super) fn pre_activate(
    document: &Document,
    target: NodeId,
    event: &Event,
) -> Option<ActivationState> {
    if event.event_type != "click" {
        return None;
    }
    let node = document.get_node(target)?.read().clone();
    if node.is_disabled() {
        return None;
    }
    match node.input_type().as_deref() {
        Some("checkbox") => {
            let previous = node.is_checked();
            document.set_checked(target, !previous).ok()?;
            Some(ActivationState::Checkbox {
                input: target,
                previous,
            })
        }
        Some("radio") => {
            let previous: Vec<(NodeId, bool)> = radio_group(document, target)
                .into_iter()
                .map(|id| (id, document.is_checked(id)))
                .collect();
            for &(id, _) in &previous {
                document.set_checked(id, id == target).ok()?;
            }
            Some(ActivationState::Radio {
                input: target,
                previous,
            })
        }
        _ if LABELABLE.contains(&node.tag_name.as_str()) => None,
        _ => {
            let mut cursor = Some(target);
            while let Some(id) = cursor {
                if document.tag_name(id).as_deref() == Some("label") {
                    let control = labeled_control(document, id)?;
                    let init = event.as_mouse().cloned().unwrap_or_default();
                    return Some(ActivationState::Label { control, init });
                }
                cursor = document.get_parent(id);
            }
            None
        }
    }
}

fn fire_input_and_change(document: &Document, input: NodeId) {
    for event_type in ["input", "change"] {
        let mut event = Event::basic(event_type, true, false);
        if let Err(error) = document.dispatch_event(input, &mut event) {
            tracing::warn!(%input, %error, "failed to fire {} after activation", event_type);
        }
    }
}

fn restore_checked(document: &Document, input: NodeId, checked: bool) {
    if let Err(error) = document.set_checked(input, checked) {
        tracing::warn!(%input, %error, "failed to restore checked state");
    }
}

pub(super) fn post_activate(document: &Document, state: ActivationState, event: &Event) {
    let cancelled = event.default_prevented();
    match state {
        ActivationState::Checkbox { input, previous } => {
            if cancelled {
                restore_checked(document, input, previous);
            } else {
                fire_input_and_change(document, input);
            }
        }
        ActivationState::Radio { input, previous } => {
            if cancelled {
                for (id, checked) in previous {
                    restore_checked(document, id, checked);
                }
            } else if previous.iter().any(|&(id, checked)| id == input && !checked) {
                fire_input_and_change(document, input);
            }
        }
        ActivationState::Label { control, init } => {
            if !cancelled {
                let mut click = Event::mouse("click", init);
                if let Err(error) = document.dispatch_event(control, &mut click) {
                    tracing::warn!(%control, %error, "label failed to forward click");
                }
            }
        }
    }
}
