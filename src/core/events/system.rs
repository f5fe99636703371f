use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::activation;
use super::{Event, EventPhase};
use crate::core::dom::{Document, NodeId};

pub type EventCallback = Arc<dyn Fn(&mut Event) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Clone)]
struct RegisteredListener {
    id: ListenerId,
    event_type: String,
    capture: bool,
    callback: EventCallback,
}

/// Per-document listener registry and dispatcher.
///
/// Dispatch snapshots the listener list before calling into it, so callbacks
/// may add or remove listeners and dispatch further events.
pub struct EventSystem {
    element_handlers: RwLock<HashMap<NodeId, Vec<RegisteredListener>>>,
    listener_owners: RwLock<HashMap<ListenerId, NodeId>>,
    next_listener_id: AtomicU64,
}

impl EventSystem {
    pub fn new() -> Self {
        Self {
            element_handlers: RwLock::new(HashMap::new()),
            listener_owners: RwLock::new(HashMap::new()),
            next_listener_id: AtomicU64::new(1),
        }
    }

    pub fn add_listener(
        &self,
        node_id: NodeId,
        event_type: &str,
        capture: bool,
        callback: EventCallback,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.element_handlers
            .write()
            .entry(node_id)
            .or_default()
            .push(RegisteredListener {
                id,
                event_type: event_type.to_string(),
                capture,
                callback,
            });
        self.listener_owners.write().insert(id, node_id);
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let Some(node_id) = self.listener_owners.write().remove(&id) else {
            return false;
        };
        let mut handlers = self.element_handlers.write();
        if let Some(listeners) = handlers.get_mut(&node_id) {
            listeners.retain(|l| l.id != id);
            if listeners.is_empty() {
                handlers.remove(&node_id);
            }
        }
        true
    }

    pub fn remove_node_listeners(&self, node_id: NodeId) {
        if let Some(listeners) = self.element_handlers.write().remove(&node_id) {
            let mut owners = self.listener_owners.write();
            for listener in listeners {
                owners.remove(&listener.id);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listener_owners.read().len()
    }

    /// Runs capture, target and bubble phases for `event` at `target`, then
    /// the target's activation behavior. Returns `false` if the event was
    /// cancelled.
    pub fn dispatch(&self, document: &Document, target: NodeId, event: &mut Event) -> bool {
        tracing::trace!(event_type = %event.event_type, %target, "dispatching event");
        event.target = Some(target);
        event.propagation_stopped = false;
        event.immediate_propagation_stopped = false;

        let mut path = vec![target];
        let mut cursor = target;
        while let Some(parent) = document.get_parent(cursor) {
            path.push(parent);
            cursor = parent;
        }

        let activation = activation::pre_activate(document, target, event);

        event.phase = EventPhase::Capturing;
        for &node in path.iter().skip(1).rev() {
            if event.propagation_stopped {
                break;
            }
            self.invoke(node, event, Some(true));
        }

        if !event.propagation_stopped {
            event.phase = EventPhase::AtTarget;
            self.invoke(target, event, None);
        }

        if event.bubbles {
            event.phase = EventPhase::Bubbling;
            for &node in path.iter().skip(1) {
                if event.propagation_stopped {
                    break;
                }
                self.invoke(node, event, Some(false));
            }
        }

        event.phase = EventPhase::None;
        event.current_target = None;

        if let Some(state) = activation {
            activation::post_activate(document, state, event);
        }

        !event.default_prevented
    }

    fn invoke(&self, node_id: NodeId, event: &mut Event, capture: Option<bool>) {
        let listeners: Vec<RegisteredListener> = match self.element_handlers.read().get(&node_id) {
            Some(listeners) => listeners
                .iter()
                .filter(|l| l.event_type == event.event_type)
                .filter(|l| capture.map_or(true, |c| l.capture == c))
                .cloned()
                .collect(),
            None => return,
        };
        event.current_target = Some(node_id);
        for listener in listeners {
            if event.immediate_propagation_stopped {
                break;
            }
            (listener.callback)(event);
        }
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}
