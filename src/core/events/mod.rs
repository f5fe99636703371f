pub mod activation;
pub mod system;

pub use system::*;

use serde::{Deserialize, Serialize};

use crate::core::dom::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPhase {
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

/// Initialisation dictionary for `MouseEvent`, keyed the way page scripts spell it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MouseEventInit {
    pub bubbles: bool,
    pub cancelable: bool,
    pub composed: bool,
    /// Whether the event carries the document's window as its `view`.
    pub view: bool,
    pub detail: i32,
    pub screen_x: f64,
    pub screen_y: f64,
    pub client_x: f64,
    pub client_y: f64,
    pub button: i16,
    pub buttons: u16,
    pub ctrl_key: bool,
    pub shift_key: bool,
    pub alt_key: bool,
    pub meta_key: bool,
}

/// Initialisation dictionary for `KeyboardEvent`. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyboardEventInit {
    pub bubbles: bool,
    pub cancelable: bool,
    pub composed: bool,
    pub key: String,
    pub code: String,
    pub location: u32,
    pub ctrl_key: bool,
    pub shift_key: bool,
    pub alt_key: bool,
    pub meta_key: bool,
    pub repeat: bool,
    pub is_composing: bool,
    pub char_code: u32,
    pub key_code: u32,
    pub which: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    Mouse(MouseEventInit),
    Keyboard(KeyboardEventInit),
    Basic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_type: String,
    pub kind: EventKind,
    pub bubbles: bool,
    pub cancelable: bool,
    pub is_trusted: bool,
    target: Option<NodeId>,
    current_target: Option<NodeId>,
    phase: EventPhase,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
}

impl Event {
    fn with_kind(event_type: &str, kind: EventKind, bubbles: bool, cancelable: bool) -> Self {
        Self {
            event_type: event_type.to_string(),
            kind,
            bubbles,
            cancelable,
            is_trusted: false,
            target: None,
            current_target: None,
            phase: EventPhase::None,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }

    pub fn basic(event_type: &str, bubbles: bool, cancelable: bool) -> Self {
        Self::with_kind(event_type, EventKind::Basic, bubbles, cancelable)
    }

    pub fn mouse(event_type: &str, init: MouseEventInit) -> Self {
        let (bubbles, cancelable) = (init.bubbles, init.cancelable);
        Self::with_kind(event_type, EventKind::Mouse(init), bubbles, cancelable)
    }

    pub fn keyboard(event_type: &str, init: KeyboardEventInit) -> Self {
        let (bubbles, cancelable) = (init.bubbles, init.cancelable);
        Self::with_kind(event_type, EventKind::Keyboard(init), bubbles, cancelable)
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn current_target(&self) -> Option<NodeId> {
        self.current_target
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    pub fn as_keyboard(&self) -> Option<&KeyboardEventInit> {
        match &self.kind {
            EventKind::Keyboard(init) => Some(init),
            _ => None,
        }
    }

    pub fn as_mouse(&self) -> Option<&MouseEventInit> {
        match &self.kind {
            EventKind::Mouse(init) => Some(init),
            _ => None,
        }
    }
}
