//! Builds and dispatches input events of the right class for an event name.

use serde::Deserialize;
use serde_json::Value;

use crate::core::dom::{Document, NodeId};
use crate::core::events::{Event, KeyboardEventInit, MouseEventInit};
use crate::{HarnessError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    Mouse,
    Keyboard,
}

/// Maps an event name to the event class it is synthesized as.
///
/// `focus`, `change`, `blur` and `select` are refused: they come from default
/// actions or from the engine's own model updates, not from synthetic input.
pub fn classify(event_name: &str) -> Result<EventClass> {
    match event_name {
        "click" | "mousedown" | "mouseup" => Ok(EventClass::Mouse),
        "keydown" | "keyup" | "keypressed" => Ok(EventClass::Keyboard),
        "focus" | "change" | "blur" | "select" => {
            Err(HarnessError::UnsupportedEventKind(event_name.to_string()))
        }
        _ => Err(HarnessError::UnknownEventKind(event_name.to_string())),
    }
}

fn build_event(event_name: &str, data: Option<&Value>) -> Result<Event> {
    match classify(event_name)? {
        EventClass::Mouse => {
            if data.is_some_and(|d| !d.is_null()) {
                tracing::trace!(event = event_name, "ignoring payload for mouse event");
            }
            Ok(Event::mouse(
                event_name,
                MouseEventInit {
                    bubbles: true,
                    cancelable: true,
                    view: true,
                    ..Default::default()
                },
            ))
        }
        EventClass::Keyboard => {
            let init = match data {
                None | Some(Value::Null) => KeyboardEventInit::default(),
                Some(raw) => KeyboardEventInit::deserialize(raw).map_err(|e| {
                    HarnessError::InvalidEventInit {
                        event: event_name.to_string(),
                        reason: e.to_string(),
                    }
                })?,
            };
            Ok(Event::keyboard(event_name, init))
        }
    }
}

/// Dispatches `event_name` at `node`. Returns once every listener has run;
/// work the listeners schedule is not awaited.
pub fn synthesize(
    document: &Document,
    node: NodeId,
    event_name: &str,
    data: Option<&Value>,
) -> Result<()> {
    if !document
        .node_type(node)
        .is_some_and(|node_type| node_type.is_event_target())
    {
        return Err(HarnessError::NotDispatchable(node));
    }
    let mut event = build_event(event_name, data)?;
    let not_cancelled = document.dispatch_event(node, &mut event)?;
    tracing::debug!(%node, event = event_name, not_cancelled, "synthesized event");
    Ok(())
}
