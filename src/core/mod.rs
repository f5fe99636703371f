//! The synthetic platform the harness drives: document tree, selectors and events.

pub mod css;
pub mod dom;
pub mod events;
