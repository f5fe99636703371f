//! Mounting components and driving them with synthetic input.

pub mod engine;
pub mod environment;
pub mod mount;
pub mod poll;
pub mod synthesizer;
pub mod trigger;
pub mod wrapper;

pub use engine::{IsolateScope, Scope, TemplateCompiler};
pub use environment::TestEnvironment;
pub use mount::{mount, mount_sync, mount_until, mount_with, normalize_template};
pub use poll::{Poller, Truthy};
pub use synthesizer::{classify, synthesize, EventClass};
pub use trigger::{dispatch, NodeHandle, SelfTrigger, Triggerable};
pub use wrapper::Wrapper;
