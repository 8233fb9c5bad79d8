//! Host integration - what an embedding application provides.
//!
//! - [`Reporter`] / [`MessageType`] - user-facing messages
//! - [`Settings`] - persisted configuration
//! - [`CollectionContext`] - the bundle passed to collection editors

mod report;
mod settings;
mod context;

pub use report::{ConsoleReporter, MemoryReporter, MessageType, Reporter, TracingReporter};
pub use settings::Settings;
pub use context::CollectionContext;
