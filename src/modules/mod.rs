//! Cross-cutting services module
//!
//! Diagnostics plumbing shared by the updater and its callers.

pub mod events;

pub use events::{
    EventDispatcher, EventHandler, LoggingHandler, MemoryHandler, RejectedEvent,
    RequestUpdatedEvent, Severity, SyncEvent, TokensFoundEvent, WriterHandler,
};
