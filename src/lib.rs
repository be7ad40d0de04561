//! # wicket-sync
//!
//! Keeps replayed Apache Wicket requests valid.
//!
//! Wicket embeds a rotating `wicket:interface` counter and per-form hidden
//! fields (`<form>_hf_0`) into every page it serves. A recorded request replayed
//! later carries stale values and gets rejected. After a session-handling host
//! replays a navigation macro, this crate reads the fresh values out of the
//! macro's responses and rewrites the outgoing request with them.
//!
//! ## Features
//!
//! - First-match token discovery over raw response bodies
//! - Structural rewrite of the interface value (only the counter changes)
//! - Fail-closed updates: the request is untouched unless both tokens are found
//! - Raw HTTP/1.x parameter helpers (query string, cookies, url-encoded forms)
//! - Diagnostics through the `log` facade or any custom event handler
//!
//! ## Example
//!
//! ```
//! use wicket_sync::{InterfaceUpdater, HttpExchange, RecordedExchange};
//!
//! let updater = InterfaceUpdater::new();
//! let mut current = RecordedExchange::new(
//!     "GET /app/?wicket:interface=:1:form::IFormSubmitListener:: HTTP/1.1\r\nHost: example.com\r\n\r\n",
//! );
//! let macro_items = vec![RecordedExchange::new("GET /app/ HTTP/1.1\r\n\r\n").with_response(
//!     "HTTP/1.1 200 OK\r\n\r\n<form action=\"?wicket:interface=:7:form::IFormSubmitListener::\">\
//!      <input type=\"hidden\" name=\"form_hf_0\"/></form>",
//! )];
//!
//! updater.perform(Some(&mut current), Some(macro_items.as_slice()))?;
//! assert!(current.request().starts_with(
//!     b"GET /app/?wicket:interface=:7:form::IFormSubmitListener::&form_hf_0= HTTP/1.1"
//! ));
//! # Ok::<(), wicket_sync::SyncError>(())
//! ```

mod updater;

pub mod config;
pub mod modules;
pub mod tokens;

pub use crate::updater::{
    InterfaceUpdater,
    InterfaceUpdaterBuilder,
    SessionHandlingAction,
    SyncResult,
};

pub use crate::config::{ConfigError, SyncConfig};

pub use crate::tokens::core::{
    ExtractedTokens,
    HttpExchange,
    MessageError,
    MessageHelpers,
    MutableExchange,
    Parameter,
    ParameterType,
    RawMessageHelpers,
    RecordedExchange,
    TokenError,
    TokenPatterns,
    UpdatedParameters,
    extract_tokens,
    find_field_token,
    find_interface_token,
    rewrite_interface_value,
};

pub use crate::tokens::pipeline::{
    SyncError,
    TargetParameters,
    apply_updates,
    compute_updated_parameters,
};

pub use crate::modules::{
    EventDispatcher,
    EventHandler,
    LoggingHandler,
    MemoryHandler,
    Severity,
    SyncEvent,
    WriterHandler,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
