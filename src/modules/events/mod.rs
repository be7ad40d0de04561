//! Diagnostics channel.
//!
//! Every step of an update run is reported as a [`SyncEvent`] and broadcast to
//! the registered handlers before the run returns.

use chrono::{DateTime, Utc};
use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::tokens::pipeline::SyncError;

/// Line severity, mirroring the host's stdout/stderr split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Error,
}

/// Both tokens were found in one reference entry.
#[derive(Debug, Clone)]
pub struct TokensFoundEvent {
    pub entry: usize,
    pub interface_value: String,
    pub field_name: String,
    pub timestamp: DateTime<Utc>,
}

/// The target request was rewritten.
#[derive(Debug, Clone)]
pub struct RequestUpdatedEvent {
    pub interface_value: String,
    pub field_name: String,
    /// Hidden field already present on the request, if any.
    pub previous_field: Option<String>,
    pub request_len: usize,
    pub timestamp: DateTime<Utc>,
}

/// A request-level or per-entry failure.
#[derive(Debug, Clone)]
pub struct RejectedEvent {
    pub error: SyncError,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum SyncEvent {
    TokensFound(TokensFoundEvent),
    RequestUpdated(RequestUpdatedEvent),
    Rejected(RejectedEvent),
}

impl SyncEvent {
    pub fn rejected(error: SyncError) -> Self {
        SyncEvent::Rejected(RejectedEvent {
            error,
            timestamp: Utc::now(),
        })
    }

    pub fn severity(&self) -> Severity {
        match self {
            SyncEvent::TokensFound(_) | SyncEvent::RequestUpdated(_) => Severity::Info,
            SyncEvent::Rejected(rejected) => rejected.error.severity(),
        }
    }

    /// One-line rendering used by the text handlers.
    pub fn message(&self) -> String {
        match self {
            SyncEvent::TokensFound(found) => format!(
                "macro entry {}: found wicket interface {} and identifier {}",
                found.entry, found.interface_value, found.field_name
            ),
            SyncEvent::RequestUpdated(updated) => match &updated.previous_field {
                Some(previous) if *previous != updated.field_name => format!(
                    "updated request: interface {}, identifier {} (was {})",
                    updated.interface_value, updated.field_name, previous
                ),
                _ => format!(
                    "updated request: interface {}, identifier {}",
                    updated.interface_value, updated.field_name
                ),
            },
            SyncEvent::Rejected(rejected) => rejected.error.to_string(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            SyncEvent::TokensFound(event) => event.timestamp,
            SyncEvent::RequestUpdated(event) => event.timestamp,
            SyncEvent::Rejected(event) => event.timestamp,
        }
    }
}

/// Trait implemented by event handlers.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &SyncEvent);
}

/// Dispatcher that broadcasts events to registered handlers.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn dispatch(&self, event: SyncEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Logs events using the `log` crate.
#[derive(Debug)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &SyncEvent) {
        match event {
            SyncEvent::TokensFound(_) => log::debug!("{}", event.message()),
            SyncEvent::RequestUpdated(_) => log::info!("{}", event.message()),
            SyncEvent::Rejected(_) => match event.severity() {
                Severity::Info => log::info!("{}", event.message()),
                Severity::Error => log::warn!("{}", event.message()),
            },
        }
    }
}

/// Writes info lines to one sink and error lines to another, one event per
/// line, flushing after each.
pub struct WriterHandler<O, E> {
    out: Mutex<O>,
    err: Mutex<E>,
}

impl<O: Write + Send, E: Write + Send> WriterHandler<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self {
            out: Mutex::new(out),
            err: Mutex::new(err),
        }
    }

    pub fn into_inner(self) -> (O, E) {
        let out = self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        let err = self.err.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        (out, err)
    }
}

impl WriterHandler<std::io::Stdout, std::io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdout(), std::io::stderr())
    }
}

impl<O: Write + Send, E: Write + Send> EventHandler for WriterHandler<O, E> {
    fn handle(&self, event: &SyncEvent) {
        let line = event.message();
        let result = match event.severity() {
            Severity::Info => write_line(&self.out, &line),
            Severity::Error => write_line(&self.err, &line),
        };
        if let Err(err) = result {
            log::warn!("failed to write diagnostic line: {err}");
        }
    }
}

fn write_line<W: Write>(sink: &Mutex<W>, line: &str) -> std::io::Result<()> {
    let mut sink = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    writeln!(sink, "{line}")?;
    sink.flush()
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryHandler {
    events: Mutex<Vec<SyncEvent>>,
}

impl MemoryHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Rendered messages of the given severity, oldest first.
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.events()
            .iter()
            .filter(|event| event.severity() == severity)
            .map(SyncEvent::message)
            .collect()
    }

    pub fn errors(&self) -> Vec<SyncError> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SyncEvent::Rejected(rejected) => Some(rejected.error),
                _ => None,
            })
            .collect()
    }
}

impl EventHandler for MemoryHandler {
    fn handle(&self, event: &SyncEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}
