//! Settings and configuration module
//!
//! Provides the naming convention and action identity used by the updater:
//! - Serde (de)serialisation with per-field defaults
//! - JSON loading
//! - Validation of the configured literals

pub mod settings;

pub use settings::{ConfigError, SyncConfig};
