use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tokens::core::analysis::{DEFAULT_FIELD_MARKER, DEFAULT_INTERFACE_PARAMETER};

pub const DEFAULT_EXTENSION_NAME: &str = "WicketRequestUpdater";
pub const DEFAULT_ACTION_NAME: &str = "UpdateInterface";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("configuration field '{0}' must not be empty")]
    Empty(&'static str),
    #[error("invalid token pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Identity of the session-handling action and the Wicket naming convention
/// it synchronises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Name the extension registers under.
    pub extension_name: String,
    /// Name of the session-handling action shown to the host.
    pub action_name: String,
    /// Request parameter holding the rotating interface identifier.
    pub interface_parameter: String,
    /// Literal that terminates every hidden-field name.
    pub field_marker: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            extension_name: DEFAULT_EXTENSION_NAME.to_string(),
            action_name: DEFAULT_ACTION_NAME.to_string(),
            interface_parameter: DEFAULT_INTERFACE_PARAMETER.to_string(),
            field_marker: DEFAULT_FIELD_MARKER.to_string(),
        }
    }
}

impl SyncConfig {
    /// Load a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("extension_name", &self.extension_name),
            ("action_name", &self.action_name),
            ("interface_parameter", &self.interface_parameter),
            ("field_marker", &self.field_marker),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty(field));
            }
        }
        Ok(())
    }

    pub fn with_action_name(mut self, name: impl Into<String>) -> Self {
        self.action_name = name.into();
        self
    }

    pub fn with_interface_parameter(mut self, name: impl Into<String>) -> Self {
        self.interface_parameter = name.into();
        self
    }

    pub fn with_field_marker(mut self, marker: impl Into<String>) -> Self {
        self.field_marker = marker.into();
        self
    }
}
