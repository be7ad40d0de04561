//! Core data structures shared by the extractor, rewriter, and request updater.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a parameter lives inside an HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    /// Query string of the request target.
    Url,
    /// `application/x-www-form-urlencoded` request body.
    Body,
    /// `Cookie` request header.
    Cookie,
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterType::Url => write!(f, "url"),
            ParameterType::Body => write!(f, "body"),
            ParameterType::Cookie => write!(f, "cookie"),
        }
    }
}

/// A `(name, value, type)` triple belonging to an HTTP message.
///
/// Name and value are kept exactly as they appear on the wire; nothing is
/// percent-decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: ParameterType,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>, kind: ParameterType) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind,
        }
    }

    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self {
            name: self.name.clone(),
            value: value.into(),
            kind: self.kind,
        }
    }
}

/// Tokens pulled out of a single reference document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTokens {
    /// Digit run following `wicket:interface=:`.
    pub interface_digits: String,
    /// Full hidden-field name, marker included (e.g. `form1_hf_0`).
    pub field_name: String,
}

/// The two corrected parameters ready to be applied onto the target request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedParameters {
    pub interface: Parameter,
    pub field: Parameter,
    /// Index of the reference entry the tokens came from.
    pub source_entry: usize,
}

impl UpdatedParameters {
    /// Both parameters in the order they are applied.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        [&self.interface, &self.field].into_iter()
    }
}
