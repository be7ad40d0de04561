//! Token discovery and interface value rewriting.
//!
//! Wicket renders two moving parts into every page: a `wicket:interface`
//! identifier of the form `<prefix>:<digits>:<suffix>::<suffix>` whose digit run
//! is a page counter, and hidden fields named `<word>_hf_0`. This module finds
//! the current values in a freshly fetched page and splices them into a stale
//! parameter value.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;

use super::types::ExtractedTokens;
use crate::config::{ConfigError, SyncConfig};

pub const DEFAULT_INTERFACE_PARAMETER: &str = "wicket:interface";
pub const DEFAULT_FIELD_MARKER: &str = "_hf_0";

/// Reference-document scan failures, reported per token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("no interface token found in reference document")]
    InterfaceNotFound,
    #[error("no hidden-field identifier found in reference document")]
    FieldNotFound,
}

/// Compiled patterns for one naming convention.
#[derive(Debug, Clone)]
pub struct TokenPatterns {
    interface_parameter: String,
    field_marker: String,
    interface_token: Regex,
    field_token: Regex,
    interface_value: Regex,
}

impl TokenPatterns {
    /// Compile the patterns for the parameter name and field marker in `config`.
    pub fn from_config(config: &SyncConfig) -> Result<Self, ConfigError> {
        if config.interface_parameter.is_empty() {
            return Err(ConfigError::Empty("interface_parameter"));
        }
        if config.field_marker.is_empty() {
            return Err(ConfigError::Empty("field_marker"));
        }

        let interface_token = Regex::new(&format!(
            r"({}=:)([0-9]+)(:)",
            regex::escape(&config.interface_parameter)
        ))?;
        let field_token = Regex::new(&format!(
            r"(?-u:\w)+{}",
            regex::escape(&config.field_marker)
        ))?;

        Ok(Self {
            interface_parameter: config.interface_parameter.clone(),
            field_marker: config.field_marker.clone(),
            interface_token,
            field_token,
            interface_value: INTERFACE_VALUE_RE.clone(),
        })
    }

    /// Name of the request parameter carrying the interface identifier.
    pub fn interface_parameter(&self) -> &str {
        &self.interface_parameter
    }

    /// Literal suffix shared by every hidden-field name.
    pub fn field_marker(&self) -> &str {
        &self.field_marker
    }

    /// True when `name` follows the hidden-field naming convention.
    pub fn is_field_name(&self, name: &str) -> bool {
        name.contains(&self.field_marker)
    }

    /// Digit run of the first interface token in `body`.
    pub fn find_interface_token<'a>(&self, body: &'a str) -> Option<&'a str> {
        self.interface_token
            .captures(body)
            .and_then(|caps| caps.get(2))
            .map(|m| m.as_str())
    }

    /// First hidden-field name in `body`, marker included.
    pub fn find_field_token<'a>(&self, body: &'a str) -> Option<&'a str> {
        self.field_token.find(body).map(|m| m.as_str())
    }

    /// Scan `body` for both tokens. The interface token is checked first.
    pub fn extract_tokens(&self, body: &str) -> Result<ExtractedTokens, TokenError> {
        let interface_digits = self
            .find_interface_token(body)
            .ok_or(TokenError::InterfaceNotFound)?;
        let field_name = self
            .find_field_token(body)
            .ok_or(TokenError::FieldNotFound)?;

        Ok(ExtractedTokens {
            interface_digits: interface_digits.to_string(),
            field_name: field_name.to_string(),
        })
    }

    /// Replace the counter in an interface value, leaving everything else as is.
    ///
    /// Only the first `:<digits>:` run that is followed by a `::`-terminated
    /// suffix is touched. Values that do not have that shape come back
    /// unchanged.
    pub fn rewrite_interface_value(&self, current: &str, digits: &str) -> String {
        self.interface_value
            .replace(current, |caps: &Captures<'_>| {
                format!("{}{}{}", &caps[1], digits, &caps[3])
            })
            .into_owned()
    }
}

impl Default for TokenPatterns {
    fn default() -> Self {
        DEFAULT_PATTERNS.clone()
    }
}

/// Digit run of the first `wicket:interface=:<digits>:` occurrence in `body`.
pub fn find_interface_token(body: &str) -> Option<&str> {
    DEFAULT_PATTERNS.find_interface_token(body)
}

/// First `<word>_hf_0` occurrence in `body`.
pub fn find_field_token(body: &str) -> Option<&str> {
    DEFAULT_PATTERNS.find_field_token(body)
}

/// Both Wicket tokens from `body`, or the first one that is missing.
pub fn extract_tokens(body: &str) -> Result<ExtractedTokens, TokenError> {
    DEFAULT_PATTERNS.extract_tokens(body)
}

/// Swap the counter inside a `wicket:interface` value for `digits`.
pub fn rewrite_interface_value(current: &str, digits: &str) -> String {
    DEFAULT_PATTERNS.rewrite_interface_value(current, digits)
}

static INTERFACE_VALUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(:)([0-9]+)(:.+::)").unwrap());

static DEFAULT_PATTERNS: Lazy<TokenPatterns> = Lazy::new(|| TokenPatterns {
    interface_parameter: DEFAULT_INTERFACE_PARAMETER.to_string(),
    field_marker: DEFAULT_FIELD_MARKER.to_string(),
    interface_token: Regex::new(r"(wicket:interface=:)([0-9]+)(:)").unwrap(),
    field_token: Regex::new(r"(?-u:\w)+_hf_0").unwrap(),
    interface_value: INTERFACE_VALUE_RE.clone(),
});

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <form id="form1" method="post"
              action="?wicket:interface=:42:form1::IFormSubmitListener::">
          <div style="display:none"><input type="hidden" name="form1_hf_0" id="form1_hf_0" /></div>
          <a href="?wicket:interface=:43:link::ILinkListener::">next</a>
          <input type="hidden" name="other_hf_0" />
        </form>
    "#;

    #[test]
    fn finds_first_interface_token() {
        assert_eq!(find_interface_token(PAGE), Some("42"));
    }

    #[test]
    fn finds_first_field_token() {
        assert_eq!(find_field_token(PAGE), Some("form1_hf_0"));
    }

    #[test]
    fn interface_token_requires_trailing_colon() {
        assert_eq!(find_interface_token("wicket:interface=:42"), None);
        assert_eq!(find_interface_token("wicket:interface=42:"), None);
        assert_eq!(find_interface_token("wicket:interface=:7:"), Some("7"));
    }

    #[test]
    fn field_token_requires_leading_word() {
        assert_eq!(find_field_token("name=\"_hf_0\""), None);
        assert_eq!(find_field_token("a_hf_0"), Some("a_hf_0"));
        assert_eq!(find_field_token("x-y_hf_0"), Some("y_hf_0"));
    }

    #[test]
    fn tokens_are_ascii_only() {
        assert_eq!(find_interface_token("wicket:interface=:\u{663}\u{664}:"), None);
        assert_eq!(find_field_token("\u{e9}_hf_0"), None);
        assert_eq!(find_field_token("caf\u{e9}_hf_0 next_hf_0"), Some("next_hf_0"));
        assert_eq!(rewrite_interface_value(":\u{663}:form::", "5"), ":\u{663}:form::");

        let patterns = TokenPatterns::from_config(&SyncConfig::default()).unwrap();
        assert_eq!(patterns.find_interface_token("wicket:interface=:\u{663}:"), None);
        assert_eq!(patterns.find_field_token("\u{e9}_hf_0"), None);
    }

    #[test]
    fn extract_reports_missing_interface_first() {
        assert_eq!(extract_tokens("nothing here"), Err(TokenError::InterfaceNotFound));
        assert_eq!(
            extract_tokens("only form1_hf_0 here"),
            Err(TokenError::InterfaceNotFound)
        );
    }

    #[test]
    fn extract_reports_missing_field() {
        assert_eq!(
            extract_tokens("?wicket:interface=:9:page::"),
            Err(TokenError::FieldNotFound)
        );
    }

    #[test]
    fn extract_returns_both_tokens() {
        let tokens = extract_tokens(PAGE).unwrap();
        assert_eq!(tokens.interface_digits, "42");
        assert_eq!(tokens.field_name, "form1_hf_0");
    }

    #[test]
    fn rewrite_preserves_structure() {
        assert_eq!(rewrite_interface_value("a:123:b::c", "456"), "a:456:b::c");
        assert_eq!(
            rewrite_interface_value("foo:12345:bar::baz", "67890"),
            "foo:67890:bar::baz"
        );
    }

    #[test]
    fn rewrite_only_touches_first_digit_run() {
        assert_eq!(
            rewrite_interface_value(":3:form:7:submit::IFormSubmitListener::", "11"),
            ":11:form:7:submit::IFormSubmitListener::"
        );
        assert_eq!(
            rewrite_interface_value("page:1:5:x::y", "2"),
            "page:2:5:x::y"
        );
    }

    #[test]
    fn rewrite_passes_through_unrecognised_values() {
        assert_eq!(rewrite_interface_value("no-colons", "5"), "no-colons");
        assert_eq!(rewrite_interface_value("a:12:b", "5"), "a:12:b");
        assert_eq!(rewrite_interface_value("", "5"), "");
    }

    #[test]
    fn custom_convention_is_escaped() {
        let config = SyncConfig {
            interface_parameter: "app.iface".into(),
            field_marker: "_hf.1".into(),
            ..SyncConfig::default()
        };
        let patterns = TokenPatterns::from_config(&config).unwrap();

        assert_eq!(patterns.find_interface_token("app.iface=:8:"), Some("8"));
        assert_eq!(patterns.find_interface_token("appXiface=:8:"), None);
        assert_eq!(patterns.find_field_token("zz_hfX1 zz_hf.1"), Some("zz_hf.1"));
        assert!(patterns.is_field_name("zz_hf.1"));
    }

    #[test]
    fn default_config_matches_builtin_patterns() {
        let patterns = TokenPatterns::from_config(&SyncConfig::default()).unwrap();
        assert_eq!(patterns.find_interface_token(PAGE), Some("42"));
        assert_eq!(patterns.find_field_token(PAGE), Some("form1_hf_0"));
        assert_eq!(patterns.interface_parameter(), DEFAULT_INTERFACE_PARAMETER);
    }

    #[test]
    fn empty_convention_is_rejected() {
        let config = SyncConfig {
            field_marker: String::new(),
            ..SyncConfig::default()
        };
        assert!(matches!(
            TokenPatterns::from_config(&config),
            Err(ConfigError::Empty("field_marker"))
        ));
    }
}
