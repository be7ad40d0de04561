//! Extract, rewrite, apply.
//!
//! [`compute_updated_parameters`] scans the reference bodies for fresh tokens
//! and builds the corrected parameters; [`apply_updates`] writes them onto the
//! target request. Nothing here performs I/O, and the target request is only
//! produced anew once both tokens have been found.

use chrono::Utc;
use thiserror::Error;

use crate::modules::events::{EventDispatcher, Severity, SyncEvent, TokensFoundEvent};
use crate::tokens::core::analysis::{TokenError, TokenPatterns};
use crate::tokens::core::message::{MessageError, MessageHelpers};
use crate::tokens::core::types::{Parameter, UpdatedParameters};

/// Reasons an update run leaves the target request untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("no macro defined")]
    MissingMacroResult,
    #[error("no current request")]
    MissingCurrentRequest,
    #[error("no request params to update")]
    NoParameters,
    #[error("request has no {0} parameter")]
    InterfaceParameterMissing(String),
    #[error("macro entry {index}: no response")]
    MacroResponseMissing { index: usize },
    #[error("macro entry {index}: no interface token found in response")]
    InterfaceTokenNotFound { index: usize },
    #[error("macro entry {index}: no identifier found in response")]
    FieldTokenNotFound { index: usize },
    #[error("no new values found in macro responses")]
    NoUpdateProduced,
    #[error("request could not be processed: {0}")]
    Message(#[from] MessageError),
}

impl SyncError {
    /// Missing inputs are informational; everything else is an error line.
    pub fn severity(&self) -> Severity {
        match self {
            SyncError::MissingMacroResult
            | SyncError::MissingCurrentRequest
            | SyncError::NoParameters => Severity::Info,
            _ => Severity::Error,
        }
    }

    /// Index of the reference entry the error belongs to, if any.
    pub fn entry(&self) -> Option<usize> {
        match self {
            SyncError::MacroResponseMissing { index }
            | SyncError::InterfaceTokenNotFound { index }
            | SyncError::FieldTokenNotFound { index } => Some(*index),
            _ => None,
        }
    }

    fn from_token(error: TokenError, index: usize) -> Self {
        match error {
            TokenError::InterfaceNotFound => SyncError::InterfaceTokenNotFound { index },
            TokenError::FieldNotFound => SyncError::FieldTokenNotFound { index },
        }
    }
}

/// The parameters of a target request the updater cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetParameters<'a> {
    pub interface: Option<&'a Parameter>,
    pub field: Option<&'a Parameter>,
}

impl<'a> TargetParameters<'a> {
    /// First interface parameter and first hidden-field parameter, by name.
    pub fn inspect(patterns: &TokenPatterns, parameters: &'a [Parameter]) -> Self {
        let interface = parameters
            .iter()
            .find(|param| param.name == patterns.interface_parameter());
        let field = parameters.iter().find(|param| {
            param.name != patterns.interface_parameter() && patterns.is_field_name(&param.name)
        });
        Self { interface, field }
    }
}

/// Build the corrected interface and hidden-field parameters.
///
/// `reference_bodies` holds one entry per macro step (`None` when the step got
/// no response). Entries that lack a body or either token are reported
/// through `events` and skipped. When several entries yield both tokens the
/// last one wins.
pub fn compute_updated_parameters<'b, I>(
    patterns: &TokenPatterns,
    parameters: &[Parameter],
    reference_bodies: I,
    events: &EventDispatcher,
) -> Result<UpdatedParameters, SyncError>
where
    I: IntoIterator<Item = Option<&'b str>>,
{
    if parameters.is_empty() {
        return Err(SyncError::NoParameters);
    }

    let target = TargetParameters::inspect(patterns, parameters);
    let interface = target.interface.ok_or_else(|| {
        SyncError::InterfaceParameterMissing(patterns.interface_parameter().to_string())
    })?;

    let mut updated = None;
    for (index, body) in reference_bodies.into_iter().enumerate() {
        let Some(body) = body else {
            events.dispatch(SyncEvent::rejected(SyncError::MacroResponseMissing { index }));
            continue;
        };

        let tokens = match patterns.extract_tokens(body) {
            Ok(tokens) => tokens,
            Err(err) => {
                events.dispatch(SyncEvent::rejected(SyncError::from_token(err, index)));
                continue;
            }
        };

        let value = patterns.rewrite_interface_value(&interface.value, &tokens.interface_digits);
        events.dispatch(SyncEvent::TokensFound(TokensFoundEvent {
            entry: index,
            interface_value: value.clone(),
            field_name: tokens.field_name.clone(),
            timestamp: Utc::now(),
        }));

        updated = Some(UpdatedParameters {
            interface: interface.with_value(value),
            field: Parameter::new(tokens.field_name, "", interface.kind),
            source_entry: index,
        });
    }

    updated.ok_or(SyncError::NoUpdateProduced)
}

/// Write the corrected parameters onto `request`, interface first.
pub fn apply_updates(
    helpers: &dyn MessageHelpers,
    request: &[u8],
    updated: &UpdatedParameters,
) -> Result<Vec<u8>, MessageError> {
    let mut request = request.to_vec();
    for parameter in updated.iter() {
        let parameter = helpers.build_parameter(&parameter.name, &parameter.value, parameter.kind);
        request = helpers.update_parameter(&request, &parameter)?;
    }
    Ok(request)
}
