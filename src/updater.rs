//! High level session-handling action.
//!
//! Wires together the token patterns, the host message helpers, and the
//! diagnostics dispatcher into the "UpdateInterface" action a session-handling
//! host runs after replaying a macro.

use std::sync::Arc;

use chrono::Utc;

use crate::config::{ConfigError, SyncConfig};
use crate::modules::events::{
	EventDispatcher, EventHandler, LoggingHandler, RequestUpdatedEvent, SyncEvent,
};
use crate::tokens::core::analysis::TokenPatterns;
use crate::tokens::core::exchange::{HttpExchange, MutableExchange, RecordedExchange};
use crate::tokens::core::message::{MessageHelpers, RawMessageHelpers};
use crate::tokens::core::types::UpdatedParameters;
use crate::tokens::pipeline::{
	SyncError, TargetParameters, apply_updates, compute_updated_parameters,
};

/// Result alias used by the updater.
pub type SyncResult<T> = Result<T, SyncError>;

/// Contract of an action the host can run as part of its session handling.
pub trait SessionHandlingAction: Send + Sync {
	/// Name shown by the host when the action is picked.
	fn action_name(&self) -> &str;

	/// Run the action. `current` is the request about to be sent; `macro_items`
	/// holds the exchanges of the macro that ran before, if any. Failures are
	/// reported through diagnostics and leave `current` untouched.
	fn perform_action(
		&self,
		current: Option<&mut dyn MutableExchange>,
		macro_items: Option<&[RecordedExchange]>,
	);
}

/// Fluent builder for [`InterfaceUpdater`].
pub struct InterfaceUpdaterBuilder {
	config: SyncConfig,
	helpers: Option<Arc<dyn MessageHelpers>>,
	handlers: Vec<Arc<dyn EventHandler>>,
	logging: bool,
}

impl InterfaceUpdaterBuilder {
	pub fn new() -> Self {
		Self {
			config: SyncConfig::default(),
			helpers: None,
			handlers: Vec::new(),
			logging: true,
		}
	}

	pub fn with_config(mut self, config: SyncConfig) -> Self {
		self.config = config;
		self
	}

	/// Replace the built-in raw HTTP helpers with the host's own.
	pub fn with_helpers(mut self, helpers: Arc<dyn MessageHelpers>) -> Self {
		self.helpers = Some(helpers);
		self
	}

	pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
		self.handlers.push(handler);
		self
	}

	/// Do not forward diagnostics to the `log` facade.
	pub fn disable_logging(mut self) -> Self {
		self.logging = false;
		self
	}

	pub fn build(self) -> Result<InterfaceUpdater, ConfigError> {
		self.config.validate()?;
		let patterns = TokenPatterns::from_config(&self.config)?;

		let mut events = EventDispatcher::new();
		if self.logging {
			events.register_handler(Arc::new(LoggingHandler));
		}
		for handler in self.handlers {
			events.register_handler(handler);
		}

		Ok(InterfaceUpdater {
			config: self.config,
			patterns,
			helpers: self
				.helpers
				.unwrap_or_else(|| Arc::new(RawMessageHelpers::new())),
			events,
		})
	}
}

impl Default for InterfaceUpdaterBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Keeps replayed Wicket requests in step with the server.
///
/// Reads the current `wicket:interface` counter and hidden-field name from the
/// responses of a freshly replayed macro and writes them into the request about
/// to be sent. Holds no per-run state.
pub struct InterfaceUpdater {
	config: SyncConfig,
	patterns: TokenPatterns,
	helpers: Arc<dyn MessageHelpers>,
	events: EventDispatcher,
}

impl InterfaceUpdater {
	/// Updater with the default Wicket convention, raw HTTP helpers, and
	/// `log` diagnostics.
	pub fn new() -> Self {
		Self {
			config: SyncConfig::default(),
			patterns: TokenPatterns::default(),
			helpers: Arc::new(RawMessageHelpers::new()),
			events: {
				let mut events = EventDispatcher::new();
				events.register_handler(Arc::new(LoggingHandler));
				events
			},
		}
	}

	pub fn builder() -> InterfaceUpdaterBuilder {
		InterfaceUpdaterBuilder::new()
	}

	pub fn config(&self) -> &SyncConfig {
		&self.config
	}

	pub fn extension_name(&self) -> &str {
		&self.config.extension_name
	}

	pub fn patterns(&self) -> &TokenPatterns {
		&self.patterns
	}

	/// Synchronise `current` against `macro_items`.
	///
	/// On success the request of `current` has been replaced and the applied
	/// parameters are returned. On failure the error has already been
	/// dispatched and `current` is unchanged.
	pub fn perform(
		&self,
		current: Option<&mut dyn MutableExchange>,
		macro_items: Option<&[RecordedExchange]>,
	) -> SyncResult<UpdatedParameters> {
		let result = self.run(current, macro_items);
		if let Err(err) = &result {
			self.events.dispatch(SyncEvent::rejected(err.clone()));
		}
		result
	}

	fn run(
		&self,
		current: Option<&mut dyn MutableExchange>,
		macro_items: Option<&[RecordedExchange]>,
	) -> SyncResult<UpdatedParameters> {
		let macro_items = macro_items.ok_or(SyncError::MissingMacroResult)?;
		let current = current.ok_or(SyncError::MissingCurrentRequest)?;

		let parameters = self.helpers.parameters(current.request())?;
		let previous_field = TargetParameters::inspect(&self.patterns, &parameters)
			.field
			.map(|param| param.name.clone());

		let bodies: Vec<Option<String>> = macro_items
			.iter()
			.map(|item| item.response().map(|response| self.helpers.response_body(response)))
			.collect();

		let updated = compute_updated_parameters(
			&self.patterns,
			&parameters,
			bodies.iter().map(Option::as_deref),
			&self.events,
		)?;

		let request = apply_updates(self.helpers.as_ref(), current.request(), &updated)?;
		let request_len = request.len();
		current.set_request(request);

		self.events.dispatch(SyncEvent::RequestUpdated(RequestUpdatedEvent {
			interface_value: updated.interface.value.clone(),
			field_name: updated.field.name.clone(),
			previous_field,
			request_len,
			timestamp: Utc::now(),
		}));

		Ok(updated)
	}
}

impl Default for InterfaceUpdater {
	fn default() -> Self {
		Self::new()
	}
}

impl SessionHandlingAction for InterfaceUpdater {
	fn action_name(&self) -> &str {
		&self.config.action_name
	}

	fn perform_action(
		&self,
		current: Option<&mut dyn MutableExchange>,
		macro_items: Option<&[RecordedExchange]>,
	) {
		// Already reported through the dispatcher.
		let _ = self.perform(current, macro_items);
	}
}
