//! Core utilities shared by the extractor, rewriter, and request updater.

pub mod analysis;
pub mod exchange;
pub mod message;
pub mod types;

pub use analysis::{
    TokenError, TokenPatterns, extract_tokens, find_field_token, find_interface_token,
    rewrite_interface_value,
};
pub use exchange::{HttpExchange, MutableExchange, RecordedExchange};
pub use message::{MessageError, MessageHelpers, RawMessageHelpers};
pub use types::{ExtractedTokens, Parameter, ParameterType, UpdatedParameters};
