// Token extraction, value rewriting, and request updating for Wicket replay synchronisation.

pub mod core;
pub mod pipeline;
