//! Per-provider request/response adaptation — the third pipeline stage.
//!
//! Holds every provider's quirks so the Provider (HTTP transport) stage can
//! stay uniform: tool-schema sanitization, field-name mapping tables, beta
//! header injection, `max_tokens` defaulting, and response-side field
//! normalization (`reasoning`, `finish_reason`, tool-call argument repair).
//! Mapping tables are data, loaded at startup from provider config, not
//! hardcoded per adapter.

mod adapter;
mod errors;
mod mapping;
mod max_tokens;
mod path;
mod tools;
mod transform;

pub use adapter::{CompatAdapter, CompatOptions};
pub use errors::{CompatError, CompatResult};
pub use mapping::{Direction, FieldType, MappingEntry, MappingTable};
pub use max_tokens::{DEFAULT_MAX_TOKENS, apply_max_tokens_default};
pub use tools::{repair_command_argument, sanitize_tool_schema};
pub use transform::NamedTransform;
