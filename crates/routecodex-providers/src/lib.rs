//! Built-in upstream provider implementations.
//!
//! This crate does not perform network IO. It builds `UpstreamHttpRequest` for
//! upstream calls (including provider-specific internal calls like `upstream_usage`).

mod auth_extractor;
mod builtin;
mod credential;
mod gemini_fallback;
mod providers;
mod registry;

pub use builtin::{BuiltinProviderSeed, builtin_provider_seeds};
pub use credential::BaseCredential;
pub use registry::register_builtin_providers;

// `routecodex-providers::ProviderRegistry` is the same registry type
// `routecodex-pipeline` builds and stores in `AppState` — re-exported here so
// callers that only depend on this crate's provider catalog don't also need
// a direct `routecodex-pipeline` import just for the registry type name.
pub use routecodex_pipeline::ProviderRegistry;
