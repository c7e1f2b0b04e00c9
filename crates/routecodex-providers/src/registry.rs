use std::sync::Arc;

use routecodex_pipeline::ProviderRegistry;

use crate::providers::{
    AIStudioProvider, AntigravityProvider, ClaudeCodeProvider, ClaudeProvider, CodexProvider,
    CustomProvider, DeepSeekProvider, GeminiCliProvider, NvidiaProvider, OpenAIProvider,
    VertexExpressProvider, VertexProvider,
};

/// Registers every built-in `UpstreamProvider` implementation this crate
/// ships. Storage-level provider rows (including the OpenAI-compatible
/// vendor catalog seeded by [`crate::builtin_provider_seeds`]) resolve to one
/// of these by their `ProviderConfig` kind, not by the row's own name.
pub fn register_builtin_providers(registry: &mut ProviderRegistry) {
    registry.register(Arc::new(OpenAIProvider));
    registry.register(Arc::new(ClaudeProvider));
    registry.register(Arc::new(AIStudioProvider));
    registry.register(Arc::new(VertexExpressProvider));
    registry.register(Arc::new(VertexProvider));
    registry.register(Arc::new(GeminiCliProvider));
    registry.register(Arc::new(ClaudeCodeProvider));
    registry.register(Arc::new(CodexProvider));
    registry.register(Arc::new(AntigravityProvider));
    registry.register(Arc::new(NvidiaProvider));
    registry.register(Arc::new(DeepSeekProvider));
    registry.register(Arc::new(CustomProvider));
}
