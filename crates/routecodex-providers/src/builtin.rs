use routecodex_pipeline::config::{CountTokensMode, CustomProviderConfig};
use routecodex_pipeline::{
    AIStudioConfig, AntigravityConfig, ClaudeCodeConfig, ClaudeConfig, CodexConfig,
    DeepSeekConfig, DispatchTable, GeminiCliConfig, NvidiaConfig, OpenAIConfig, Proto,
    ProviderConfig, VertexConfig, VertexExpressConfig,
};

/// A default provider row, written into storage on first boot if the operator
/// hasn't configured one under the same name yet.
pub struct BuiltinProviderSeed {
    pub name: &'static str,
    pub config_json: serde_json::Value,
    pub enabled: bool,
}

fn seed(name: &'static str, config: ProviderConfig, enabled: bool) -> BuiltinProviderSeed {
    BuiltinProviderSeed {
        name,
        config_json: serde_json::to_value(config).expect("builtin provider config serializes"),
        enabled,
    }
}

/// OpenAI-compatible vendors (Qwen, GLM, iFlow, LM Studio) are not distinct
/// Rust implementations: the Provider stage dispatches on `ProviderConfig`'s
/// `kind` tag, and all four fit the generic `Custom` (OpenAI-shaped) channel.
/// Only their default base URL and dispatch table differ.
fn openai_compatible_seed(name: &'static str, base_url: &str) -> BuiltinProviderSeed {
    seed(
        name,
        ProviderConfig::Custom(CustomProviderConfig {
            id: name.to_string(),
            enabled: false,
            proto: Proto::OpenAIChat,
            base_url: base_url.to_string(),
            dispatch: DispatchTable::new([]),
            model_table: None,
            count_tokens: CountTokensMode::Upstream,
            json_param_mask: Vec::new(),
        }),
        false,
    )
}

/// The default provider catalog seeded into storage the first time a fresh
/// data directory boots. Operators edit or disable these via `/admin/config`;
/// builtin seeding never overwrites an existing row of the same name.
pub fn builtin_provider_seeds() -> Vec<BuiltinProviderSeed> {
    vec![
        seed(
            "openai",
            ProviderConfig::OpenAI(OpenAIConfig::default()),
            false,
        ),
        seed(
            "claude",
            ProviderConfig::Claude(ClaudeConfig::default()),
            false,
        ),
        seed(
            "codex",
            ProviderConfig::Codex(CodexConfig::default()),
            false,
        ),
        seed(
            "claudecode",
            ProviderConfig::ClaudeCode(ClaudeCodeConfig::default()),
            false,
        ),
        seed(
            "geminicli",
            ProviderConfig::GeminiCli(GeminiCliConfig::default()),
            false,
        ),
        seed(
            "aistudio",
            ProviderConfig::AIStudio(AIStudioConfig::default()),
            false,
        ),
        seed(
            "vertex",
            ProviderConfig::Vertex(VertexConfig::default()),
            false,
        ),
        seed(
            "vertexexpress",
            ProviderConfig::VertexExpress(VertexExpressConfig::default()),
            false,
        ),
        seed(
            "antigravity",
            ProviderConfig::Antigravity(AntigravityConfig::default()),
            false,
        ),
        seed(
            "nvidia",
            ProviderConfig::Nvidia(NvidiaConfig::default()),
            false,
        ),
        seed(
            "deepseek",
            ProviderConfig::DeepSeek(DeepSeekConfig::default()),
            false,
        ),
        openai_compatible_seed("qwen", "https://dashscope.aliyuncs.com/compatible-mode/v1"),
        openai_compatible_seed("glm", "https://open.bigmodel.cn/api/paas/v4"),
        openai_compatible_seed("iflow", "https://apis.iflow.cn/v1"),
        openai_compatible_seed("lmstudio", "http://127.0.0.1:1234/v1"),
    ]
}
