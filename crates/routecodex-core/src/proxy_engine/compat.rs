//! Wires the standalone `routecodex-compat` Compatibility stage (spec §4.4)
//! into the actual request path: tool-schema sanitization and `max_tokens`
//! defaulting on the way to the upstream, `reasoning`/`finish_reason`
//! normalization on the way back.
//!
//! Per-provider adapters are plain JSON `Value` transforms, but the pipeline
//! between `build_upstream_request` and `self.client.send` (and between the
//! upstream response bytes and `decode_response`) already carries the
//! request/response as raw provider-native JSON bytes, so this module only
//! needs to decode, run the adapter, and re-encode — it never touches the
//! typed `Request`/`Response` enums. Best-effort throughout: a body that
//! isn't JSON, or an adapter error, leaves the bytes untouched rather than
//! failing the request.

use std::collections::HashMap;
use std::sync::OnceLock;

use bytes::Bytes;

use routecodex_compat::{
    CompatAdapter, CompatOptions, Direction, FieldType, MappingEntry, MappingTable, NamedTransform,
};
use routecodex_pipeline::provider::UpstreamHttpRequest;

fn adapters() -> &'static HashMap<&'static str, CompatAdapter> {
    static ADAPTERS: OnceLock<HashMap<&'static str, CompatAdapter>> = OnceLock::new();
    ADAPTERS.get_or_init(build_adapters)
}

fn build_adapters() -> HashMap<&'static str, CompatAdapter> {
    let mut m = HashMap::new();
    m.insert(
        "openai",
        CompatAdapter::new("openai", finish_reason_mapping(), CompatOptions::default()),
    );
    m.insert(
        "custom",
        CompatAdapter::new("custom", finish_reason_mapping(), CompatOptions::default()),
    );
    m.insert(
        "nvidia",
        CompatAdapter::new("nvidia", finish_reason_mapping(), CompatOptions::default()),
    );
    m.insert(
        "codex",
        CompatAdapter::new(
            "codex",
            finish_reason_mapping(),
            CompatOptions {
                required_headers: vec![("openai-beta", "responses-2024-12-17")],
                max_tokens_override: None,
            },
        ),
    );
    m.insert(
        "deepseek",
        CompatAdapter::new("deepseek", deepseek_mapping(), CompatOptions::default()),
    );
    m.insert(
        "geminicli",
        CompatAdapter::new("geminicli", gemini_mapping(), CompatOptions::default()),
    );
    m.insert(
        "aistudio",
        CompatAdapter::new("aistudio", gemini_mapping(), CompatOptions::default()),
    );
    m.insert(
        "vertex",
        CompatAdapter::new("vertex", gemini_mapping(), CompatOptions::default()),
    );
    m.insert(
        "vertexexpress",
        CompatAdapter::new("vertexexpress", gemini_mapping(), CompatOptions::default()),
    );
    m.insert(
        "claude",
        CompatAdapter::new("claude", MappingTable::default(), CompatOptions::default()),
    );
    m.insert(
        "claudecode",
        CompatAdapter::new("claudecode", MappingTable::default(), CompatOptions::default()),
    );
    m.insert(
        "antigravity",
        CompatAdapter::new("antigravity", MappingTable::default(), CompatOptions::default()),
    );
    m
}

fn finish_reason_mapping() -> MappingTable {
    MappingTable::new(vec![MappingEntry {
        source_path: "finish_reason".to_string(),
        target_path: "finish_reason".to_string(),
        value_type: FieldType::String,
        direction: Direction::Outgoing,
        transform: Some(NamedTransform::NormalizeFinishReason),
        remove_source: true,
    }])
}

/// GLM/DeepSeek style `reasoning_content` string folded into the canonical
/// `reasoning` block, plus finish-reason alias collapsing.
fn deepseek_mapping() -> MappingTable {
    MappingTable::new(vec![
        MappingEntry {
            source_path: "reasoning_content".to_string(),
            target_path: "reasoning".to_string(),
            value_type: FieldType::String,
            direction: Direction::Outgoing,
            transform: Some(NamedTransform::ExtractReasoningBlocks),
            remove_source: true,
        },
        MappingEntry {
            source_path: "finish_reason".to_string(),
            target_path: "finish_reason".to_string(),
            value_type: FieldType::String,
            direction: Direction::Outgoing,
            transform: Some(NamedTransform::NormalizeFinishReason),
            remove_source: true,
        },
    ])
}

fn gemini_mapping() -> MappingTable {
    MappingTable::new(vec![MappingEntry {
        source_path: "finishReason".to_string(),
        target_path: "finishReason".to_string(),
        value_type: FieldType::String,
        direction: Direction::Outgoing,
        transform: Some(NamedTransform::NormalizeFinishReason),
        remove_source: true,
    }])
}

/// Process-wide `max_tokens` default from `ROUTECODEX_DEFAULT_MAX_TOKENS`,
/// read once per call since it may change between test runs.
pub fn env_default_max_tokens() -> Option<u64> {
    std::env::var("ROUTECODEX_DEFAULT_MAX_TOKENS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// Applies the provider's incoming compat pass to an already-built upstream
/// request: tool-schema sanitization, field-name mappings, `max_tokens`
/// defaulting, and required beta headers. Mutates `req` in place.
pub fn apply_incoming(provider: &str, req: &mut UpstreamHttpRequest, env_max_tokens: Option<u64>) {
    let Some(adapter) = adapters().get(provider) else {
        return;
    };
    let Some(body) = req.body.as_ref() else {
        return;
    };
    let Ok(mut value) = serde_json::from_slice::<serde_json::Value>(body) else {
        return;
    };
    if adapter
        .process_incoming(&mut value, &mut req.headers, env_max_tokens)
        .is_err()
    {
        return;
    }
    if let Ok(encoded) = serde_json::to_vec(&value) {
        req.body = Some(Bytes::from(encoded));
    }
}

/// Applies the provider's outgoing compat pass (`reasoning`/`finish_reason`
/// normalization) to a raw provider JSON response body.
pub fn apply_outgoing(provider: &str, body: Bytes) -> Bytes {
    let Some(adapter) = adapters().get(provider) else {
        return body;
    };
    let Ok(mut value) = serde_json::from_slice::<serde_json::Value>(&body) else {
        return body;
    };
    if adapter.process_outgoing(&mut value).is_err() {
        return body;
    }
    match serde_json::to_vec(&value) {
        Ok(encoded) => Bytes::from(encoded),
        Err(_) => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routecodex_pipeline::HttpMethod;
    use serde_json::json;

    fn req_with_body(value: serde_json::Value) -> UpstreamHttpRequest {
        UpstreamHttpRequest {
            method: HttpMethod::Post,
            url: "https://example.invalid/v1/chat/completions".to_string(),
            headers: Vec::new(),
            body: Some(Bytes::from(serde_json::to_vec(&value).unwrap())),
            is_stream: false,
        }
    }

    #[test]
    fn incoming_sanitizes_tools_and_defaults_max_tokens() {
        let mut req = req_with_body(json!({
            "tools": [{"function": {"strict": true, "parameters": {"oneOf": []}}}]
        }));
        apply_incoming("openai", &mut req, None);

        let body: serde_json::Value = serde_json::from_slice(req.body.as_ref().unwrap()).unwrap();
        assert_eq!(body["max_tokens"], json!(8192));
        assert!(body["tools"][0]["function"].get("strict").is_none());
    }

    #[test]
    fn unknown_provider_leaves_body_untouched() {
        let mut req = req_with_body(json!({"a": 1}));
        let before = req.body.clone();
        apply_incoming("some_unregistered_provider", &mut req, None);
        assert_eq!(req.body, before);
    }

    #[test]
    fn codex_incoming_injects_responses_beta_header() {
        let mut req = req_with_body(json!({}));
        apply_incoming("codex", &mut req, None);
        assert_eq!(
            routecodex_pipeline::header_get(&req.headers, "openai-beta"),
            Some("responses-2024-12-17")
        );
    }

    #[test]
    fn outgoing_normalizes_deepseek_reasoning_and_finish_reason() {
        let body = Bytes::from(
            serde_json::to_vec(&json!({
                "reasoning_content": "because X",
                "finish_reason": "stop_sequence"
            }))
            .unwrap(),
        );
        let out = apply_outgoing("deepseek", body);
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["reasoning"]["content"][0]["text"], json!("because X"));
        assert_eq!(value["finish_reason"], json!("stop"));
    }

    #[test]
    fn outgoing_non_json_body_is_returned_unchanged() {
        let body = Bytes::from_static(b"not json");
        let out = apply_outgoing("openai", body.clone());
        assert_eq!(out, body);
    }
}
