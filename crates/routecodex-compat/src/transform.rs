use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// A named, stateless transform a mapping entry can request applied to the
/// value on its way from `source_path` to `target_path`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NamedTransform {
    Timestamp,
    Lowercase,
    Uppercase,
    NormalizeModelName,
    ExtractReasoningBlocks,
    NormalizeFinishReason,
}

impl NamedTransform {
    pub fn apply(self, value: Value) -> Value {
        match self {
            NamedTransform::Timestamp => timestamp(value),
            NamedTransform::Lowercase => string_case(value, str::to_lowercase),
            NamedTransform::Uppercase => string_case(value, str::to_uppercase),
            NamedTransform::NormalizeModelName => normalize_model_name(value),
            NamedTransform::ExtractReasoningBlocks => extract_reasoning_blocks(value),
            NamedTransform::NormalizeFinishReason => normalize_finish_reason(value),
        }
    }
}

fn timestamp(value: Value) -> Value {
    if let Some(secs) = value.as_i64() {
        if let Ok(dt) = OffsetDateTime::from_unix_timestamp(secs)
            && let Ok(text) = dt.format(&Rfc3339)
        {
            return Value::String(text);
        }
    }
    value
}

fn string_case(value: Value, f: fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(&s)),
        other => other,
    }
}

/// Strips vendor prefixes (`qwen/`, `models/`, `openai:`) so the client
/// always sees the bare model name it asked for, regardless of how the
/// upstream echoed it back.
fn normalize_model_name(value: Value) -> Value {
    let Value::String(name) = value else {
        return value;
    };
    let stripped = name
        .strip_prefix("models/")
        .or_else(|| name.split_once('/').map(|(_, rest)| rest))
        .or_else(|| name.split_once(':').map(|(_, rest)| rest))
        .unwrap_or(&name);
    Value::String(stripped.to_string())
}

/// Folds a `reasoning_content` string (DeepSeek/GLM style) into the
/// canonical `{reasoning: {content: [...]}}` shape used internally.
fn extract_reasoning_blocks(value: Value) -> Value {
    match value {
        Value::String(text) if !text.is_empty() => serde_json::json!({
            "content": [{ "type": "text", "text": text }],
        }),
        other => other,
    }
}

/// Collapses vendor-specific finish-reason aliases onto the OpenAI set.
fn normalize_finish_reason(value: Value) -> Value {
    let Value::String(reason) = value else {
        return value;
    };
    let canonical = match reason.as_str() {
        "max_tokens" | "length" | "MAX_TOKENS" => "length",
        "stop" | "stop_sequence" | "end_turn" | "STOP" => "stop",
        "tool_calls" | "tool_use" | "function_call" => "tool_calls",
        "content_filter" | "SAFETY" | "RECITATION" => "content_filter",
        other => other,
    };
    Value::String(canonical.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_model_name_strips_vendor_prefix() {
        assert_eq!(
            NamedTransform::NormalizeModelName.apply(json!("qwen/qwen-max")),
            json!("qwen-max")
        );
        assert_eq!(
            NamedTransform::NormalizeModelName.apply(json!("models/gemini-2.5-pro")),
            json!("gemini-2.5-pro")
        );
        assert_eq!(
            NamedTransform::NormalizeModelName.apply(json!("gpt-4o")),
            json!("gpt-4o")
        );
    }

    #[test]
    fn normalize_finish_reason_collapses_aliases() {
        assert_eq!(
            NamedTransform::NormalizeFinishReason.apply(json!("end_turn")),
            json!("stop")
        );
        assert_eq!(
            NamedTransform::NormalizeFinishReason.apply(json!("MAX_TOKENS")),
            json!("length")
        );
    }

    #[test]
    fn extract_reasoning_blocks_wraps_plain_text() {
        let out = NamedTransform::ExtractReasoningBlocks.apply(json!("because X"));
        assert_eq!(out["content"][0]["text"], json!("because X"));
    }
}
