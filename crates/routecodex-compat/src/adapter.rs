use routecodex_pipeline::Headers;
use routecodex_pipeline::header_set;
use serde_json::Value;

use crate::errors::CompatResult;
use crate::mapping::{Direction, MappingTable};
use crate::max_tokens::apply_max_tokens_default;
use crate::tools::sanitize_tool_schema;

/// Per-provider quirk knobs that aren't expressed as mapping-table entries:
/// beta headers to inject, and the `max_tokens` override cascade (spec §4.4).
#[derive(Debug, Clone, Default)]
pub struct CompatOptions {
    pub required_headers: Vec<(&'static str, &'static str)>,
    pub max_tokens_override: Option<u64>,
}

/// Holds all per-provider quirks so the Provider stage stays uniform.
/// Constructed once per provider at startup from a loaded [`MappingTable`];
/// `process_incoming`/`process_outgoing` run once per request on the way
/// down/up through the pipeline.
pub struct CompatAdapter {
    provider: &'static str,
    mapping: MappingTable,
    options: CompatOptions,
}

impl CompatAdapter {
    pub fn new(provider: &'static str, mapping: MappingTable, options: CompatOptions) -> Self {
        Self {
            provider,
            mapping,
            options,
        }
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    /// Sanitizes tool schemas, applies incoming field-name mappings, injects
    /// required beta headers, and resolves the `max_tokens` default cascade.
    pub fn process_incoming(
        &self,
        payload: &mut Value,
        headers: &mut Headers,
        env_max_tokens: Option<u64>,
    ) -> CompatResult<()> {
        sanitize_tool_schema(payload)?;
        self.mapping.apply(Direction::Incoming, payload)?;
        apply_max_tokens_default(payload, self.options.max_tokens_override, env_max_tokens);
        for (name, value) in &self.options.required_headers {
            header_set(headers, name, *value);
        }
        Ok(())
    }

    /// Applies outgoing field-name mappings (canonical `reasoning`,
    /// `finish_reason` normalization, model-name restoration). Tool-call
    /// argument repair is driven separately by the Provider stage, which
    /// knows the declared schema each call is being repaired against.
    pub fn process_outgoing(&self, payload: &mut Value) -> CompatResult<()> {
        self.mapping.apply(Direction::Outgoing, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{FieldType, MappingEntry};
    use crate::transform::NamedTransform;
    use serde_json::json;

    #[test]
    fn incoming_pass_injects_beta_header_and_sanitizes_tools() {
        let mapping = MappingTable::default();
        let options = CompatOptions {
            required_headers: vec![("openai-beta", "responses-2024-12-17")],
            max_tokens_override: None,
        };
        let adapter = CompatAdapter::new("openai_responses", mapping, options);

        let mut payload = json!({
            "tools": [{"function": {"strict": true, "parameters": {"oneOf": []}}}]
        });
        let mut headers = Headers::new();
        adapter
            .process_incoming(&mut payload, &mut headers, None)
            .unwrap();

        assert_eq!(payload["max_tokens"], json!(8192));
        assert!(payload["tools"][0]["function"].get("strict").is_none());
        assert_eq!(
            routecodex_pipeline::header_get(&headers, "openai-beta"),
            Some("responses-2024-12-17")
        );
    }

    #[test]
    fn outgoing_pass_normalizes_finish_reason() {
        let mapping = MappingTable::new(vec![MappingEntry {
            source_path: "finish_reason".to_string(),
            target_path: "finish_reason".to_string(),
            value_type: FieldType::String,
            direction: Direction::Outgoing,
            transform: Some(NamedTransform::NormalizeFinishReason),
            remove_source: true,
        }]);
        let adapter = CompatAdapter::new("glm", mapping, CompatOptions::default());
        let mut payload = json!({"finish_reason": "end_turn"});
        adapter.process_outgoing(&mut payload).unwrap();
        assert_eq!(payload["finish_reason"], json!("stop"));
    }
}
