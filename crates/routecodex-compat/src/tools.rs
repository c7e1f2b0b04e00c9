use serde_json::Value;

use crate::errors::{CompatError, CompatResult};

/// Sanitizes every declared tool's JSON schema in place so it survives
/// providers that reject schema shapes OpenAI/Anthropic clients commonly
/// send: `oneOf` unions some backends can't validate, a `shell.command`
/// parameter declared inconsistently as a string vs an array, and a
/// `strict` flag only OpenAI itself understands.
///
/// Accepts either an OpenAI-shaped `tools: [{function: {parameters}}]` array
/// or an Anthropic-shaped `tools: [{input_schema}]` array; whichever is
/// present is sanitized, the other is left untouched.
pub fn sanitize_tool_schema(payload: &mut Value) -> CompatResult<()> {
    let Some(tools) = payload.get_mut("tools").and_then(Value::as_array_mut) else {
        return Ok(());
    };
    for (index, tool) in tools.iter_mut().enumerate() {
        let Some(tool_obj) = tool.as_object_mut() else {
            return Err(CompatError::BadToolSchema { index });
        };
        if let Some(function) = tool_obj.get_mut("function").and_then(Value::as_object_mut) {
            function.remove("strict");
            if let Some(params) = function.get_mut("parameters") {
                sanitize_schema_node(params);
            }
        }
        if let Some(schema) = tool_obj.get_mut("input_schema") {
            sanitize_schema_node(schema);
        }
    }
    Ok(())
}

fn sanitize_schema_node(node: &mut Value) {
    let Some(obj) = node.as_object_mut() else {
        return;
    };
    obj.remove("oneOf");
    normalize_shell_command(obj);
    if let Some(props) = obj.get_mut("properties").and_then(Value::as_object_mut) {
        for value in props.values_mut() {
            sanitize_schema_node(value);
        }
    }
    if let Some(items) = obj.get_mut("items") {
        sanitize_schema_node(items);
    }
}

/// Some vendors declare `shell.command` as a bare `string`; the sandbox
/// executor and most clients expect `array<string>`. Force the declared
/// type so downstream argument repair (in the Provider stage's response
/// path) has a single shape to target.
fn normalize_shell_command(schema_obj: &mut serde_json::Map<String, Value>) {
    let Some(props) = schema_obj.get_mut("properties").and_then(Value::as_object_mut) else {
        return;
    };
    let Some(command) = props.get_mut("command").and_then(Value::as_object_mut) else {
        return;
    };
    if command.get("type").and_then(Value::as_str) == Some("string") {
        command.insert("type".to_string(), Value::String("array".to_string()));
        command.insert(
            "items".to_string(),
            serde_json::json!({ "type": "string" }),
        );
    }
}

/// Repairs a tool-call `arguments` value that arrived as a JSON-stringified
/// array when the declared schema says `array<string>` (join with single
/// spaces into the scalar a `string`-typed schema expects), or the reverse
/// (wrap a scalar into a one-element array). Mirrors the request-side
/// normalization `sanitize_tool_schema` enforces, applied to the upstream's
/// response instead.
pub fn repair_command_argument(declared_array: bool, value: Value) -> Value {
    match (declared_array, value) {
        (true, Value::String(raw)) => {
            if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&raw) {
                Value::Array(items)
            } else {
                Value::Array(
                    raw.split(',')
                        .map(|part| Value::String(part.trim().to_string()))
                        .collect(),
                )
            }
        }
        (false, Value::Array(items)) => {
            let joined = items
                .iter()
                .map(|v| v.as_str().unwrap_or_default().to_string())
                .collect::<Vec<_>>()
                .join(" ");
            Value::String(joined)
        }
        (_, other) => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_one_of_and_strict_and_normalizes_shell_command() {
        let mut payload = json!({
            "tools": [{
                "function": {
                    "name": "run_shell",
                    "strict": true,
                    "parameters": {
                        "oneOf": [{"type": "object"}],
                        "properties": {
                            "command": {"type": "string"}
                        }
                    }
                }
            }]
        });
        sanitize_tool_schema(&mut payload).unwrap();
        let function = &payload["tools"][0]["function"];
        assert!(function.get("strict").is_none());
        let params = &function["parameters"];
        assert!(params.get("oneOf").is_none());
        assert_eq!(params["properties"]["command"]["type"], json!("array"));
        assert_eq!(
            params["properties"]["command"]["items"]["type"],
            json!("string")
        );
    }

    #[test]
    fn repair_command_argument_parses_stringified_array() {
        let out = repair_command_argument(true, json!("[\"ls\", \"-la\"]"));
        assert_eq!(out, json!(["ls", "-la"]));
    }

    #[test]
    fn repair_command_argument_joins_array_into_string() {
        let out = repair_command_argument(false, json!(["ls", "-la"]));
        assert_eq!(out, json!("ls -la"));
    }
}
