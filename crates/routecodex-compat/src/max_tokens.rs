use serde_json::Value;

/// `max_tokens` default cascade: the client's own request value wins; else
/// the provider's configured override; else the process-wide environment
/// default; else the hardcoded floor.
pub const DEFAULT_MAX_TOKENS: u64 = 8192;

pub fn apply_max_tokens_default(
    payload: &mut Value,
    config_override: Option<u64>,
    env_default: Option<u64>,
) {
    let Some(obj) = payload.as_object_mut() else {
        return;
    };
    if obj.get("max_tokens").and_then(Value::as_u64).is_some() {
        return;
    }
    let resolved = config_override
        .or(env_default)
        .unwrap_or(DEFAULT_MAX_TOKENS);
    obj.insert("max_tokens".to_string(), Value::from(resolved));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_value_wins_over_everything() {
        let mut payload = json!({"max_tokens": 128});
        apply_max_tokens_default(&mut payload, Some(4096), Some(2048));
        assert_eq!(payload["max_tokens"], json!(128));
    }

    #[test]
    fn config_override_wins_over_env_and_floor() {
        let mut payload = json!({});
        apply_max_tokens_default(&mut payload, Some(4096), Some(2048));
        assert_eq!(payload["max_tokens"], json!(4096));
    }

    #[test]
    fn falls_back_to_hardcoded_floor() {
        let mut payload = json!({});
        apply_max_tokens_default(&mut payload, None, None);
        assert_eq!(payload["max_tokens"], json!(DEFAULT_MAX_TOKENS));
    }
}
