use serde_json::Value;

/// Reads a dotted path (`a.b.c`) out of a JSON value. Array indices are not
/// supported; mapping tables only ever address object fields.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Writes `new_value` at a dotted path, creating intermediate objects as
/// needed. Fails only if an intermediate segment already holds a non-object,
/// non-null value.
pub fn set_path(value: &mut Value, path: &str, new_value: Value) -> Result<(), ()> {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return Err(());
    };
    let mut current = value;
    for segment in parents {
        if current.is_null() {
            *current = Value::Object(serde_json::Map::new());
        }
        let Some(map) = current.as_object_mut() else {
            return Err(());
        };
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
    if current.is_null() {
        *current = Value::Object(serde_json::Map::new());
    }
    let Some(map) = current.as_object_mut() else {
        return Err(());
    };
    map.insert(last.to_string(), new_value);
    Ok(())
}

/// Removes and returns the value at a dotted path, if present.
pub fn take_path(value: &mut Value, path: &str) -> Option<Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = segments.split_last()?;
    let mut current = value;
    for segment in parents {
        current = current.as_object_mut()?.get_mut(*segment)?;
    }
    current.as_object_mut()?.remove(*last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_path_creates_intermediate_objects() {
        let mut value = json!({});
        set_path(&mut value, "usage.input_tokens", json!(12)).unwrap();
        assert_eq!(value, json!({"usage": {"input_tokens": 12}}));
    }

    #[test]
    fn get_path_reads_nested_field() {
        let value = json!({"a": {"b": {"c": 3}}});
        assert_eq!(get_path(&value, "a.b.c"), Some(&json!(3)));
        assert_eq!(get_path(&value, "a.x.c"), None);
    }

    #[test]
    fn take_path_removes_and_returns() {
        let mut value = json!({"a": {"b": 1}});
        let taken = take_path(&mut value, "a.b");
        assert_eq!(taken, Some(json!(1)));
        assert_eq!(value, json!({"a": {}}));
    }
}
