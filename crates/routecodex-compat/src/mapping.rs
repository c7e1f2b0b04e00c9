use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{CompatError, CompatResult};
use crate::path::{get_path, set_path, take_path};
use crate::transform::NamedTransform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Applied to the request on its way to the upstream.
    Incoming,
    /// Applied to the response on its way back to the client.
    Outgoing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Bool,
    Array,
    Object,
    Any,
}

impl FieldType {
    fn matches(self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Bool => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
            FieldType::Any => true,
        }
    }
}

/// One field-rename/reshape rule, as loaded from a provider's mapping-table
/// configuration at startup. `source_path` and `target_path` are dotted
/// object paths (`usage.prompt_tokens`); `transform` is optional and applied
/// to the value after it's read from `source_path`, before it's written to
/// `target_path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingEntry {
    pub source_path: String,
    pub target_path: String,
    #[serde(rename = "type")]
    pub value_type: FieldType,
    pub direction: Direction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<NamedTransform>,
    /// When true, the source field is removed after being copied to its
    /// target (a rename); when false, it is left in place (a projection).
    #[serde(default = "default_true")]
    pub remove_source: bool,
}

fn default_true() -> bool {
    true
}

/// An ordered set of field mappings for one provider adapter and one
/// direction pass. Entries apply in declaration order, so a later entry can
/// depend on an earlier one having already moved its field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingTable {
    pub entries: Vec<MappingEntry>,
}

impl MappingTable {
    pub fn new(entries: Vec<MappingEntry>) -> Self {
        Self { entries }
    }

    pub fn apply(&self, direction: Direction, value: &mut Value) -> CompatResult<()> {
        for entry in self.entries.iter().filter(|e| e.direction == direction) {
            let Some(found) = get_path(value, &entry.source_path) else {
                continue;
            };
            if !entry.value_type.matches(found) {
                continue;
            }
            let mut moved = if entry.remove_source {
                take_path(value, &entry.source_path)
                    .expect("presence already checked by get_path above")
            } else {
                found.clone()
            };
            if let Some(transform) = entry.transform {
                moved = transform.apply(moved);
            }
            set_path(value, &entry.target_path, moved).map_err(|()| CompatError::BadPath {
                source_path: entry.source_path.clone(),
                target_path: entry.target_path.clone(),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renames_field_and_drops_source() {
        let table = MappingTable::new(vec![MappingEntry {
            source_path: "max_tokens".to_string(),
            target_path: "maxTokens".to_string(),
            value_type: FieldType::Number,
            direction: Direction::Incoming,
            transform: None,
            remove_source: true,
        }]);
        let mut value = json!({"max_tokens": 256});
        table.apply(Direction::Incoming, &mut value).unwrap();
        assert_eq!(value, json!({"maxTokens": 256}));
    }

    #[test]
    fn projection_keeps_source_field() {
        let table = MappingTable::new(vec![MappingEntry {
            source_path: "model".to_string(),
            target_path: "snapshot_model".to_string(),
            value_type: FieldType::String,
            direction: Direction::Outgoing,
            transform: None,
            remove_source: false,
        }]);
        let mut value = json!({"model": "gpt-4o"});
        table.apply(Direction::Outgoing, &mut value).unwrap();
        assert_eq!(value["model"], json!("gpt-4o"));
        assert_eq!(value["snapshot_model"], json!("gpt-4o"));
    }

    #[test]
    fn skips_entry_when_type_does_not_match() {
        let table = MappingTable::new(vec![MappingEntry {
            source_path: "model".to_string(),
            target_path: "model_id".to_string(),
            value_type: FieldType::Number,
            direction: Direction::Incoming,
            transform: None,
            remove_source: true,
        }]);
        let mut value = json!({"model": "gpt-4o"});
        table.apply(Direction::Incoming, &mut value).unwrap();
        assert_eq!(value, json!({"model": "gpt-4o"}));
    }
}
