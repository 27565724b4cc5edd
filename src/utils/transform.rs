use serde_json::{Map, Value, json};

pub const CUSTOM_FIELD_PREFIX: &str = "cf_";

/// Set `field` to `value` on an object record. Non-object records are wrapped
/// as `{ "value": <record> }` first so the field always lands.
pub fn add_field(record: Value, field: &str, value: Value) -> Value {
    let mut obj = match record {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };
    obj.insert(field.to_string(), value);
    Value::Object(obj)
}

/// Collect top-level `cf_*` attributes into a `custom_fields` list of
/// `{name, value}` pairs. The original attributes are kept.
pub fn collect_custom_fields(record: Value) -> Value {
    let mut obj = match record {
        Value::Object(map) => map,
        other => return other,
    };
    let custom: Vec<Value> = obj
        .iter()
        .filter(|(k, _)| k.starts_with(CUSTOM_FIELD_PREFIX))
        .map(|(k, v)| json!({ "name": k, "value": v }))
        .collect();
    obj.insert("custom_fields".to_string(), Value::Array(custom));
    Value::Object(obj)
}
