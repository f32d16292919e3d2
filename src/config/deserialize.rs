// ABOUTME: Custom serde deserializers for config maps.
// ABOUTME: Lets env and build args be written as bare YAML/JSON scalars.

use serde::Deserialize;
use std::collections::HashMap;

/// A map value as it may appear in the document: `PORT: 8080` is as valid as `PORT: "8080"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarValue {
    String(String),
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl From<ScalarValue> for String {
    fn from(value: ScalarValue) -> Self {
        match value {
            ScalarValue::String(s) => s,
            ScalarValue::Bool(b) => b.to_string(),
            ScalarValue::Int(n) => n.to_string(),
            ScalarValue::UInt(n) => n.to_string(),
            ScalarValue::Float(n) => n.to_string(),
        }
    }
}

pub fn deserialize_string_map<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: HashMap<String, ScalarValue> = HashMap::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .map(|(key, value)| (key, String::from(value)))
        .collect())
}
