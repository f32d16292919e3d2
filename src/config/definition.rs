// ABOUTME: Raw app definition carried alongside the typed config.
// ABOUTME: The platform receives the document as written, plus CLI env overrides.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Definition(Map<String, Value>);

impl Definition {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn from_yaml(document: &serde_yaml::Value) -> Result<Self> {
        match serde_json::to_value(document) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(Value::Null) => Ok(Self::default()),
            Ok(_) => Err(Error::InvalidConfig(
                "top level of the config must be a mapping".to_string(),
            )),
            Err(e) => Err(Error::InvalidConfig(e.to_string())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Merge variables into the definition's `env` mapping, replacing same-named keys.
    pub fn merge_env(&mut self, vars: &HashMap<String, String>) {
        let env = self
            .0
            .entry("env")
            .or_insert_with(|| Value::Object(Map::new()));

        if !env.is_object() {
            *env = Value::Object(Map::new());
        }

        if let Value::Object(env) = env {
            for (k, v) in vars {
                env.insert(k.clone(), Value::String(v.clone()));
            }
        }
    }
}
