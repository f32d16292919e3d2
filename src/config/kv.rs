// ABOUTME: Parsing for repeated NAME=VALUE command-line arguments.
// ABOUTME: Shared by --env and --build-arg.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// Parse `NAME=VALUE` pairs; later duplicates win. The value may itself contain `=`.
pub fn parse_kv_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<HashMap<String, String>> {
    let mut map = HashMap::with_capacity(pairs.len());

    for pair in pairs {
        let pair = pair.as_ref();
        let (name, value) = pair
            .split_once('=')
            .filter(|(name, _)| !name.is_empty())
            .ok_or_else(|| Error::InvalidKeyValue(pair.to_string()))?;
        map.insert(name.to_string(), value.to_string());
    }

    Ok(map)
}
