// ABOUTME: Opaque runtime configuration payload carried by a request.
// ABOUTME: Serialized to text for the facade; can be flattened into .NET appconfig env vars.

use serde::Deserialize;
use serde_json::Value;

use super::RequestError;
use super::piped::EnvEntry;

/// Structured runtime configuration, passed to the backend as text.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RuntimeConfig(Option<Value>);

impl RuntimeConfig {
    pub fn new(value: Value) -> Self {
        RuntimeConfig(Some(value))
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(Value::Object(map)) => map.is_empty(),
            Some(_) => false,
        }
    }

    /// Textual form handed to the facade.
    ///
    /// An absent payload becomes the empty string; a string payload is passed
    /// through untouched; anything else is compact JSON.
    pub fn to_text(&self) -> String {
        match &self.0 {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(value) => value.to_string(),
        }
    }
}

/// Flatten a runtime config text into `Section__Key` environment entries.
///
/// Nested objects join their keys with `__`; arrays use the element index as
/// the key, matching how .NET configuration binds environment variables.
pub fn appconfig_env(text: &str) -> Result<Vec<EnvEntry>, RequestError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value =
        serde_json::from_str(text).map_err(|e| RequestError::InvalidRuntimeConfig(e.to_string()))?;
    if !value.is_object() {
        return Err(RequestError::InvalidRuntimeConfig(
            "appconfig must be a JSON object".to_string(),
        ));
    }

    let mut out = Vec::new();
    flatten(None, &value, &mut out);
    Ok(out)
}

fn flatten(prefix: Option<&str>, value: &Value, out: &mut Vec<EnvEntry>) {
    let join = |key: &str| match prefix {
        Some(p) => format!("{}__{}", p, key),
        None => key.to_string(),
    };

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten(Some(&join(key)), child, out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten(Some(&join(&index.to_string())), child, out);
            }
        }
        scalar => {
            let Some(key) = prefix else { return };
            let value = match scalar {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            out.push(EnvEntry {
                key: key.to_string(),
                value,
            });
        }
    }
}
