//! Resource representations returned by collection endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single resource as returned by the server.
///
/// Collections declare arbitrary fields per kind, so resources stay as raw
/// JSON with typed accessors for the fields the client relies on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource(pub Value);

impl Resource {
    /// Server identifier, stringified. Ids arrive as JSON numbers or strings
    /// depending on the collection.
    pub fn id(&self) -> Option<String> {
        id_string(self.0.get("id")?)
    }

    /// Template/image resources are identified by `guid` rather than `id`.
    pub fn guid(&self) -> Option<String> {
        id_string(self.0.get("guid")?)
    }

    /// Raw attribute access.
    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// String attribute access.
    pub fn str_attr(&self, name: &str) -> Option<&str> {
        self.0.get(name)?.as_str()
    }

    /// String attribute with a placeholder for display.
    pub fn display_attr(&self, name: &str) -> String {
        match self.0.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "-".to_string(),
            Some(other) => other.to_string(),
        }
    }
}

/// Stringify an identifier value.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extract the id of the first entry in an action response's `results`
/// array, falling back to a top-level `id`.
pub fn first_result_id(value: &Value) -> Option<String> {
    if let Some(results) = value.get("results").and_then(Value::as_array) {
        return id_string(results.first()?.get("id")?);
    }
    id_string(value.get("id")?)
}

/// Extract the spawned task id from an action response.
pub fn task_id(value: &Value) -> Option<String> {
    if let Some(id) = value.get("task_id") {
        return id_string(id);
    }
    let results = value.get("results").and_then(Value::as_array)?;
    id_string(results.first()?.get("task_id")?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_handles_numbers_and_strings() {
        assert_eq!(
            Resource(json!({"id": 42})).id(),
            Some("42".to_string())
        );
        assert_eq!(
            Resource(json!({"id": "1000000000042"})).id(),
            Some("1000000000042".to_string())
        );
        assert_eq!(Resource(json!({"name": "x"})).id(), None);
    }

    #[test]
    fn task_id_found_in_results() {
        let body = json!({"results": [{"success": true, "task_id": 77}]});
        assert_eq!(task_id(&body), Some("77".to_string()));

        let body = json!({"success": true, "task_id": "78"});
        assert_eq!(task_id(&body), Some("78".to_string()));
    }

    #[test]
    fn first_result_id_prefers_results_array() {
        let body = json!({"results": [{"id": 5}], "id": 9});
        assert_eq!(first_result_id(&body), Some("5".to_string()));
    }
}
