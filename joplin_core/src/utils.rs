// src/utils.rs
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::ConnectorError;

/// Build a CallToolResult carrying a human-readable text rendering.
pub fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

/// Build a CallToolResult that carries structured JSON for machine-readable
/// clients. Lists are wrapped in an `{items, count}` envelope matching the
/// Joplin API's own list shape; objects pass through as-is.
pub fn structured_result<T: Serialize>(data: &T) -> Result<CallToolResult, ConnectorError> {
    let value = serde_json::to_value(data).map_err(|e| ConnectorError::Other(e.to_string()))?;

    let map: JsonMap<String, JsonValue> = match value {
        JsonValue::Object(map) => map,
        JsonValue::Array(items) => {
            let mut map = JsonMap::new();
            map.insert("count".to_string(), JsonValue::from(items.len()));
            map.insert("items".to_string(), JsonValue::Array(items));
            map
        }
        other => {
            let mut map = JsonMap::new();
            map.insert("data".to_string(), other);
            map
        }
    };

    Ok(CallToolResult {
        content: Vec::new(),
        structured_content: Some(JsonValue::Object(map)),
        is_error: Some(false),
        meta: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn arrays_get_an_items_envelope() {
        let result = structured_result(&json!([{"id": "a"}])).unwrap();
        let structured = result.structured_content.unwrap();
        assert_eq!(structured["count"], 1);
        assert_eq!(structured["items"][0]["id"], "a");
    }

    #[test]
    fn objects_pass_through() {
        let result = structured_result(&json!({"id": "a", "title": "t"})).unwrap();
        let structured = result.structured_content.unwrap();
        assert_eq!(structured["id"], "a");
        assert_eq!(structured["title"], "t");
    }
}
