//! JSON backend with gjson path queries.
//!
//! Paths use the gjson syntax: `a.b.c` keys, `items.0` indexes, `items.#`
//! length, `items.#.name` mapping, `items.#(id==2)` queries, `*`/`?`
//! wildcards, `|` pipes and `@` modifiers. An empty path is the node
//! itself. Nodes hold raw JSON text, so each query scans only its subtree.

use serde::de::IgnoredAny;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use super::Backend;
use crate::error::BackendResult;
use crate::value::json_text;

/// Node of a parsed JSON document; `None` is the zero node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JsonNode(Option<Arc<str>>);

impl JsonNode {
    pub fn new(value: JsonValue) -> Self {
        Self(Some(value.to_string().into()))
    }

    pub fn zero() -> Self {
        Self(None)
    }

    fn raw(json: &str) -> Self {
        Self(Some(json.into()))
    }

    /// Raw JSON text of the node.
    pub fn json(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Native form of the node.
    pub fn value(&self) -> Option<JsonValue> {
        self.json().and_then(|json| serde_json::from_str(json).ok())
    }
}

/// Backend for JSON documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBackend;

impl Backend for JsonBackend {
    type Node = JsonNode;

    fn name(&self) -> &'static str {
        "json"
    }

    fn parse(&self, bytes: &[u8]) -> BackendResult<JsonNode> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonNode::zero());
        }
        serde_json::from_slice::<IgnoredAny>(bytes)?;
        Ok(JsonNode::raw(std::str::from_utf8(bytes)?.trim()))
    }

    fn is_zero(&self, node: &JsonNode) -> bool {
        node.0.is_none()
    }

    fn query_one(&self, node: &JsonNode, path: &str) -> JsonNode {
        match node.json() {
            Some(_) if path.is_empty() => node.clone(),
            Some(json) => {
                let found = gjson::get(json, path);
                if found.exists() {
                    JsonNode::raw(found.json())
                } else {
                    JsonNode::zero()
                }
            }
            None => JsonNode::zero(),
        }
    }

    fn query_all(&self, node: &JsonNode, path: &str) -> Vec<JsonNode> {
        let Some(json) = self.query_one(node, path).0 else {
            return Vec::new();
        };
        let found = gjson::get(&json, "@this");
        match found.kind() {
            gjson::Kind::Array => found
                .array()
                .iter()
                .map(|item| JsonNode::raw(item.json()))
                .collect(),
            _ => vec![JsonNode(Some(json))],
        }
    }

    fn text(&self, node: &JsonNode) -> String {
        node.value().map(|value| json_text(&value)).unwrap_or_default()
    }
}

/// Run a gjson path query against a native JSON value.
pub fn query(value: &JsonValue, path: &str) -> Option<JsonValue> {
    if path.is_empty() || path == "@this" {
        return Some(value.clone());
    }
    let json = value.to_string();
    let found = gjson::get(&json, path);
    if !found.exists() {
        return None;
    }
    serde_json::from_str(found.json()).ok()
}
