// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! JSON parsing for ChatGPT conversation exports.
//!
//! This module handles deserialization of the `conversations.json` file
//! produced by ChatGPT's data-export feature. Each conversation is stored as
//! a parent-linked node graph rather than a flat message list: a `mapping`
//! object keys node ids to nodes, each node carries an optional message and
//! an optional parent id, and `current_node` points at the leaf of the
//! conversation path the user last saw.
//!
//! # Format Overview
//!
//! The top level is either a JSON array of conversation records or an object
//! mapping conversation ids to records -- both shapes occur in the wild and
//! both are accepted. Within a conversation:
//!
//! - `mapping` is an object of node-id to node
//! - a node may have no `message` at all (tree artifacts such as the root)
//! - message content carries `parts` (text fragments) and, for reasoning
//!   models, `thoughts`
//!
//! Exports are schema-drifty, so every field is optional here and defaults
//! to an empty-equivalent value. Graph integrity is *not* validated at load
//! time; that is deferred to extraction.
//!
//! # Example
//!
//! ```
//! use cg2md::parser::parse_export;
//!
//! let json = r#"[{
//!     "id": "conv-1",
//!     "title": "Greetings",
//!     "current_node": "a",
//!     "mapping": {
//!         "a": { "id": "a", "message": { "author": { "role": "user" },
//!                                        "content": { "parts": ["hi"] } } }
//!     }
//! }]"#;
//!
//! let convs = parse_export(json).unwrap();
//! assert_eq!(convs.len(), 1);
//! assert_eq!(convs[0].title, "Greetings");
//! ```

use serde::Deserialize;
use snafu::prelude::*;
use std::collections::BTreeMap;

/// Error type for export parsing failures.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// Failed to parse JSON content.
    #[snafu(display("failed to parse JSON: {source}"))]
    Json {
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },

    /// The top-level JSON value was neither an array nor an object.
    #[snafu(display(
        "export must be a JSON array or object of conversation records, got {shape}"
    ))]
    Format {
        /// The JSON shape that was actually found.
        shape: &'static str,
    },
}

/// One exported conversation: metadata plus the node graph.
///
/// Owned entirely by the load step and immutable afterwards. The `mapping`
/// is the arena every traversal works against; nodes are reached by id
/// lookup, never by pointer chasing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Conversation {
    /// The conversation id.
    pub id: String,

    /// The user-visible conversation title. May be empty.
    pub title: String,

    /// Unix timestamp (seconds) when the conversation was created.
    pub create_time: Option<f64>,

    /// Unix timestamp (seconds) of the last update.
    pub update_time: Option<f64>,

    /// Id of the leaf node of the conversation path the user last saw.
    ///
    /// Absent in some exports; a conversation without a current node simply
    /// yields no messages under the chain-walk strategy.
    pub current_node: Option<String>,

    /// The custom-GPT template this conversation was held with, if any.
    ///
    /// `None` means the stock assistant. The [`crate::group`] module maps
    /// template ids to display names.
    pub conversation_template_id: Option<String>,

    /// The node graph, keyed by node id.
    ///
    /// A `BTreeMap` so that whole-mapping iteration (the timestamp-sort
    /// extraction strategy, the model-slug scan) is deterministic.
    pub mapping: BTreeMap<String, Node>,
}

impl Conversation {
    /// The timestamp used for chronological ordering between conversations:
    /// `update_time`, falling back to `create_time`, falling back to 0.
    #[must_use]
    pub fn last_activity(&self) -> f64 {
        self.update_time.or(self.create_time).unwrap_or(0.0)
    }
}

/// One entry in a conversation's parent-linked node graph.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    /// The node id. Falls back to the mapping key when the record has none.
    pub id: String,

    /// Id of the parent node. `None` at the root. Empty-string parents in
    /// the raw data are normalized to `None`.
    pub parent: Option<String>,

    /// The message carried by this node, if any. Tree artifacts such as the
    /// root node have none.
    pub message: Option<Message>,
}

/// A single message within a conversation node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message {
    /// The author role: `"user"`, `"assistant"`, `"system"`, `"tool"`, or
    /// anything a future export invents. Empty when absent.
    pub role: String,

    /// The content type: `"text"`, `"thoughts"`, or other. Empty when absent.
    pub content_type: String,

    /// Ordered text fragments of the message. Non-string fragments in the
    /// raw data (image pointers and the like) are dropped at parse time.
    pub parts: Vec<String>,

    /// Reasoning fragments for `"thoughts"` content, in order.
    pub thoughts: Vec<String>,

    /// Unix timestamp (seconds) when the message was created.
    pub create_time: Option<f64>,

    /// Unix timestamp (seconds) of the last update to the message.
    pub update_time: Option<f64>,

    /// The model slug recorded in the message metadata, when present.
    pub model_slug: Option<String>,
}

impl Message {
    /// The timestamp used for ordering: `create_time`, falling back to
    /// `update_time`, falling back to 0.
    #[must_use]
    pub fn timestamp(&self) -> f64 {
        self.create_time.or(self.update_time).unwrap_or(0.0)
    }
}

impl<'de> Deserialize<'de> for Conversation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        let mut mapping = BTreeMap::new();
        if let Some(nodes) = value.get("mapping").and_then(|m| m.as_object()) {
            for (id, raw) in nodes {
                // Exports are known to contain non-object junk entries.
                if !raw.is_object() {
                    continue;
                }
                if let Ok(mut node) = serde_json::from_value::<Node>(raw.clone()) {
                    if node.id.is_empty() {
                        node.id.clone_from(id);
                    }
                    mapping.insert(id.clone(), node);
                }
            }
        }

        Ok(Self {
            id: get_string(&value, &["id"]).unwrap_or_default(),
            title: get_string(&value, &["title"]).unwrap_or_default(),
            create_time: get_f64(&value, &["create_time"]),
            update_time: get_f64(&value, &["update_time"]),
            current_node: get_string(&value, &["current_node"]).filter(|s| !s.is_empty()),
            conversation_template_id: get_string(&value, &["conversation_template_id"])
                .filter(|s| !s.is_empty()),
            mapping,
        })
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        let message = value
            .get("message")
            .filter(|m| m.is_object())
            .and_then(|m| serde_json::from_value(m.clone()).ok());

        Ok(Self {
            id: get_string(&value, &["id"]).unwrap_or_default(),
            parent: get_string(&value, &["parent"]).filter(|s| !s.is_empty()),
            message,
        })
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        let parts = value
            .get("content")
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.as_str())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        let thoughts = value
            .get("content")
            .and_then(|c| c.get("thoughts"))
            .and_then(|t| t.as_array())
            .map(|thoughts| {
                thoughts
                    .iter()
                    .filter_map(|th| get_string(th, &["content"]))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            role: get_string(&value, &["author", "role"]).unwrap_or_default(),
            content_type: get_string(&value, &["content", "content_type"]).unwrap_or_default(),
            parts,
            thoughts,
            create_time: get_f64(&value, &["create_time"]),
            update_time: get_f64(&value, &["update_time"]),
            model_slug: get_string(&value, &["metadata", "model_slug"]),
        })
    }
}

/// Navigates a JSON path and returns the string value at the end.
fn get_str<'a>(value: &'a serde_json::Value, path: &[&str]) -> Option<&'a str> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_str()
}

/// Like [`get_str`] but returns an owned `String`.
fn get_string(value: &serde_json::Value, path: &[&str]) -> Option<String> {
    get_str(value, path).map(str::to_owned)
}

/// Navigates a JSON path and returns the number at the end as `f64`.
fn get_f64(value: &serde_json::Value, path: &[&str]) -> Option<f64> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_f64()
}

/// Names the JSON shape of a value, for error messages.
const fn json_shape(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Parses a raw export file into a list of [`Conversation`]s.
///
/// Accepts both top-level shapes ChatGPT has shipped: an array of
/// conversation records, or an object mapping conversation ids to records
/// (values taken in map order).
///
/// # Errors
///
/// Returns [`ParseError::Json`] when the input is not valid JSON, and
/// [`ParseError::Format`] when the top-level value is neither an array nor
/// an object.
pub fn parse_export(json_str: &str) -> Result<Vec<Conversation>, ParseError> {
    let value: serde_json::Value = serde_json::from_str(json_str).context(JsonSnafu)?;

    let records: Vec<serde_json::Value> = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        other => {
            return FormatSnafu {
                shape: json_shape(&other),
            }
            .fail();
        }
    };

    records
        .into_iter()
        .map(|record| serde_json::from_value(record).context(JsonSnafu))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_conversation_json(body: &str) -> String {
        format!("[{{{body}}}]")
    }

    #[test]
    fn parses_array_export() {
        let json = r#"[{"id": "c1", "title": "First"}, {"id": "c2", "title": "Second"}]"#;
        let convs = parse_export(json).unwrap();

        assert_eq!(convs.len(), 2);
        assert_eq!(convs[0].id, "c1");
        assert_eq!(convs[1].title, "Second");
    }

    #[test]
    fn parses_object_export() {
        let json = r#"{"c1": {"id": "c1", "title": "First"}}"#;
        let convs = parse_export(json).unwrap();

        assert_eq!(convs.len(), 1);
        assert_eq!(convs[0].title, "First");
    }

    #[test]
    fn rejects_scalar_top_level() {
        let err = parse_export("42").unwrap_err();
        assert!(matches!(err, ParseError::Format { shape: "a number" }));

        let err = parse_export(r#""hello""#).unwrap_err();
        assert!(matches!(err, ParseError::Format { shape: "a string" }));
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(matches!(
            parse_export("not json").unwrap_err(),
            ParseError::Json { .. }
        ));
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let convs = parse_export("[{}]").unwrap();

        assert_eq!(convs[0].id, "");
        assert_eq!(convs[0].title, "");
        assert!(convs[0].create_time.is_none());
        assert!(convs[0].current_node.is_none());
        assert!(convs[0].conversation_template_id.is_none());
        assert!(convs[0].mapping.is_empty());
    }

    #[test]
    fn parses_mapping_nodes() {
        let json = single_conversation_json(
            r#"
            "current_node": "b",
            "mapping": {
                "a": { "id": "a" },
                "b": { "id": "b", "parent": "a",
                       "message": { "author": { "role": "user" },
                                    "content": { "content_type": "text",
                                                 "parts": ["hello"] },
                                    "create_time": 1700000000.5 } }
            }"#,
        );
        let convs = parse_export(&json).unwrap();
        let node = &convs[0].mapping["b"];

        assert_eq!(node.parent.as_deref(), Some("a"));
        let msg = node.message.as_ref().unwrap();
        assert_eq!(msg.role, "user");
        assert_eq!(msg.content_type, "text");
        assert_eq!(msg.parts, vec!["hello"]);
        assert_eq!(msg.create_time, Some(1_700_000_000.5));
    }

    #[test]
    fn ignores_non_string_parts() {
        let json = single_conversation_json(
            r#"
            "mapping": {
                "a": { "message": { "author": { "role": "user" },
                                    "content": { "parts": ["text", {"asset": "img"}, 7] } } }
            }"#,
        );
        let convs = parse_export(&json).unwrap();
        let msg = convs[0].mapping["a"].message.as_ref().unwrap();

        assert_eq!(msg.parts, vec!["text"]);
    }

    #[test]
    fn parses_thoughts_content() {
        let json = single_conversation_json(
            r#"
            "mapping": {
                "a": { "message": { "author": { "role": "assistant" },
                                    "content": { "content_type": "thoughts",
                                                 "thoughts": [ {"content": "first"},
                                                               {"content": "second"},
                                                               {"summary": "no content"} ] } } }
            }"#,
        );
        let convs = parse_export(&json).unwrap();
        let msg = convs[0].mapping["a"].message.as_ref().unwrap();

        assert_eq!(msg.thoughts, vec!["first", "second"]);
    }

    #[test]
    fn parses_model_slug_from_metadata() {
        let json = single_conversation_json(
            r#"
            "mapping": {
                "a": { "message": { "metadata": { "model_slug": "gpt-4o" } } }
            }"#,
        );
        let convs = parse_export(&json).unwrap();
        let msg = convs[0].mapping["a"].message.as_ref().unwrap();

        assert_eq!(msg.model_slug.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn skips_non_object_mapping_entries() {
        let json = single_conversation_json(
            r#"
            "mapping": { "a": { "id": "a" }, "junk": 17, "more": "junk" }"#,
        );
        let convs = parse_export(&json).unwrap();

        assert_eq!(convs[0].mapping.len(), 1);
        assert!(convs[0].mapping.contains_key("a"));
    }

    #[test]
    fn node_id_falls_back_to_mapping_key() {
        let json = single_conversation_json(r#""mapping": { "xyz": {} }"#);
        let convs = parse_export(&json).unwrap();

        assert_eq!(convs[0].mapping["xyz"].id, "xyz");
    }

    #[test]
    fn normalizes_empty_current_node_and_parent() {
        let json = single_conversation_json(
            r#"
            "current_node": "",
            "mapping": { "a": { "parent": "" } }"#,
        );
        let convs = parse_export(&json).unwrap();

        assert!(convs[0].current_node.is_none());
        assert!(convs[0].mapping["a"].parent.is_none());
    }

    #[test]
    fn null_message_is_absent() {
        let json = single_conversation_json(r#""mapping": { "a": { "message": null } }"#);
        let convs = parse_export(&json).unwrap();

        assert!(convs[0].mapping["a"].message.is_none());
    }

    #[test]
    fn message_timestamp_prefers_create_time() {
        let msg = Message {
            create_time: Some(10.0),
            update_time: Some(20.0),
            ..Default::default()
        };
        assert!((msg.timestamp() - 10.0).abs() < f64::EPSILON);

        let msg = Message {
            update_time: Some(20.0),
            ..Default::default()
        };
        assert!((msg.timestamp() - 20.0).abs() < f64::EPSILON);

        assert!(Message::default().timestamp().abs() < f64::EPSILON);
    }

    #[test]
    fn last_activity_prefers_update_time() {
        let conv = Conversation {
            create_time: Some(5.0),
            update_time: Some(9.0),
            ..Default::default()
        };
        assert!((conv.last_activity() - 9.0).abs() < f64::EPSILON);

        let conv = Conversation {
            create_time: Some(5.0),
            ..Default::default()
        };
        assert!((conv.last_activity() - 5.0).abs() < f64::EPSILON);
    }
}
