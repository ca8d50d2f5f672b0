// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Grouping conversations into per-persona buckets.
//!
//! A conversation's `conversation_template_id` identifies the custom-GPT
//! persona it was held with. [`PersonaMap`] translates template ids to
//! display names; [`group_conversations`] buckets conversations by that
//! name and sorts each bucket chronologically.
//!
//! The 1-based index a conversation gets within its bucket is positional
//! and recomputed from scratch every run. Adding conversations to an export
//! and re-running can therefore renumber (and so rename) every existing
//! output file for that persona. That is accepted behavior for a tool that
//! regenerates its output tree wholesale, not a defect.

use crate::parser::Conversation;
use serde::Deserialize;
use snafu::prelude::*;
use std::collections::HashMap;

/// Display name used when no fallback is configured.
pub const DEFAULT_PERSONA: &str = "ChatGPT";

/// Error type for persona table loading failures.
#[derive(Debug, Snafu)]
pub enum PersonaMapError {
    /// The persona table file was not valid JSON of the expected shape.
    #[snafu(display("invalid persona table: {source}"))]
    Json {
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },
}

/// An immutable template-id to display-name table with a fallback.
///
/// Always passed in explicitly -- never ambient state -- so tests and
/// callers can substitute alternate tables freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaMap {
    names: HashMap<String, String>,
    fallback: String,
}

/// On-disk shape of a persona table file.
#[derive(Deserialize)]
struct PersonaMapFile {
    #[serde(default = "default_fallback")]
    fallback: String,
    #[serde(default)]
    personas: HashMap<String, String>,
}

fn default_fallback() -> String {
    DEFAULT_PERSONA.to_owned()
}

impl Default for PersonaMap {
    fn default() -> Self {
        Self::new(DEFAULT_PERSONA)
    }
}

impl PersonaMap {
    /// Creates an empty table with the given fallback display name.
    #[must_use]
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            names: HashMap::new(),
            fallback: fallback.into(),
        }
    }

    /// Adds one template-id to display-name entry.
    #[must_use]
    pub fn with(mut self, template_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.names.insert(template_id.into(), name.into());
        self
    }

    /// Loads a table from JSON:
    /// `{"fallback": "ChatGPT", "personas": {"g-...": "CourtGPT"}}`.
    ///
    /// Both keys are optional; a missing `fallback` defaults to
    /// [`DEFAULT_PERSONA`].
    ///
    /// # Errors
    ///
    /// Returns [`PersonaMapError::Json`] when the content does not parse.
    pub fn from_json(json: &str) -> Result<Self, PersonaMapError> {
        let file: PersonaMapFile = serde_json::from_str(json).context(JsonSnafu)?;
        Ok(Self {
            names: file.personas,
            fallback: file.fallback,
        })
    }

    /// Resolves a template id to a display name.
    ///
    /// Unknown and absent template ids both resolve to the fallback.
    #[must_use]
    pub fn resolve(&self, template_id: Option<&str>) -> &str {
        template_id
            .and_then(|id| self.names.get(id))
            .map_or(&self.fallback, String::as_str)
    }
}

/// The conversations attributed to one persona, in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonaBucket {
    /// The persona display name.
    pub persona: String,

    /// `(timestamp, conversation)` pairs sorted ascending by timestamp
    /// (`update_time`, falling back to `create_time`, falling back to 0).
    /// A conversation's 1-based index within the bucket is its position
    /// here plus one.
    pub entries: Vec<(f64, Conversation)>,
}

/// Partitions conversations into per-persona buckets.
///
/// Buckets appear in first-seen order; within a bucket, entries are sorted
/// ascending by last activity with a stable sort, so conversations with
/// equal timestamps keep their input order.
#[must_use]
pub fn group_conversations(
    conversations: Vec<Conversation>,
    personas: &PersonaMap,
) -> Vec<PersonaBucket> {
    let mut buckets: Vec<PersonaBucket> = Vec::new();

    for conv in conversations {
        let persona = personas.resolve(conv.conversation_template_id.as_deref());
        let entry = (conv.last_activity(), conv);
        match buckets.iter_mut().find(|b| b.persona == persona) {
            Some(bucket) => bucket.entries.push(entry),
            None => buckets.push(PersonaBucket {
                persona: persona.to_owned(),
                entries: vec![entry],
            }),
        }
    }

    for bucket in &mut buckets {
        bucket.entries.sort_by(|a, b| a.0.total_cmp(&b.0));
    }

    buckets
}
