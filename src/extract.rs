// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Message extraction from a conversation's node graph.
//!
//! Two orderings are supported for the same underlying data, and they are
//! deliberately *not* interchangeable:
//!
//! - [`Strategy::ChainWalk`] follows parent pointers from `current_node`
//!   back to the root and reverses the result. This reconstructs exactly the
//!   conversation path the user last saw; abandoned branches are invisible.
//! - [`Strategy::TimestampSort`] ignores the tree entirely and flattens
//!   every node in the mapping, sorted by message timestamp. This is a
//!   whole-tree dump: it surfaces assistant reasoning (`thoughts`) and
//!   abandoned branches, which can interleave with the live path.
//!
//! Use chain-walk when you want a faithful transcript, timestamp-sort when
//! you want everything the export contains. The two may legitimately
//! disagree whenever the conversation was ever regenerated or edited.
//!
//! Both strategies are lenient about the graph itself: a `current_node`
//! pointing at a pruned node truncates the walk silently, and missing
//! optional fields never fail. The only structural error is a parent cycle,
//! which is caught by a visited-id set instead of hanging the walk.

use crate::parser::Conversation;
use snafu::prelude::*;
use std::collections::HashSet;

/// Error type for structural extraction failures.
#[derive(Debug, Snafu)]
pub enum ExtractError {
    /// The parent chain revisited a node, which a well-formed export never
    /// produces.
    #[snafu(display("parent chain cycles through node {node_id:?} in conversation {conversation:?}"))]
    Cycle {
        /// Id of the conversation with the malformed graph.
        conversation: String,
        /// The first node id seen twice.
        node_id: String,
    },
}

/// How to order messages recovered from the node graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Parent-chain walk from `current_node` to the root, reversed.
    ChainWalk,
    /// Global timestamp sort across every node in the mapping.
    TimestampSort,
}

/// What kind of content an extracted message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Ordinary message text.
    Text,
    /// Assistant reasoning surfaced from `thoughts` content.
    Thoughts,
}

/// The normalized unit both extraction strategies produce.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedMessage {
    /// Message timestamp: `create_time`, else `update_time`, else 0.
    pub timestamp: f64,

    /// The author role tag, verbatim from the export.
    pub role: String,

    /// Whether this is message text or assistant reasoning.
    pub kind: MessageKind,

    /// The extracted text.
    pub text: String,
}

/// Extracts an ordered message sequence from a conversation.
///
/// The meaning of the order depends on the strategy; see the module docs
/// for when each is appropriate.
///
/// # Errors
///
/// Returns [`ExtractError::Cycle`] when the chain walk revisits a node.
/// The timestamp-sort strategy never fails.
pub fn extract(
    conv: &Conversation,
    strategy: Strategy,
) -> Result<Vec<ExtractedMessage>, ExtractError> {
    match strategy {
        Strategy::ChainWalk => chain_walk(conv),
        Strategy::TimestampSort => Ok(timestamp_sort(conv)),
    }
}

/// Walks parent pointers from `current_node` to the root.
///
/// Records are collected leaf-to-root and reversed before returning, so the
/// public order is root-to-leaf chronological. Tool messages are status
/// noise and are skipped entirely; messages without parts are skipped but
/// traversal continues. A reference to a node missing from the mapping ends
/// the walk silently -- exports are known to reference pruned nodes.
fn chain_walk(conv: &Conversation) -> Result<Vec<ExtractedMessage>, ExtractError> {
    let mut out = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut current = conv.current_node.as_deref();

    while let Some(id) = current {
        ensure!(
            visited.insert(id),
            CycleSnafu {
                conversation: conv.id.clone(),
                node_id: id,
            }
        );

        let Some(node) = conv.mapping.get(id) else {
            break;
        };

        if let Some(msg) = &node.message
            && msg.role != "tool"
            && !msg.parts.is_empty()
        {
            out.push(ExtractedMessage {
                timestamp: msg.timestamp(),
                role: msg.role.clone(),
                kind: MessageKind::Text,
                text: msg.parts[0].clone(),
            });
        }

        current = node.parent.as_deref();
    }

    out.reverse();
    Ok(out)
}

/// Flattens every node in the mapping and sorts by timestamp.
///
/// Emits user text, assistant text, and assistant thoughts; everything else
/// (system messages, tool output, unknown content types) is dropped. The
/// sort is stable, so records with equal timestamps keep mapping-iteration
/// order, which is deterministic (node-id order).
fn timestamp_sort(conv: &Conversation) -> Vec<ExtractedMessage> {
    let mut out = Vec::new();

    for node in conv.mapping.values() {
        let Some(msg) = &node.message else {
            continue;
        };
        let timestamp = msg.timestamp();

        match (msg.role.as_str(), msg.content_type.as_str()) {
            ("user" | "assistant", "text") => {
                let text = joined_parts(&msg.parts);
                if !text.is_empty() {
                    out.push(ExtractedMessage {
                        timestamp,
                        role: msg.role.clone(),
                        kind: MessageKind::Text,
                        text,
                    });
                }
            }
            ("assistant", "thoughts") => {
                for thought in &msg.thoughts {
                    let text = thought.trim();
                    if !text.is_empty() {
                        out.push(ExtractedMessage {
                            timestamp,
                            role: msg.role.clone(),
                            kind: MessageKind::Thoughts,
                            text: text.to_owned(),
                        });
                    }
                }
            }
            _ => {}
        }
    }

    out.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    out
}

/// Joins part fragments with newlines, trimming each fragment and the whole.
fn joined_parts(parts: &[String]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}
