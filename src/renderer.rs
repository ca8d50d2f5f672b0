// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Markdown rendering for extracted conversations.
//!
//! This module turns an ordered [`ExtractedMessage`] sequence into a
//! transcript document. Each transcript opens with a header block (session
//! number, date, persona, model) followed by one line per message, separated
//! by blank lines.
//!
//! # Line conventions
//!
//! Two styles are supported, matching the two transcript formats this tool
//! replaces:
//!
//! - [`LineStyle::Spoken`] (default): `You said: ...` for text and
//!   `[CourtGPT thinking]: ...` for assistant reasoning.
//! - [`LineStyle::Quoted`]: blockquoted `> **You:** ...` lines.
//!
//! Literal underscores and asterisks in message text are backslash-escaped
//! so Markdown viewers render them plain instead of as emphasis.

use crate::extract::{ExtractedMessage, MessageKind};
use crate::naming;
use crate::parser::Conversation;
use std::fmt::Write;

/// Model label used when no message in the conversation names one.
pub const UNKNOWN_MODEL: &str = "unknown-model";

/// How message lines are formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineStyle {
    /// `You said: ...` / `[Persona thinking]: ...`
    #[default]
    Spoken,
    /// `> **You:** ...` blockquote lines.
    Quoted,
}

/// Configuration options for transcript rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Label used for user messages (a name, or just "You").
    pub user_label: String,

    /// The message line style.
    pub style: LineStyle,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            user_label: "You".to_owned(),
            style: LineStyle::Spoken,
        }
    }
}

/// Backslash-escapes literal underscores and asterisks.
///
/// Keeps transcript text from being interpreted as Markdown emphasis.
#[must_use]
pub fn md_escape(text: &str) -> String {
    text.replace('_', "\\_").replace('*', "\\*")
}

/// Maps an author role to its display label.
///
/// Every recognized role lives in this one table; anything unrecognized
/// falls back to the raw role tag so nothing is silently relabeled.
#[must_use]
pub fn role_label<'a>(role: &'a str, user_label: &'a str, persona: &'a str) -> &'a str {
    match role {
        "user" => user_label,
        "assistant" => persona,
        "system" => "System",
        other => other,
    }
}

/// Renders one extracted message as a single Markdown line.
#[must_use]
pub fn render_message(msg: &ExtractedMessage, persona: &str, opts: &RenderOptions) -> String {
    let text = md_escape(&msg.text);
    let label = role_label(&msg.role, &opts.user_label, persona);

    match (opts.style, msg.kind) {
        (LineStyle::Spoken, MessageKind::Text) => format!("{label} said: {text}"),
        (LineStyle::Spoken, MessageKind::Thoughts) => format!("[{persona} thinking]: {text}"),
        (LineStyle::Quoted, MessageKind::Text) => format!("> **{label}:** {text}"),
        (LineStyle::Quoted, MessageKind::Thoughts) => format!("> [{persona} thinking]: {text}"),
    }
}

/// Scans the conversation's mapping for the model slug recorded in message
/// metadata. Returns [`UNKNOWN_MODEL`] when no node carries one.
#[must_use]
pub fn model_slug(conv: &Conversation) -> &str {
    conv.mapping
        .values()
        .filter_map(|node| node.message.as_ref())
        .find_map(|msg| msg.model_slug.as_deref())
        .unwrap_or(UNKNOWN_MODEL)
}

/// Renders a complete transcript document.
///
/// `index` is the conversation's 1-based position within its persona bucket
/// and `timestamp` the bucket-ordering timestamp; both also appear in the
/// filename built by [`crate::naming::build_basename`].
#[must_use]
pub fn render_transcript(
    conv: &Conversation,
    messages: &[ExtractedMessage],
    persona: &str,
    index: usize,
    timestamp: f64,
    opts: &RenderOptions,
) -> String {
    let title = if conv.title.is_empty() {
        naming::UNTITLED
    } else {
        conv.title.as_str()
    };

    let mut out = String::new();
    writeln!(out, "# {index:03}. {title}").unwrap();
    writeln!(out, "- **Session #:** {index}").unwrap();
    writeln!(out, "- **Date / Time:** {}", naming::format_datetime(timestamp)).unwrap();
    writeln!(out, "- **Custom GPT Name:** {persona}").unwrap();
    writeln!(out, "- **Model Used:** {}", model_slug(conv)).unwrap();

    for msg in messages {
        out.push('\n');
        writeln!(out, "{}", render_message(msg, persona, opts)).unwrap();
    }

    out
}
