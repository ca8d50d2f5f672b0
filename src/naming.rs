// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Filesystem-safe transcript naming.
//!
//! Transcript files are named `{index}_{timestamp}_{title}.md` with a
//! zero-padded sequence number first, so directory listings sort
//! chronologically within a persona. [`parse_basename`] is the inverse used
//! by the archive-restructuring utility; [`build_basename`] and
//! [`parse_basename`] round-trip.
//!
//! All timestamp formatting is UTC so output is reproducible across
//! machines.

use chrono::{DateTime, NaiveDate};
use snafu::prelude::*;

/// Title length limit used for transcript filenames.
pub const TITLE_LIMIT: usize = 100;

/// Title length limit used for summary-style filenames.
pub const SHORT_TITLE_LIMIT: usize = 80;

/// Placeholder token used when sanitization leaves nothing.
pub const UNTITLED: &str = "untitled";

/// Error type for basename parsing failures.
///
/// These are hard stops: downstream indexing depends on every header
/// parsing, so a malformed one aborts the run.
#[derive(Debug, Snafu)]
pub enum NameError {
    /// The token had no underscore to split the sequence index off.
    #[snafu(display("cannot split index from header: {token:?}"))]
    MissingIndex {
        /// The offending header token.
        token: String,
    },

    /// The remainder did not split into date, time, and title fields.
    #[snafu(display("header has wrong format, expected index_date_time_title: {token:?}"))]
    MalformedHeader {
        /// The offending remainder.
        token: String,
    },
}

/// Derives a filesystem-safe token from a conversation title.
///
/// Whitespace runs collapse to a single underscore, anything outside
/// `[A-Za-z0-9_-]` is stripped, and the result is truncated to `max_len`
/// characters. An empty result becomes [`UNTITLED`]. Deterministic and
/// idempotent: `sanitize(&sanitize(t, n), n) == sanitize(t, n)`.
///
/// ```
/// use cg2md::naming::sanitize;
///
/// assert_eq!(sanitize("My Title!! (v2)", 100), "My_Title_v2");
/// ```
#[must_use]
pub fn sanitize(title: &str, max_len: usize) -> String {
    let mut collapsed = String::with_capacity(title.len());
    let mut in_whitespace = false;
    for c in title.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                collapsed.push('_');
                in_whitespace = true;
            }
        } else {
            collapsed.push(c);
            in_whitespace = false;
        }
    }

    let cleaned: String = collapsed
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .take(max_len)
        .collect();

    if cleaned.is_empty() {
        UNTITLED.to_owned()
    } else {
        cleaned
    }
}

/// Formats a Unix timestamp as a filename token, e.g. `20240304_020117AM`.
#[must_use]
pub fn format_timestamp(ts: f64) -> String {
    utc(ts).format("%Y%m%d_%I%M%S%p").to_string()
}

/// Formats a Unix timestamp for transcript headers, e.g.
/// `2024-03-04 02:01:17 AM`.
#[must_use]
pub fn format_datetime(ts: f64) -> String {
    utc(ts).format("%Y-%m-%d %I:%M:%S %p").to_string()
}

#[allow(clippy::cast_possible_truncation)]
fn utc(ts: f64) -> DateTime<chrono::Utc> {
    DateTime::from_timestamp(ts as i64, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Builds a transcript basename: `{index:03}_{timestamp}_{title}`.
///
/// `title` is expected to already be sanitized; the index is the 1-based
/// position within the persona bucket and is recomputed every run.
#[must_use]
pub fn build_basename(index: usize, ts: f64, sanitized_title: &str) -> String {
    format!("{index:03}_{}_{sanitized_title}", format_timestamp(ts))
}

/// The fields recovered from a transcript basename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBasename {
    /// The zero-padded sequence index, verbatim (e.g. `"001"`).
    pub index: String,

    /// The date, reformatted as `YYYY-MM-DD` when the token was a valid
    /// `YYYYMMDD`; kept verbatim otherwise.
    pub date: String,

    /// The time, reformatted as `HH:MM:SS AM` when the token matched
    /// `HHMMSS[AM|PM]`; kept verbatim otherwise.
    pub time: String,

    /// The title with underscores restored to spaces.
    pub title: String,
}

/// Parses a basename like `001_20240304_020117AM_My_Title` back into its
/// fields.
///
/// # Errors
///
/// Fails fast with a [`NameError`] naming the offending token when the
/// index cannot be split off or the remainder is missing fields.
pub fn parse_basename(token: &str) -> Result<ParsedBasename, NameError> {
    let (index, rest) = token
        .split_once('_')
        .context(MissingIndexSnafu { token })?;

    let mut fields = rest.splitn(3, '_');
    let (Some(date_token), Some(time_token), Some(title_token)) =
        (fields.next(), fields.next(), fields.next())
    else {
        return MalformedHeaderSnafu { token: rest }.fail();
    };

    Ok(ParsedBasename {
        index: index.to_owned(),
        date: reformat_date(date_token),
        time: reformat_time(time_token),
        title: title_token.replace('_', " ").trim().to_owned(),
    })
}

/// `YYYYMMDD` -> `YYYY-MM-DD`; anything else passes through verbatim.
fn reformat_date(token: &str) -> String {
    if token.len() == 8 && token.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(date) = NaiveDate::parse_from_str(token, "%Y%m%d") {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    token.to_owned()
}

/// `HHMMSS[AM|PM]` -> `HH:MM:SS AM`; anything else passes through verbatim.
fn reformat_time(token: &str) -> String {
    if !token.is_ascii() {
        return token.to_owned();
    }
    let (digits, meridiem) = match token.len() {
        6 => (token, None),
        8 => {
            let (digits, suffix) = token.split_at(6);
            if suffix == "AM" || suffix == "PM" {
                (digits, Some(suffix))
            } else {
                return token.to_owned();
            }
        }
        _ => return token.to_owned(),
    };

    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return token.to_owned();
    }

    let formatted = format!("{}:{}:{}", &digits[0..2], &digits[2..4], &digits[4..6]);
    match meridiem {
        Some(m) => format!("{formatted} {m}"),
        None => formatted,
    }
}
