// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Convert ChatGPT conversation exports to Markdown transcripts.
//!
//! This crate turns the `conversations.json` file from a ChatGPT data
//! export into per-conversation Markdown transcripts (and, through an
//! external converter, PDFs), grouped by the custom-GPT persona each
//! conversation was held with.
//!
//! # Overview
//!
//! ChatGPT stores each conversation as a parent-linked node graph, not a
//! flat message list. This crate:
//!
//! 1. Parses the export into typed conversation graphs
//! 2. Recovers an ordered message sequence per conversation, either by
//!    walking parent pointers from the current leaf (the path the user
//!    saw) or by timestamp-sorting the whole tree
//! 3. Groups conversations by persona and numbers them chronologically
//! 4. Writes one transcript per conversation under a per-persona tree
//!
//! # Example
//!
//! ```no_run
//! use cg2md::extract::Strategy;
//! use cg2md::group::{PersonaMap, group_conversations};
//! use cg2md::writer::{WriteOptions, write_all};
//! use std::path::Path;
//!
//! let json = std::fs::read_to_string("conversations.json").unwrap();
//! let conversations = cg2md::parser::parse_export(&json).unwrap();
//!
//! let personas = PersonaMap::default().with("g-jt4zig6Zx", "CourtGPT");
//! let buckets = group_conversations(conversations, &personas);
//!
//! let opts = WriteOptions {
//!     strategy: Strategy::ChainWalk,
//!     ..Default::default()
//! };
//! let written = write_all(&buckets, Path::new("parsed_sessions"), &opts, None).unwrap();
//! eprintln!("{written} transcripts");
//! ```
//!
//! # Modules
//!
//! - [`parser`]: export deserialization into conversation node graphs
//! - [`extract`]: the two message-ordering strategies
//! - [`naming`]: filesystem-safe transcript names and their inverse parser
//! - [`group`]: persona lookup and per-persona bucketing
//! - [`renderer`]: Markdown transcript rendering
//! - [`writer`]: output-tree orchestration and the PDF seam
//! - [`archive`]: merge and restructure utilities over written transcripts

#![deny(missing_docs)]

pub mod archive;
pub mod extract;
pub mod group;
pub mod naming;
pub mod parser;
pub mod renderer;
pub mod writer;
