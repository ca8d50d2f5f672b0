// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Transcript archive utilities.
//!
//! Two post-processing steps over already-written transcripts:
//!
//! - [`merge_transcripts`] concatenates every `.md` file directly under a
//!   directory, sorted by filename, into one document.
//! - [`restructure_archive`] rebuilds a combined archive whose sessions are
//!   headed by `## {basename}` lines into a document with a leading index
//!   and uniform per-session headers.

use crate::naming::{self, ParsedBasename};
use snafu::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Error type for archive processing failures.
#[derive(Debug, Snafu)]
pub enum ArchiveError {
    /// Failed to read one transcript during a merge.
    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadEntry {
        /// The transcript being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to create the merged file's parent directory.
    #[snafu(display("failed to create {}: {source}", path.display()))]
    CreateDir {
        /// The directory being created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write the merged file.
    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteMerged {
        /// The file being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A session header did not parse as a transcript basename.
    ///
    /// This is a hard stop: the index built from the headers is wrong if
    /// any of them is skipped.
    #[snafu(display("invalid session header: {source}"))]
    Header {
        /// The underlying basename parse error.
        source: naming::NameError,
    },
}

/// Merges every `.md` file directly under `dir` into `out`.
///
/// Files are sorted by filename, which for transcript names produced by
/// this tool is chronological order. Each file contributes a
/// `# {filename-stem}` heading, its content, and a horizontal rule.
/// Returns the number of files merged; zero means nothing was written.
///
/// # Errors
///
/// Fails fast on the first unreadable transcript or write failure.
pub fn merge_transcripts(dir: &Path, out: &Path) -> Result<usize, ArchiveError> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .map(|e| e.path().to_path_buf())
        .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
        .collect();
    files.sort();

    if files.is_empty() {
        return Ok(0);
    }

    let mut merged = String::new();
    for path in &files {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        let content = std::fs::read_to_string(path).context(ReadEntrySnafu { path })?;

        merged.push_str(&format!("# {stem}\n\n"));
        merged.push_str(content.trim_end());
        merged.push_str("\n\n---\n\n");
    }

    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context(CreateDirSnafu { path: parent })?;
    }
    std::fs::write(out, &merged).context(WriteMergedSnafu { path: out })?;

    Ok(files.len())
}

/// One session block split out of a combined archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBlock {
    /// The parsed `## {basename}` header.
    pub header: ParsedBasename,

    /// The block body, trimmed.
    pub body: String,
}

/// A restructured archive document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restructured {
    /// The rebuilt Markdown document.
    pub document: String,

    /// How many session blocks went into it.
    pub sessions: usize,
}

/// Splits archive text into `(raw_header, body)` blocks.
///
/// A block starts at each line beginning with `## `; content before the
/// first such line is dropped.
fn split_blocks(text: &str) -> Vec<(String, String)> {
    let mut blocks: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if let Some(header) = line.strip_prefix("## ") {
            blocks.push((header.trim().to_owned(), String::new()));
        } else if let Some((_, body)) = blocks.last_mut() {
            body.push_str(line);
            body.push('\n');
        }
    }

    for (_, body) in &mut blocks {
        let trimmed = body.trim().to_owned();
        *body = trimmed;
    }

    blocks
}

/// Rebuilds a combined session archive with an index and uniform headers.
///
/// The output opens with a `# Index` section listing every session as
/// `N. Title (date time)`, followed by each session in full under a
/// `# {index}. {title}` header with italicized date and time lines.
///
/// # Errors
///
/// Returns [`ArchiveError::Header`] when any block header fails to parse;
/// see [`naming::parse_basename`].
pub fn restructure_archive(text: &str) -> Result<Restructured, ArchiveError> {
    let blocks = split_blocks(text);

    let sessions: Vec<SessionBlock> = blocks
        .into_iter()
        .map(|(raw_header, body)| {
            let header = naming::parse_basename(&raw_header).context(HeaderSnafu)?;
            Ok(SessionBlock { header, body })
        })
        .collect::<Result<_, ArchiveError>>()?;

    let mut lines: Vec<String> = Vec::new();

    lines.push("# Index\n".to_owned());
    for session in &sessions {
        let h = &session.header;
        lines.push(format!("{}. {} ({} {})", h.index, h.title, h.date, h.time));
    }
    lines.push("\n---\n".to_owned());

    for session in &sessions {
        let h = &session.header;
        lines.push(format!("# {}. {}", h.index, h.title));
        lines.push(format!("*Date: {}*  *Time: {}*\n", h.date, h.time));
        lines.push(session.body.clone());
        lines.push("\n---\n".to_owned());
    }

    let document = format!("{}\n", lines.join("\n").trim_end());
    Ok(Restructured {
        document,
        sessions: sessions.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_sorted_by_filename() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("002_b.md"), "second\n").unwrap();
        std::fs::write(dir.path().join("001_a.md"), "first\n").unwrap();
        std::fs::write(dir.path().join("003_c.md"), "third\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let out = dir.path().join("merged").join("all.md");
        let count = merge_transcripts(dir.path(), &out).unwrap();

        assert_eq!(count, 3);
        let merged = std::fs::read_to_string(out).unwrap();
        let first = merged.find("first").unwrap();
        let second = merged.find("second").unwrap();
        let third = merged.find("third").unwrap();
        assert!(first < second && second < third);
        assert!(merged.contains("# 001_a\n\nfirst\n\n---\n\n"));
    }

    #[test]
    fn merge_of_empty_directory_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("all.md");

        assert_eq!(merge_transcripts(dir.path(), &out).unwrap(), 0);
        assert!(!out.exists());
    }

    #[test]
    fn merge_ignores_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("001_a.md"), "top\n").unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(nested.join("002_b.md"), "nested\n").unwrap();

        let out = dir.path().join("out").join("all.md");
        let count = merge_transcripts(dir.path(), &out).unwrap();

        assert_eq!(count, 1);
        assert!(!std::fs::read_to_string(out).unwrap().contains("nested"));
    }

    #[test]
    fn splits_blocks_on_session_headers() {
        let text = "preamble ignored\n## 001_x_y_z\nbody one\n\n## 002_x_y_z\nbody two\n";
        let blocks = split_blocks(text);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].0, "001_x_y_z");
        assert_eq!(blocks[0].1, "body one");
        assert_eq!(blocks[1].1, "body two");
    }

    #[test]
    fn restructures_with_index_and_sections() {
        let text = "\
## 001_20240304_020117AM_First_Hearing
Opening arguments.

## 002_20240305_113000PM_Second_Hearing
Closing arguments.
";
        let result = restructure_archive(text).unwrap();

        assert_eq!(result.sessions, 2);
        let doc = &result.document;
        assert!(doc.starts_with("# Index\n"));
        assert!(doc.contains("001. First Hearing (2024-03-04 02:01:17 AM)"));
        assert!(doc.contains("002. Second Hearing (2024-03-05 11:30:00 PM)"));
        assert!(doc.contains("# 001. First Hearing"));
        assert!(doc.contains("*Date: 2024-03-04*  *Time: 02:01:17 AM*"));
        assert!(doc.contains("Opening arguments."));
        assert!(doc.ends_with("---\n"));
    }

    #[test]
    fn restructure_index_entries_keep_leading_zeros() {
        // Index lines use the raw zero-padded token from the header.
        let result = restructure_archive("## 007_20240304_020117AM_Bond\nbody\n").unwrap();

        assert!(result.document.contains("007. Bond (2024-03-04 02:01:17 AM)"));
    }

    #[test]
    fn restructure_fails_on_malformed_header() {
        let err = restructure_archive("## garbage\nbody\n").unwrap_err();

        assert!(matches!(err, ArchiveError::Header { .. }));
        assert!(err.to_string().contains("garbage"));
    }

    #[test]
    fn restructure_of_headerless_text_is_empty() {
        let result = restructure_archive("no sessions here\n").unwrap();

        assert_eq!(result.sessions, 0);
    }
}
