// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Output-tree orchestration.
//!
//! Writes one Markdown transcript per conversation under a fixed folder
//! convention:
//!
//! ```text
//! {root}/{persona}/Transcripts/Markdown/{index}_{timestamp}_{title}.md
//! {root}/{persona}/PDFs/Sessions/{index}_{timestamp}_{title}.pdf
//! ```
//!
//! The PDF step is optional and reaches the external Markdown-to-HTML-to-PDF
//! chain through the [`PdfRenderer`] trait; [`CommandPdfRenderer`] is the
//! shipped implementation that shells out to a converter command.
//!
//! Processing is single-threaded and fail-fast: the first error aborts the
//! whole run, and writes are not transactional. A crash mid-run leaves a
//! partially populated tree, which the next full rebuild replaces wholesale.

use crate::extract::{self, Strategy};
use crate::group::PersonaBucket;
use crate::naming;
use crate::renderer::{self, RenderOptions};
use snafu::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Error type for output-tree failures.
#[derive(Debug, Snafu)]
pub enum WriteError {
    /// Failed to delete the output root during a full rebuild.
    #[snafu(display("failed to remove output root {}: {source}", path.display()))]
    RemoveRoot {
        /// The output root.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to create an output directory.
    #[snafu(display("failed to create {}: {source}", path.display()))]
    CreateDir {
        /// The directory being created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write a transcript file.
    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        /// The file being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A conversation's node graph was structurally broken.
    #[snafu(display("failed to extract conversation {id:?}: {source}"))]
    Extract {
        /// The conversation id.
        id: String,
        /// The structural error.
        source: extract::ExtractError,
    },

    /// The external PDF renderer failed for one transcript.
    #[snafu(display("failed to render {}: {source}", path.display()))]
    RenderPdf {
        /// The PDF being rendered.
        path: PathBuf,
        /// The renderer's error.
        source: PdfError,
    },
}

/// Error type for the external PDF rendering chain.
#[derive(Debug, Snafu)]
pub enum PdfError {
    /// The converter command could not be run at all.
    #[snafu(display("failed to run {command:?}: {source}"))]
    Spawn {
        /// The converter command.
        command: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The converter command ran but reported failure.
    #[snafu(display("{command:?} exited with {status}"))]
    Failed {
        /// The converter command.
        command: String,
        /// The converter's exit status.
        status: std::process::ExitStatus,
    },
}

/// The seam to the external Markdown-to-HTML-to-PDF rendering chain.
///
/// The core never renders PDFs itself; it hands a written Markdown file and
/// a destination path to an implementation of this trait.
pub trait PdfRenderer {
    /// Renders the Markdown file at `markdown` into a PDF at `pdf`.
    ///
    /// # Errors
    ///
    /// Returns a [`PdfError`] when the external chain fails.
    fn render_pdf(&self, markdown: &Path, pdf: &Path) -> Result<(), PdfError>;
}

/// Renders PDFs by invoking an external converter command as
/// `{command} {markdown} {pdf}`.
#[derive(Debug, Clone)]
pub struct CommandPdfRenderer {
    command: String,
}

impl CommandPdfRenderer {
    /// Creates a renderer that shells out to the given command.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl PdfRenderer for CommandPdfRenderer {
    fn render_pdf(&self, markdown: &Path, pdf: &Path) -> Result<(), PdfError> {
        let status = Command::new(&self.command)
            .arg(markdown)
            .arg(pdf)
            .status()
            .context(SpawnSnafu {
                command: self.command.clone(),
            })?;
        ensure!(
            status.success(),
            FailedSnafu {
                command: self.command.clone(),
                status,
            }
        );
        Ok(())
    }
}

/// Configuration for a write run.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Message ordering strategy.
    pub strategy: Strategy,

    /// Rendering options (user label, line style).
    pub render: RenderOptions,

    /// Delete and recreate the output root before writing.
    ///
    /// Destructive and unconditional when set: everything under the root is
    /// removed, not just files this tool wrote.
    pub rebuild_root: bool,

    /// Suppress per-file progress lines.
    pub quiet: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::ChainWalk,
            render: RenderOptions::default(),
            rebuild_root: true,
            quiet: false,
        }
    }
}

/// Writes every bucket's transcripts under `root`.
///
/// Returns the number of Markdown files written. When `pdf` is given, each
/// transcript is also rendered to `PDFs/Sessions/` through it.
///
/// With `rebuild_root` set (the default), the output root is **deleted and
/// recreated** first. There is no safeguard against concurrent readers of
/// the tree; this is a single-writer tool.
///
/// # Errors
///
/// Fails fast on the first I/O, extraction, or PDF-rendering error.
pub fn write_all(
    buckets: &[PersonaBucket],
    root: &Path,
    opts: &WriteOptions,
    pdf: Option<&dyn PdfRenderer>,
) -> Result<usize, WriteError> {
    if opts.rebuild_root && root.exists() {
        std::fs::remove_dir_all(root).context(RemoveRootSnafu { path: root })?;
    }
    std::fs::create_dir_all(root).context(CreateDirSnafu { path: root })?;

    let mut written = 0;
    for bucket in buckets {
        written += write_bucket(bucket, root, opts, pdf)?;
    }
    Ok(written)
}

fn write_bucket(
    bucket: &PersonaBucket,
    root: &Path,
    opts: &WriteOptions,
    pdf: Option<&dyn PdfRenderer>,
) -> Result<usize, WriteError> {
    let persona_dir = root.join(&bucket.persona);
    let md_dir = persona_dir.join("Transcripts").join("Markdown");
    std::fs::create_dir_all(&md_dir).context(CreateDirSnafu { path: &md_dir })?;

    let pdf_dir = persona_dir.join("PDFs").join("Sessions");
    if pdf.is_some() {
        std::fs::create_dir_all(&pdf_dir).context(CreateDirSnafu { path: &pdf_dir })?;
    }

    for (i, (ts, conv)) in bucket.entries.iter().enumerate() {
        let index = i + 1;
        let messages = extract::extract(conv, opts.strategy).context(ExtractSnafu {
            id: conv.id.clone(),
        })?;

        let base = naming::build_basename(
            index,
            *ts,
            &naming::sanitize(&conv.title, naming::TITLE_LIMIT),
        );
        let md_path = md_dir.join(format!("{base}.md"));
        let doc = renderer::render_transcript(
            conv,
            &messages,
            &bucket.persona,
            index,
            *ts,
            &opts.render,
        );
        std::fs::write(&md_path, &doc).context(WriteFileSnafu { path: &md_path })?;
        if !opts.quiet {
            eprintln!("Wrote {}", md_path.display());
        }

        if let Some(renderer) = pdf {
            let pdf_path = pdf_dir.join(format!("{base}.pdf"));
            renderer
                .render_pdf(&md_path, &pdf_path)
                .context(RenderPdfSnafu { path: &pdf_path })?;
            if !opts.quiet {
                eprintln!("Wrote {}", pdf_path.display());
            }
        }
    }

    Ok(bucket.entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{PersonaMap, group_conversations};
    use crate::parser::parse_export;

    fn quiet_opts() -> WriteOptions {
        WriteOptions {
            quiet: true,
            ..Default::default()
        }
    }

    fn sample_buckets() -> Vec<PersonaBucket> {
        let json = r#"[{
            "id": "c1",
            "title": "Only Session",
            "update_time": 1600000000,
            "current_node": "a",
            "mapping": {
                "a": { "message": { "author": { "role": "user" },
                                    "content": { "content_type": "text", "parts": ["hi"] } } }
            }
        }]"#;
        let convs = parse_export(json).unwrap();
        group_conversations(convs, &PersonaMap::default())
    }

    #[test]
    fn writes_expected_layout_and_name() {
        let root = tempfile::tempdir().unwrap();
        let written = write_all(&sample_buckets(), root.path(), &quiet_opts(), None).unwrap();

        assert_eq!(written, 1);
        let md = root
            .path()
            .join("ChatGPT")
            .join("Transcripts")
            .join("Markdown")
            .join("001_20200913_122640PM_Only_Session.md");
        assert!(md.is_file());

        let doc = std::fs::read_to_string(md).unwrap();
        assert!(doc.contains("You said: hi"));
    }

    #[test]
    fn rebuild_wipes_stale_output() {
        let root = tempfile::tempdir().unwrap();
        let stale = root.path().join("stale.md");
        std::fs::write(&stale, "old").unwrap();

        write_all(&sample_buckets(), root.path(), &quiet_opts(), None).unwrap();

        assert!(!stale.exists());
    }

    #[test]
    fn keep_output_preserves_existing_files() {
        let root = tempfile::tempdir().unwrap();
        let stale = root.path().join("stale.md");
        std::fs::write(&stale, "old").unwrap();

        let opts = WriteOptions {
            rebuild_root: false,
            ..quiet_opts()
        };
        write_all(&sample_buckets(), root.path(), &opts, None).unwrap();

        assert!(stale.exists());
    }

    #[test]
    fn no_pdf_directory_without_renderer() {
        let root = tempfile::tempdir().unwrap();
        write_all(&sample_buckets(), root.path(), &quiet_opts(), None).unwrap();

        assert!(!root.path().join("ChatGPT").join("PDFs").exists());
    }

    #[test]
    fn structural_error_aborts_the_run() {
        let json = r#"[{
            "id": "cyclic",
            "current_node": "a",
            "mapping": {
                "a": { "parent": "b", "message": { "author": { "role": "user" },
                                                   "content": { "parts": ["x"] } } },
                "b": { "parent": "a" }
            }
        }]"#;
        let convs = parse_export(json).unwrap();
        let buckets = group_conversations(convs, &PersonaMap::default());

        let root = tempfile::tempdir().unwrap();
        let err = write_all(&buckets, root.path(), &quiet_opts(), None).unwrap_err();

        assert!(matches!(err, WriteError::Extract { .. }));
    }
}
