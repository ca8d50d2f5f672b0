// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for cg2md.
//!
//! This binary provides the `cg2md` command for converting ChatGPT
//! conversation exports into per-persona Markdown transcripts, plus two
//! archive utilities (`merge`, `restructure`) over the written output.

use cg2md::extract::Strategy;
use cg2md::group::{self, PersonaMap};
use cg2md::renderer::{LineStyle, RenderOptions};
use cg2md::writer::{self, CommandPdfRenderer, PdfRenderer, WriteOptions};
use cg2md::{archive, parser};
use lexopt::prelude::*;
use snafu::{OptionExt, ensure, prelude::*};
use std::path::PathBuf;

const DEFAULT_INPUT: &str = "_UserData/conversations.json";
const DEFAULT_OUTPUT: &str = "parsed_sessions";

/// What the invocation asks for.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Convert,
    Merge,
    Restructure,
}

struct Cli {
    mode: Mode,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    dir: Option<PathBuf>,
    strategy: Strategy,
    style: LineStyle,
    personas: Option<PathBuf>,
    user_label: String,
    pdf_command: Option<String>,
    keep_output: bool,
    quiet: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("input not found: {}", path.display()))]
    InputNotFound { path: PathBuf },

    #[snafu(display("merge requires --dir and --output"))]
    MergeArgs,

    #[snafu(display("restructure requires --input and --output"))]
    RestructureArgs,

    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to parse {}: {source}", path.display()))]
    ParseExport {
        path: PathBuf,
        source: parser::ParseError,
    },

    #[snafu(display("failed to load persona table {}: {source}", path.display()))]
    LoadPersonas {
        path: PathBuf,
        source: group::PersonaMapError,
    },

    #[snafu(display("{source}"))]
    WriteTranscripts { source: writer::WriteError },

    #[snafu(display("{source}"))]
    Archive { source: archive::ArchiveError },

    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn print_help() {
    println!(
        "\
{name} {version}
Convert ChatGPT conversation exports to Markdown transcripts

Usage: {name} [COMMAND] [OPTIONS]

Commands:
  convert      Convert an export into per-persona transcripts (default)
  merge        Merge a directory of transcripts into one Markdown file
  restructure  Rebuild a combined archive with an index and uniform headers

Options (convert):
  -i, --input <FILE>       Export JSON file (default: {input})
  -o, --output <DIR>       Output root directory (default: {output})
      --strategy <NAME>    Message ordering: chain or timestamps (default: chain)
      --style <NAME>       Line style: spoken or quoted (default: spoken)
      --personas <FILE>    Persona table JSON (template id to display name)
      --user-label <NAME>  Label for user messages (default: You)
      --pdf <COMMAND>      Also render PDFs via `COMMAND <md> <pdf>`
      --keep-output        Do not delete the output root before writing

  Without --keep-output the output root is DELETED and recreated on
  every run. Do not point it at a directory you care about.

Options (merge):
  -d, --dir <DIR>          Directory containing .md transcripts
  -o, --output <FILE>      Merged output file

Options (restructure):
  -i, --input <FILE>       Combined archive Markdown file
  -o, --output <FILE>      Restructured output file

Other options:
  -q, --quiet              Suppress progress messages
  -h, --help               Print help
  -V, --version            Print version",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        input = DEFAULT_INPUT,
        output = DEFAULT_OUTPUT,
    );
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    // Show help if no arguments provided; the convert defaults include a
    // destructive rebuild, so a bare invocation should not run anything.
    if std::env::args().len() == 1 {
        print_help();
        std::process::exit(0);
    }

    let mut mode: Option<Mode> = None;
    let mut input = None;
    let mut output = None;
    let mut dir = None;
    let mut strategy = Strategy::ChainWalk;
    let mut style = LineStyle::Spoken;
    let mut personas = None;
    let mut user_label = "You".to_owned();
    let mut pdf_command = None;
    let mut keep_output = false;
    let mut quiet = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('i') | Long("input") => input = Some(parser.value()?.parse()?),
            Short('o') | Long("output") => output = Some(parser.value()?.parse()?),
            Short('d') | Long("dir") => dir = Some(parser.value()?.parse()?),
            Long("strategy") => {
                strategy = match parser.value()?.string()?.as_str() {
                    "chain" => Strategy::ChainWalk,
                    "timestamps" => Strategy::TimestampSort,
                    _ => return Err("strategy must be chain or timestamps".into()),
                };
            }
            Long("style") => {
                style = match parser.value()?.string()?.as_str() {
                    "spoken" => LineStyle::Spoken,
                    "quoted" => LineStyle::Quoted,
                    _ => return Err("style must be spoken or quoted".into()),
                };
            }
            Long("personas") => personas = Some(parser.value()?.parse()?),
            Long("user-label") => user_label = parser.value()?.string()?,
            Long("pdf") => pdf_command = Some(parser.value()?.string()?),
            Long("keep-output") => keep_output = true,
            Short('q') | Long("quiet") => quiet = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) if mode.is_none() => {
                mode = Some(match val.string()?.as_str() {
                    "convert" => Mode::Convert,
                    "merge" => Mode::Merge,
                    "restructure" => Mode::Restructure,
                    other => {
                        return Err(
                            format!("unknown command {other:?}, expected convert, merge, or restructure")
                                .into(),
                        );
                    }
                });
            }
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(Cli {
        mode: mode.unwrap_or(Mode::Convert),
        input,
        output,
        dir,
        strategy,
        style,
        personas,
        user_label,
        pdf_command,
        keep_output,
        quiet,
    })
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let cli = parse_args().context(ParseArgsSnafu)?;

    match cli.mode {
        Mode::Convert => run_convert(&cli),
        Mode::Merge => run_merge(&cli),
        Mode::Restructure => run_restructure(&cli),
    }
}

fn load_personas(cli: &Cli) -> Result<PersonaMap, Error> {
    let Some(path) = &cli.personas else {
        return Ok(PersonaMap::default());
    };
    let json = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
    PersonaMap::from_json(&json).context(LoadPersonasSnafu { path })
}

fn run_convert(cli: &Cli) -> Result<(), Error> {
    let input = cli.input.clone().unwrap_or_else(|| DEFAULT_INPUT.into());
    let output = cli.output.clone().unwrap_or_else(|| DEFAULT_OUTPUT.into());

    ensure!(input.is_file(), InputNotFoundSnafu { path: &input });

    let personas = load_personas(cli)?;
    let json = std::fs::read_to_string(&input).context(ReadFileSnafu { path: &input })?;
    let conversations = parser::parse_export(&json).context(ParseExportSnafu { path: &input })?;
    let buckets = group::group_conversations(conversations, &personas);

    let opts = WriteOptions {
        strategy: cli.strategy,
        render: RenderOptions {
            user_label: cli.user_label.clone(),
            style: cli.style,
        },
        rebuild_root: !cli.keep_output,
        quiet: cli.quiet,
    };
    let pdf = cli
        .pdf_command
        .as_ref()
        .map(|cmd| CommandPdfRenderer::new(cmd.clone()));
    let pdf_ref = pdf.as_ref().map(|r| r as &dyn PdfRenderer);

    let written = writer::write_all(&buckets, &output, &opts, pdf_ref)
        .context(WriteTranscriptsSnafu)?;

    if !cli.quiet {
        eprintln!("Wrote {written} transcripts under {}", output.display());
    }
    Ok(())
}

fn run_merge(cli: &Cli) -> Result<(), Error> {
    let dir = cli.dir.as_ref().context(MergeArgsSnafu)?;
    let out = cli.output.as_ref().context(MergeArgsSnafu)?;

    ensure!(dir.is_dir(), InputNotFoundSnafu { path: dir });

    let merged = archive::merge_transcripts(dir, out).context(ArchiveSnafu)?;
    if merged == 0 {
        eprintln!("No .md files found in {}", dir.display());
    } else if !cli.quiet {
        eprintln!("Merged {merged} files into {}", out.display());
    }
    Ok(())
}

fn run_restructure(cli: &Cli) -> Result<(), Error> {
    let input = cli.input.as_ref().context(RestructureArgsSnafu)?;
    let out = cli.output.as_ref().context(RestructureArgsSnafu)?;

    ensure!(input.is_file(), InputNotFoundSnafu { path: input });

    let text = std::fs::read_to_string(input).context(ReadFileSnafu { path: input })?;
    let result = archive::restructure_archive(&text).context(ArchiveSnafu)?;

    if result.sessions == 0 {
        eprintln!("No session blocks found in {}", input.display());
    }

    std::fs::write(out, &result.document).context(WriteFileSnafu { path: out })?;
    if !cli.quiet {
        eprintln!(
            "Wrote restructured archive with {} sessions to {}",
            result.sessions,
            out.display()
        );
    }
    Ok(())
}
