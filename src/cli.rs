//! Minimal CLI: load schema → decode documents → (status | re-encoded JSON)
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use tracing::{debug, info};

use salad_doc::options::DEFAULT_MAX_DEPTH;
use salad_doc::{DecodeError, DecodeOptions, Node, Schema, UnknownFields};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// decode JSON/NDJSON documents against a record/enum schema declaration
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    /// log decoding decisions to stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// decode every document and report which ones conform
    Check(CheckCmd),
    /// decode then re-encode every document, printing canonical JSON
    Convert(ConvertCmd),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// schema declaration file (JSON)
    #[arg(long, short)]
    schema: PathBuf,

    /// record type every document is decoded as
    #[arg(long)]
    root: String,

    /// ignore unknown keys instead of rejecting them
    #[arg(long, default_value_t = false)]
    permissive: bool,

    /// treat `prefix:name` keys as unknown keys
    #[arg(long, default_value_t = false)]
    no_extensions: bool,

    /// maximum nesting depth before a document is rejected
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckCmd {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[command(flatten)]
    input_settings: InputSettings,
}

#[derive(clap::Parser, Debug)]
struct ConvertCmd {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// One input document and where it came from (`file`, `file:line`, `file#n`).
#[derive(Debug, Clone)]
struct Document {
    source: String,
    value: serde_json::Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    fn load(&self) -> Result<Schema> {
        let src = std::fs::read_to_string(&self.schema)
            .with_context(|| format!("failed to read schema {}", self.schema.display()))?;
        let schema = salad_doc::load_schema_str(&src)
            .with_context(|| format!("invalid schema {}", self.schema.display()))?;
        if schema.record(&self.root).is_none() {
            bail!("`{}` is not a record type of {}", self.root, self.schema.display());
        }
        info!(types = schema.len(), root = %self.root, "schema loaded");
        Ok(schema)
    }

    fn options(&self) -> DecodeOptions {
        let unknown_fields = if self.permissive { UnknownFields::Ignore } else { UnknownFields::Reject };
        DecodeOptions { unknown_fields, ..DecodeOptions::default() }
            .with_extension_fields(!self.no_extensions)
            .with_max_depth(self.max_depth)
    }
}

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let mut out = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;
            for (label, value) in self.parse_source(&source_path_str, &source)? {
                self.select(label, value, &mut out)?;
            }
        }
        debug!(documents = out.len(), "inputs loaded");
        Ok(out)
    }

    fn parse_source(&self, path: &str, source: &str) -> Result<Vec<(String, serde_json::Value)>> {
        if !self.ndjson {
            let value = serde_json::from_str::<serde_json::Value>(source)
                .with_context(|| format!("failed to parse JSON source file ({path})"))?;
            return Ok(vec![(path.to_string(), value)]);
        }
        source
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(ix, line)| {
                let label = format!("{path}:{}", ix + 1);
                serde_json::from_str::<serde_json::Value>(line)
                    .with_context(|| format!("failed to parse NDJSON line ({label})"))
                    .map(|value| (label, value))
            })
            .collect()
    }

    /// Applies `--json-pointer` then `--jq-expr`.
    fn select(&self, label: String, value: serde_json::Value, out: &mut Vec<Document>) -> Result<()> {
        let value = match self.json_pointer.as_deref() {
            None => value,
            Some(pointer) => value
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| anyhow!("no node at JSON pointer {pointer} in {label}"))?,
        };
        match self.jq_expr.as_ref() {
            None => out.push(Document { source: label, value }),
            Some(jq_expr) => {
                let results = crate::jq_exec::run_jaq(jq_expr, &value)
                    .with_context(|| format!("failed to apply jq expression to {label}"))?;
                let fan_out = results.len() > 1;
                for (ix, value) in results.into_iter().enumerate() {
                    let source = if fan_out { format!("{label}#{ix}") } else { label.clone() };
                    out.push(Document { source, value });
                }
            }
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn run(&self) -> Result<ExitCode> {
        match &self.cmd {
            Command::Check(target) => target.run(),
            Command::Convert(target) => target.run(),
        }
    }
}

impl CheckCmd {
    fn run(&self) -> Result<ExitCode> {
        let schema = self.schema_settings.load()?;
        let decoder = schema.decoder_with(self.schema_settings.options());
        let documents = self.input_settings.load_documents()?;
        let root = self.schema_settings.root.as_str();

        let results: Vec<Result<(), DecodeError>> = documents
            .par_iter()
            .map(|doc| decoder.decode_record(root, &Node::from(&doc.value)).map(|_| ()))
            .collect();

        let mut failed = 0usize;
        for (doc, result) in documents.iter().zip(&results) {
            match result {
                Ok(()) => println!("{} {}", "✓".green(), doc.source),
                Err(error) => {
                    failed += 1;
                    println!("{} {}: {error}", "✗".red(), doc.source);
                    let innermost = error.innermost();
                    if innermost != error {
                        println!("    {} {innermost}", "↳".dimmed());
                    }
                }
            }
        }
        let summary = format!("{} of {} documents conform", documents.len() - failed, documents.len());
        if failed == 0 {
            eprintln!("{}", summary.green());
            Ok(ExitCode::SUCCESS)
        } else {
            eprintln!("{}", summary.red());
            Ok(ExitCode::FAILURE)
        }
    }
}

impl ConvertCmd {
    fn run(&self) -> Result<ExitCode> {
        let schema = self.schema_settings.load()?;
        let decoder = schema.decoder_with(self.schema_settings.options());
        let encoder = schema.encoder();
        let documents = self.input_settings.load_documents()?;
        let root = self.schema_settings.root.as_str();

        let converted = documents
            .par_iter()
            .map(|doc| -> Result<serde_json::Value> {
                let record = decoder
                    .decode_record(root, &Node::from(&doc.value))
                    .with_context(|| format!("{} does not conform to `{root}`", doc.source))?;
                Ok(serde_json::Value::from(encoder.encode_record(&record)))
            })
            .collect::<Result<Vec<_>>>()?;

        let rendered = if self.input_settings.ndjson {
            let mut lines = Vec::with_capacity(converted.len());
            for value in &converted {
                lines.push(serde_json::to_string(value)?);
            }
            lines.join("\n")
        } else if let [single] = converted.as_slice() {
            serde_json::to_string_pretty(single)?
        } else {
            serde_json::to_string_pretty(&converted)?
        };

        match self.out.as_ref() {
            Some(out) => write_output(out, &rendered)?,
            None => println!("{rendered}"),
        }
        Ok(ExitCode::SUCCESS)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_output(out: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(out, contents).with_context(|| format!("failed to write {}", out.display()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
