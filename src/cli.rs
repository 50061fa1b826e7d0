use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::inference::DEFAULT_PREVIEW_ROWS;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Normalize bank and card statement exports into canonical cash-flow rows",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Apply a normalization spec to a statement CSV
    Normalize(NormalizeArgs),
    /// Show the header signature and row sample used for spec inference
    Preview(PreviewArgs),
    /// Load and validate a normalization spec without reading any data
    CheckSpec(CheckSpecArgs),
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Input statement CSV (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Normalization spec (.yaml, .yml or .json)
    #[arg(short = 's', long = "spec")]
    pub spec: PathBuf,
    /// Canonical CSV output (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Write issues and quality stats as JSON to this file
    #[arg(long = "issues")]
    pub issues: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Render the canonical rows and issues as a table to stdout
    #[arg(long = "table", conflicts_with = "report_context")]
    pub table: bool,
    /// Print the report-generator context (canonical CSV plus issues)
    #[arg(long = "report-context")]
    pub report_context: bool,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Input statement CSV (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Maximum number of sample rows (half from the head, the rest from the tail)
    #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
    pub rows: usize,
    /// CSV delimiter character
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding for input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Render the sample as a table instead of JSON
    #[arg(long = "table")]
    pub table: bool,
}

#[derive(Debug, Args)]
pub struct CheckSpecArgs {
    /// Normalization spec (.yaml, .yml or .json)
    #[arg(short = 's', long = "spec")]
    pub spec: PathBuf,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
