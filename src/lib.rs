pub mod classify;
pub mod cli;
pub mod dates;
pub mod engine;
pub mod error;
pub mod export;
pub mod finalize;
pub mod inference;
pub mod io_utils;
pub mod mapper;
pub mod model;
mod normalize_cmd;
pub mod numeric;
mod preview;
pub mod resolver;
pub mod spec;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

pub use crate::{
    engine::{NormalizationOutcome, normalize},
    error::SpecError,
    model::{CanonicalRow, CanonicalTable, CellValue, Direction, Issue, RawTable},
    spec::{AmountLogic, ClassifyRule, DateRules, NormalizationSpec},
};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("cashflow_normalize", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Normalize(args) => normalize_cmd::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::CheckSpec(args) => handle_check_spec(&args),
    }
}

fn handle_check_spec(args: &cli::CheckSpecArgs) -> Result<()> {
    let spec = NormalizationSpec::load(&args.spec)
        .with_context(|| format!("Loading spec from {:?}", args.spec))?;
    spec.validate()
        .with_context(|| format!("Validating spec {:?}", args.spec))?;
    info!(
        "Spec {:?} is valid: {} mapped column(s), amount logic {}, {} date format(s), {} classify rule(s)",
        args.spec,
        spec.column_mapping.len(),
        spec.amount_logic
            .as_ref()
            .map(|logic| logic.mode())
            .unwrap_or("incomplete"),
        spec.date_rules.known_formats.len(),
        spec.classify_rules.len()
    );
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
