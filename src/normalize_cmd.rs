use std::{fs::File, io::BufWriter, path::Path};

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::{
    cli::NormalizeArgs,
    engine::{self, NormalizationOutcome},
    export,
    finalize::QualityStats,
    io_utils,
    model::Issue,
    spec::NormalizationSpec,
    table,
};

#[derive(Debug, Serialize)]
struct IssueReport<'a> {
    input: String,
    issues: &'a [Issue],
    stats: &'a QualityStats,
}

pub fn execute(args: &NormalizeArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let output_path = args.output.as_deref();
    info!(
        "Normalizing '{}' with spec {:?} -> {} (delimiter '{}')",
        args.input.display(),
        args.spec,
        output_path
            .filter(|p| !io_utils::is_dash(p))
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".into()),
        crate::printable_delimiter(delimiter)
    );

    let spec = NormalizationSpec::load(&args.spec)
        .with_context(|| format!("Loading spec from {:?}", args.spec))?;
    spec.validate()
        .with_context(|| format!("Validating spec {:?}", args.spec))?;
    let raw = io_utils::read_raw_table_from_path(&args.input, delimiter, encoding)?;
    let outcome = engine::normalize(raw, &spec)
        .with_context(|| format!("Normalizing {:?}", args.input))?;

    if let Some(path) = &args.issues {
        write_issue_report(path, &args.input, &outcome)?;
    }
    emit(args, &outcome)?;
    info!(
        "Wrote {} canonical row(s) ({} dropped, {} issue(s))",
        outcome.stats.output_rows,
        outcome.stats.dropped_rows,
        outcome.issues.len()
    );
    Ok(())
}

fn emit(args: &NormalizeArgs, outcome: &NormalizationOutcome) -> Result<()> {
    let output_path = args.output.as_deref();
    let writing_to_stdout = output_path.is_none_or(io_utils::is_dash);

    if args.table && writing_to_stdout {
        print!("{}", table::render_canonical(&outcome.table));
        print!("{}", table::render_issues(&outcome.issues));
        return Ok(());
    }
    if args.report_context && writing_to_stdout {
        print!(
            "{}",
            export::report_context(&outcome.table, &outcome.issues)?
        );
        return Ok(());
    }

    let writer = io_utils::open_output(output_path)?;
    export::write_canonical_csv(&outcome.table, writer)?;
    if args.table {
        print!("{}", table::render_issues(&outcome.issues));
    }
    if args.report_context {
        print!(
            "{}",
            export::report_context(&outcome.table, &outcome.issues)?
        );
    }
    Ok(())
}

fn write_issue_report(path: &Path, input: &Path, outcome: &NormalizationOutcome) -> Result<()> {
    let report = IssueReport {
        input: input.display().to_string(),
        issues: &outcome.issues,
        stats: &outcome.stats,
    };
    let file = File::create(path).with_context(|| format!("Creating issue report {path:?}"))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &report)
        .with_context(|| format!("Writing issue report {path:?}"))?;
    info!(
        "Issue report with {} issue(s) written to {path:?}",
        outcome.issues.len()
    );
    Ok(())
}
