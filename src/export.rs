//! Serialization of canonical tables for files and for the report generator.

use std::io::Write;

use anyhow::{Context, Result};

use crate::model::{CanonicalTable, Issue};

/// Writes a header row of the canonical column names followed by one record
/// per row. Absent values are written as empty fields.
pub fn write_canonical_csv<W: Write>(table: &CanonicalTable, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer
        .write_record(CanonicalTable::headers())
        .context("Writing canonical header")?;
    for (idx, row) in table.iter().enumerate() {
        writer
            .write_record(row.to_record())
            .with_context(|| format!("Writing canonical row {}", idx + 1))?;
    }
    writer.flush().context("Flushing canonical output")?;
    Ok(())
}

pub fn canonical_csv_string(table: &CanonicalTable) -> Result<String> {
    let mut buffer = Vec::new();
    write_canonical_csv(table, &mut buffer)?;
    String::from_utf8(buffer).context("Canonical output is not valid UTF-8")
}

/// Plain-text context handed to a report generator: the canonical CSV, then
/// the data quality issues.
pub fn report_context(table: &CanonicalTable, issues: &[Issue]) -> Result<String> {
    let mut context = canonical_csv_string(table)?;
    if !context.ends_with('\n') {
        context.push('\n');
    }
    context.push_str("\nData quality issues:\n");
    if issues.is_empty() {
        context.push_str("- none\n");
    }
    for issue in issues {
        context.push_str("- ");
        context.push_str(issue.as_str());
        context.push('\n');
    }
    Ok(context)
}
