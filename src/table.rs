//! Fixed-width terminal rendering for canonical rows and issue lists.

use std::{borrow::Cow, fmt::Write as _};

use crate::model::{CanonicalTable, Issue};

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(cell));
        }
    }
    for width in &mut widths {
        *width = (*width).max(3);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

pub fn render_canonical(table: &CanonicalTable) -> String {
    let rows = table.iter().map(|row| row.to_record()).collect::<Vec<_>>();
    render_table(&CanonicalTable::headers(), &rows)
}

pub fn render_issues(issues: &[Issue]) -> String {
    if issues.is_empty() {
        return "No data quality issues.\n".to_string();
    }
    let mut output = format!("{} data quality issue(s):\n", issues.len());
    for (idx, issue) in issues.iter().enumerate() {
        let _ = writeln!(output, "  {}. {}", idx + 1, sanitize_cell(issue.as_str()));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

/// Numeric cells are right-aligned, everything else left-aligned.
fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let sanitized = sanitize_cell(value);
            let padding = width.saturating_sub(display_width(&sanitized));
            if looks_numeric(&sanitized) {
                format!("{}{sanitized}", " ".repeat(padding))
            } else {
                format!("{sanitized}{}", " ".repeat(padding))
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.truncate(line.trim_end().len());
    line
}

fn looks_numeric(value: &str) -> bool {
    value.parse::<rust_decimal::Decimal>().is_ok()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
