//! Stage 4: quality gate, row drop, ordering and projection onto the
//! canonical columns.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    dates::parse_date_cell,
    model::{CanonicalRow, CanonicalTable, Issue, WorkingTable},
    numeric::{coerce_amount, parse_strict_decimal},
};

/// Date failures above this share of input rows are reported.
pub const DATE_FAILURE_THRESHOLD: f64 = 0.10;
/// Zero or unparsable amounts above this share of input rows are reported.
pub const ZERO_AMOUNT_THRESHOLD: f64 = 0.20;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QualityStats {
    pub input_rows: usize,
    pub output_rows: usize,
    pub dropped_rows: usize,
    pub date_failure_ratio: f64,
    pub zero_amount_ratio: f64,
}

/// `count / total`, or 0 for an empty table.
pub(crate) fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

pub fn finalize(
    table: WorkingTable,
    date_failure_ratio: f64,
) -> (CanonicalTable, Vec<Issue>, QualityStats) {
    let mut issues = Vec::new();
    let input_rows = table.len();

    if date_failure_ratio > DATE_FAILURE_THRESHOLD {
        issues.push(Issue::new(format!(
            ">10% unparsable dates (actual: {:.1}%).",
            date_failure_ratio * 100.0
        )));
    }

    let zero_amounts = table
        .column_or_empty("amount")
        .into_iter()
        .filter(|cell| coerce_amount(cell).is_zero())
        .count();
    let zero_amount_ratio = ratio(zero_amounts, input_rows);
    if zero_amount_ratio > ZERO_AMOUNT_THRESHOLD {
        issues.push(Issue::new(format!(
            ">20% zero/invalid amounts (actual: {:.1}%).",
            zero_amount_ratio * 100.0
        )));
    }

    let mut rows = project(&table);
    rows.sort_by_key(|row| row.date);
    let output_rows = rows.len();
    debug!(
        "Dropped {} row(s) without a parsed date; {output_rows} remain",
        input_rows - output_rows
    );

    let stats = QualityStats {
        input_rows,
        output_rows,
        dropped_rows: input_rows - output_rows,
        date_failure_ratio,
        zero_amount_ratio,
    };
    (CanonicalTable { rows }, issues, stats)
}

/// Builds canonical rows, skipping rows with no date.
fn project(table: &WorkingTable) -> Vec<CanonicalRow> {
    (0..table.len())
        .filter_map(|row| {
            let cell = |name: &str| table.value(row, name);
            let date = parse_date_cell(cell("date"), &[])?;
            Some(CanonicalRow {
                date,
                description: cell("description").as_text().unwrap_or_default(),
                amount: parse_strict_decimal(cell("amount")),
                direction: cell("direction")
                    .as_text()
                    .and_then(|text| text.parse().ok()),
                category: cell("category").as_text(),
                balance: parse_strict_decimal(cell("balance")),
                source: cell("source").as_text(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;
    use crate::model::CellValue;

    fn table(rows: Vec<Vec<CellValue>>) -> WorkingTable {
        WorkingTable::new(
            vec![
                "date".into(),
                "description".into(),
                "amount".into(),
                "direction".into(),
                "balance".into(),
            ],
            rows,
        )
    }

    fn date(d: u32) -> CellValue {
        CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, d).unwrap())
    }

    #[test]
    fn drops_undated_rows_and_sorts_stably() {
        let working = table(vec![
            vec![date(3), "late".into(), Decimal::ONE.into(), "inflow".into(), CellValue::Empty],
            vec![CellValue::Empty, "lost".into(), Decimal::ONE.into(), "inflow".into(), CellValue::Empty],
            vec![date(1), "first".into(), Decimal::ONE.into(), "inflow".into(), CellValue::Empty],
            vec![date(1), "second".into(), Decimal::ONE.into(), "inflow".into(), CellValue::Empty],
        ]);
        let (canonical, issues, stats) = finalize(working, 0.25);
        let descriptions = canonical
            .iter()
            .map(|r| r.description.as_str())
            .collect::<Vec<_>>();
        assert_eq!(descriptions, vec!["first", "second", "late"]);
        assert_eq!(stats.dropped_rows, 1);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].as_str(), ">10% unparsable dates (actual: 25.0%).");
    }

    #[test]
    fn zero_amount_ratio_is_measured_before_the_drop() {
        let working = table(vec![
            vec![date(1), "a".into(), Decimal::ZERO.into(), CellValue::Empty, CellValue::Empty],
            vec![date(2), "b".into(), Decimal::TEN.into(), "inflow".into(), CellValue::Empty],
            vec![date(3), "c".into(), Decimal::TEN.into(), "inflow".into(), CellValue::Empty],
            vec![CellValue::Empty, "d".into(), Decimal::TEN.into(), "inflow".into(), CellValue::Empty],
        ]);
        let (_, issues, stats) = finalize(working, 0.0);
        assert!((stats.zero_amount_ratio - 0.25).abs() < f64::EPSILON);
        assert_eq!(issues, vec![Issue::new(">20% zero/invalid amounts (actual: 25.0%).")]);
    }

    #[test]
    fn unparsable_balance_becomes_null() {
        let working = table(vec![vec![
            date(1),
            CellValue::Empty,
            Decimal::ONE.into(),
            "inflow".into(),
            "n/a".into(),
        ]]);
        let (canonical, _, _) = finalize(working, 0.0);
        let row = &canonical.rows[0];
        assert_eq!(row.description, "");
        assert_eq!(row.balance, None);
        assert_eq!(row.category, None);
        assert_eq!(row.amount, Some(Decimal::ONE));
    }

    #[test]
    fn empty_table_reports_nothing() {
        let (canonical, issues, stats) = finalize(WorkingTable::default(), 0.0);
        assert!(canonical.is_empty());
        assert!(issues.is_empty());
        assert_eq!(stats.zero_amount_ratio, 0.0);
    }
}
