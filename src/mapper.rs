//! Stage 1: rename raw columns onto working fields.

use std::collections::{BTreeMap, HashSet};

use itertools::Itertools;
use log::debug;

use crate::model::{Issue, RawTable, WorkingField, WorkingTable};

/// Renames columns per `column_mapping`, collapses duplicate names (leftmost
/// wins) and guarantees that every [`WorkingField`] exists as a column.
pub fn map(
    raw: RawTable,
    column_mapping: &BTreeMap<String, WorkingField>,
) -> (WorkingTable, Vec<Issue>) {
    let mut issues = Vec::new();
    let RawTable { headers, rows } = raw;

    let renamed = headers
        .iter()
        .map(|name| {
            column_mapping
                .get(name)
                .map(|field| field.as_str().to_string())
                .unwrap_or_else(|| name.clone())
        })
        .collect::<Vec<_>>();
    debug!(
        "Renamed {} of {} column(s)",
        headers
            .iter()
            .filter(|h| column_mapping.contains_key(h.as_str()))
            .count(),
        headers.len()
    );

    let keep = {
        let mut seen = HashSet::new();
        renamed
            .iter()
            .map(|name| seen.insert(name.as_str()))
            .collect::<Vec<_>>()
    };

    if keep.iter().any(|kept| !kept) {
        let dropped = keep.iter().positions(|kept| !kept).collect::<Vec<_>>();
        let targets = dropped.iter().map(|&idx| renamed[idx].as_str()).unique().join(", ");
        let sources = dropped.iter().map(|&idx| headers[idx].as_str()).unique().join(", ");
        issues.push(Issue::new(format!(
            "Duplicate columns after rename: [{targets}] from source columns [{sources}] (kept first occurrence)."
        )));
    }

    let kept_headers = renamed
        .into_iter()
        .zip(&keep)
        .filter_map(|(name, kept)| kept.then_some(name))
        .collect::<Vec<_>>();
    let kept_rows = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(keep.iter().chain(std::iter::repeat(&false)))
                .filter_map(|(cell, kept)| kept.then_some(cell))
                .collect()
        })
        .collect();

    let mut table = WorkingTable::new(kept_headers, kept_rows);
    for field in WorkingField::ALL {
        table.ensure_column(field.as_str());
    }
    (table, issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellValue;

    fn mapping(pairs: &[(&str, WorkingField)]) -> BTreeMap<String, WorkingField> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn renames_and_materializes_working_fields() {
        let raw = RawTable::from_text(&["Txn Date", "Memo", "Ref"], &[&["2024-01-01", "Coffee", "77"]]);
        let (table, issues) = map(
            raw,
            &mapping(&[
                ("Txn Date", WorkingField::Date),
                ("Memo", WorkingField::Description),
                ("Not There", WorkingField::Source),
            ]),
        );
        assert!(issues.is_empty());
        assert_eq!(&table.headers()[..3], &["date", "description", "Ref"]);
        for field in WorkingField::ALL {
            assert!(table.has_column(field.as_str()), "missing {field}");
        }
        assert_eq!(table.value(0, "Ref"), &CellValue::from("77"));
        assert_eq!(table.value(0, "balance"), &CellValue::Empty);
    }

    #[test]
    fn duplicates_keep_leftmost_column() {
        let raw = RawTable::from_text(&["A", "date", "A"], &[&["first", "second", "third"]]);
        let (table, issues) = map(
            raw,
            &mapping(&[("A", WorkingField::Date), ("date", WorkingField::Date)]),
        );
        assert_eq!(issues.len(), 1);
        assert!(issues[0].as_str().contains('A'));
        assert_eq!(table.value(0, "date"), &CellValue::from("first"));
        assert_eq!(table.headers().iter().filter(|h| *h == "date").count(), 1);
    }

    #[test]
    fn short_rows_are_padded() {
        let mut raw = RawTable::new(vec!["Date".into(), "Amt".into()]);
        raw.push_row(vec![CellValue::from("2024-01-01")]);
        let (table, _) = map(raw, &mapping(&[("Amt", WorkingField::Amount)]));
        assert_eq!(table.value(0, "amount"), &CellValue::Empty);
    }
}
