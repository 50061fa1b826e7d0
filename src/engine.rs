//! Runs the four normalization stages over one table.
//!
//! The engine is a pure transform: it reads nothing but its arguments, keeps
//! no state between calls and never fails on data. The only error it returns
//! is a malformed [`NormalizationSpec`], detected before any row is touched.

use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    classify::classify,
    error::SpecError,
    finalize::{QualityStats, finalize},
    mapper::map,
    model::{CanonicalTable, Issue, RawTable},
    resolver::resolve,
    spec::NormalizationSpec,
};

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NormalizationOutcome {
    pub table: CanonicalTable,
    pub issues: Vec<Issue>,
    pub stats: QualityStats,
}

/// Normalizes `raw` into the canonical table. Issues from every stage are
/// returned in stage order.
pub fn normalize(raw: RawTable, spec: &NormalizationSpec) -> Result<NormalizationOutcome, SpecError> {
    spec.validate()?;
    let mut issues = Vec::new();

    debug!(
        "Normalizing {} row(s) across {} column(s)",
        raw.len(),
        raw.headers.len()
    );
    let (table, mapped_issues) = map(raw, &spec.column_mapping);
    issues.extend(mapped_issues);

    let resolution = resolve(table, spec.amount_logic.as_ref(), &spec.date_rules);
    issues.extend(resolution.issues);
    debug!(
        "Resolved amounts using {}",
        spec.amount_logic
            .as_ref()
            .map(|logic| logic.mode())
            .unwrap_or("numeric fallback")
    );

    let (table, classify_issues) = classify(resolution.table, &spec.classify_rules);
    issues.extend(classify_issues);

    let (table, finalize_issues, stats) = finalize(table, resolution.date_failure_ratio);
    issues.extend(finalize_issues);

    for issue in &issues {
        warn!("{issue}");
    }
    info!(
        "Normalized {} of {} row(s) with {} issue(s)",
        stats.output_rows,
        stats.input_rows,
        issues.len()
    );
    Ok(NormalizationOutcome {
        table,
        issues,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::AmountLogic;

    #[test]
    fn invalid_spec_fails_before_rows_are_read() {
        let spec = NormalizationSpec {
            amount_logic: Some(AmountLogic::DebitCredit {
                debit_col: "Out".into(),
                credit_col: String::new(),
            }),
            ..Default::default()
        };
        let raw = RawTable::from_text(&["Out"], &[&["1"]]);
        assert!(matches!(
            normalize(raw, &spec),
            Err(SpecError::MissingColumnReference { field: "credit_col", .. })
        ));
    }

    #[test]
    fn empty_input_yields_empty_outcome() {
        let spec = NormalizationSpec {
            amount_logic: Some(AmountLogic::SignedAmount {
                amount_col: "amount".into(),
            }),
            ..Default::default()
        };
        let outcome = normalize(RawTable::new(vec!["date".into()]), &spec).unwrap();
        assert!(outcome.table.is_empty());
        assert!(outcome.issues.is_empty());
        assert_eq!(outcome.stats, QualityStats::default());
    }
}
