//! Stage 2: resolve the parsed `date`, the signed `amount` and the derived
//! `direction` of every row.
//!
//! Amount resolution dispatches on [`AmountLogic`]. Whatever the mode, the
//! outcome is one `Decimal` per row, and `direction` is derived from it once
//! afterwards.

use chrono::NaiveDate;
use itertools::Itertools;
use log::debug;
use rust_decimal::Decimal;

use crate::{
    dates::parse_date_cell,
    finalize::ratio,
    model::{CellValue, Direction, Issue, WorkingTable},
    numeric::coerce_amount,
    spec::{AmountLogic, DateRules},
};

#[derive(Debug, Clone)]
pub struct Resolution {
    pub table: WorkingTable,
    pub issues: Vec<Issue>,
    /// Share of rows whose date did not parse, measured before any drop.
    pub date_failure_ratio: f64,
}

pub fn resolve(
    mut table: WorkingTable,
    amount_logic: Option<&AmountLogic>,
    date_rules: &DateRules,
) -> Resolution {
    let mut issues = Vec::new();

    let dates = table
        .column_or_empty("date")
        .into_iter()
        .map(|cell| parse_date_cell(cell, &date_rules.known_formats))
        .collect::<Vec<Option<NaiveDate>>>();
    let failures = dates.iter().filter(|d| d.is_none()).count();
    let date_failure_ratio = ratio(failures, dates.len());
    debug!(
        "Parsed {} of {} date(s)",
        dates.len() - failures,
        dates.len()
    );
    table.set_column("date", dates.into_iter().map(CellValue::from).collect());

    let amounts = resolve_amounts(&table, amount_logic, &mut issues);
    let directions = amounts
        .iter()
        .map(|amount| CellValue::from(Direction::from_amount(amount).map(|d| d.as_str())))
        .collect();
    table.set_column(
        "amount",
        amounts.into_iter().map(CellValue::Decimal).collect(),
    );
    table.set_column("direction", directions);

    Resolution {
        table,
        issues,
        date_failure_ratio,
    }
}

fn resolve_amounts(
    table: &WorkingTable,
    amount_logic: Option<&AmountLogic>,
    issues: &mut Vec<Issue>,
) -> Vec<Decimal> {
    match amount_logic {
        Some(AmountLogic::SignedAmount { amount_col }) => {
            if table.has_column(amount_col) {
                coerce_column(table, amount_col)
            } else {
                issues.push(Issue::new(format!(
                    "Amount column '{amount_col}' not found for signed_amount mode; defaulting to existing 'amount'."
                )));
                coerce_column(table, "amount")
            }
        }
        Some(AmountLogic::DebitCredit {
            debit_col,
            credit_col,
        }) => {
            let missing = [debit_col, credit_col]
                .into_iter()
                .filter(|col| !table.has_column(col))
                .collect::<Vec<_>>();
            if !missing.is_empty() {
                let detail = format!("debit_credit columns not found: {}", missing.iter().join(", "));
                return numeric_fallback(table, Some(&detail), issues);
            }
            let debits = coerce_column(table, debit_col);
            let credits = coerce_column(table, credit_col);
            let both_populated = debits
                .iter()
                .zip(&credits)
                .filter(|(debit, credit)| !debit.is_zero() && !credit.is_zero())
                .count();
            if both_populated > 0 {
                issues.push(Issue::new(format!(
                    "{both_populated} rows have BOTH debit and credit populated; using amount = credit - debit."
                )));
            }
            debits
                .into_iter()
                .zip(credits)
                .map(|(debit, credit)| debit_credit_amount(debit, credit))
                .collect()
        }
        Some(AmountLogic::TypeFlag {
            type_col,
            amount_col,
            credit_tokens,
            debit_tokens,
        }) => {
            let base_col = match amount_col.as_deref() {
                Some(col) if table.has_column(col) => col,
                Some(col) => {
                    issues.push(Issue::new(format!(
                        "Amount column '{col}' not found for type_flag mode; using existing 'amount' as the base."
                    )));
                    "amount"
                }
                None => "amount",
            };
            let base = coerce_column(table, base_col);
            let Some(flags) = table.column(type_col) else {
                issues.push(Issue::new(format!(
                    "Type column '{type_col}' not found for type_flag mode; amounts kept unsigned."
                )));
                return base;
            };
            if credit_tokens.is_empty() && debit_tokens.is_empty() {
                issues.push(Issue::new(format!(
                    "No credit or debit tokens for type column '{type_col}' in type_flag mode; amounts kept as read."
                )));
            }

            let credit_tokens = uppercase_tokens(credit_tokens);
            let debit_tokens = uppercase_tokens(debit_tokens);
            let mut unmatched = 0usize;
            let amounts = base
                .into_iter()
                .zip(flags)
                .map(|(magnitude, flag)| {
                    signed_by_type(magnitude, &flag.as_display(), &credit_tokens, &debit_tokens)
                        .unwrap_or_else(|| {
                            unmatched += 1;
                            magnitude
                        })
                })
                .collect();
            if unmatched > 0 {
                debug!("{unmatched} row(s) matched no type token in '{type_col}'; sign left as read");
            }
            amounts
        }
        None => numeric_fallback(table, None, issues),
    }
}

fn numeric_fallback(table: &WorkingTable, detail: Option<&str>, issues: &mut Vec<Issue>) -> Vec<Decimal> {
    let message = match detail {
        Some(detail) => format!(
            "Amount logic incomplete in spec ({detail}); coerced 'amount' numerically as fallback."
        ),
        None => "Amount logic incomplete in spec; coerced 'amount' numerically as fallback."
            .to_string(),
    };
    issues.push(Issue::new(message));
    coerce_column(table, "amount")
}

fn coerce_column(table: &WorkingTable, name: &str) -> Vec<Decimal> {
    table
        .column_or_empty(name)
        .into_iter()
        .map(coerce_amount)
        .collect()
}

fn uppercase_tokens(tokens: &[String]) -> Vec<String> {
    tokens.iter().map(|t| t.to_uppercase()).collect()
}

/// Inflow is credit minus debit.
pub fn debit_credit_amount(debit: Decimal, credit: Decimal) -> Decimal {
    credit.checked_sub(debit).unwrap_or(Decimal::ZERO)
}

/// Signs `magnitude` by token membership in `type_value`. Credit tokens are
/// checked before debit tokens; tokens are expected upper-case. Returns
/// `None` when no token occurs in the value.
pub fn signed_by_type(
    magnitude: Decimal,
    type_value: &str,
    credit_tokens: &[String],
    debit_tokens: &[String],
) -> Option<Decimal> {
    let flag = type_value.to_uppercase();
    if credit_tokens.iter().any(|token| flag.contains(token.as_str())) {
        Some(magnitude.abs())
    } else if debit_tokens.iter().any(|token| flag.contains(token.as_str())) {
        Some(-magnitude.abs())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::model::RawTable;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn working(headers: &[&str], rows: &[&[&str]]) -> WorkingTable {
        let raw = RawTable::from_text(headers, rows);
        let (table, _) = crate::mapper::map(raw, &Default::default());
        table
    }

    fn amounts(resolution: &Resolution) -> Vec<CellValue> {
        resolution
            .table
            .column_or_empty("amount")
            .into_iter()
            .cloned()
            .collect()
    }

    #[test]
    fn debit_credit_subtracts_and_counts_ambiguous_rows() {
        let table = working(
            &["date", "debit", "credit"],
            &[
                &["2024-01-01", "5", "0"],
                &["2024-01-02", "0", "5"],
                &["2024-01-03", "5", "5"],
            ],
        );
        let logic = AmountLogic::DebitCredit {
            debit_col: "debit".into(),
            credit_col: "credit".into(),
        };
        let resolution = resolve(table, Some(&logic), &DateRules::default());
        assert_eq!(
            amounts(&resolution),
            vec![
                CellValue::Decimal(dec("-5")),
                CellValue::Decimal(dec("5")),
                CellValue::Decimal(Decimal::ZERO),
            ]
        );
        assert_eq!(resolution.issues.len(), 1);
        assert!(resolution.issues[0].as_str().starts_with("1 rows have BOTH"));
        assert_eq!(resolution.table.value(2, "direction"), &CellValue::Empty);
        assert_eq!(
            resolution.table.value(0, "direction"),
            &CellValue::from("outflow")
        );
    }

    #[test]
    fn type_flag_signs_by_token() {
        let table = working(
            &["date", "amount", "type"],
            &[
                &["2024-01-01", "100", "DEBIT PURCHASE"],
                &["2024-01-02", "-40", "credit memo"],
                &["2024-01-03", "-7", "ADJUSTMENT"],
            ],
        );
        let logic = AmountLogic::TypeFlag {
            type_col: "type".into(),
            amount_col: None,
            credit_tokens: vec!["CREDIT".into()],
            debit_tokens: vec!["DEBIT".into()],
        };
        let resolution = resolve(table, Some(&logic), &DateRules::default());
        assert_eq!(
            amounts(&resolution),
            vec![
                CellValue::Decimal(dec("-100")),
                CellValue::Decimal(dec("40")),
                CellValue::Decimal(dec("-7")),
            ]
        );
        assert!(resolution.issues.is_empty());
    }

    #[test]
    fn type_flag_without_tokens_keeps_amounts_and_reports_once() {
        let table = working(
            &["date", "amount", "type"],
            &[&["2024-01-01", "100", "DEBIT"], &["2024-01-02", "-40", "CREDIT"]],
        );
        let logic = AmountLogic::TypeFlag {
            type_col: "type".into(),
            amount_col: None,
            credit_tokens: Vec::new(),
            debit_tokens: Vec::new(),
        };
        let resolution = resolve(table, Some(&logic), &DateRules::default());
        assert_eq!(
            amounts(&resolution),
            vec![CellValue::Decimal(dec("100")), CellValue::Decimal(dec("-40"))]
        );
        assert_eq!(resolution.issues.len(), 1);
        assert!(resolution.issues[0].as_str().starts_with("No credit or debit tokens"));
    }

    #[test]
    fn signed_amount_falls_back_when_column_missing() {
        let table = working(&["date", "amount"], &[&["2024-01-01", "(12.50)"]]);
        let logic = AmountLogic::SignedAmount {
            amount_col: "Value".into(),
        };
        let resolution = resolve(table, Some(&logic), &DateRules::default());
        assert_eq!(amounts(&resolution), vec![CellValue::Decimal(dec("-12.50"))]);
        assert!(resolution.issues[0].as_str().contains("'Value'"));
    }

    #[test]
    fn missing_logic_uses_numeric_fallback() {
        let table = working(&["date", "amount"], &[&["2024-01-01", "$9"]]);
        let resolution = resolve(table, None, &DateRules::default());
        assert_eq!(amounts(&resolution), vec![CellValue::Decimal(dec("9"))]);
        assert!(resolution.issues[0].as_str().starts_with("Amount logic incomplete"));
    }

    #[test]
    fn date_failures_are_measured_not_dropped() {
        let table = working(
            &["date"],
            &[&["2024-01-01"], &["garbage"], &[""], &["2024-01-04"]],
        );
        let resolution = resolve(table, None, &DateRules::default());
        assert_eq!(resolution.table.len(), 4);
        assert!((resolution.date_failure_ratio - 0.5).abs() < f64::EPSILON);
        assert_eq!(resolution.table.value(1, "date"), &CellValue::Empty);
    }

    #[test]
    fn signed_by_type_prefers_credit_tokens() {
        let credits = vec!["CR".to_string()];
        let debits = vec!["DR".to_string()];
        assert_eq!(signed_by_type(dec("3"), "cr/dr", &credits, &debits), Some(dec("3")));
        assert_eq!(signed_by_type(dec("3"), "dr", &credits, &debits), Some(dec("-3")));
        assert_eq!(signed_by_type(dec("3"), "xx", &credits, &debits), None);
    }
}
