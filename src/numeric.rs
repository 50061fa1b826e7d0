//! Numeric coercion for amount-bearing cells.
//!
//! Two policies live here:
//!
//! - [`coerce_amount`] is forgiving: it strips currency symbols, thousands
//!   separators and stray text, honours accounting parentheses, and falls back
//!   to zero. Used while resolving amounts.
//! - [`parse_strict_decimal`] only accepts a cell that already is a number
//!   and yields `None` otherwise. Used when projecting the final table.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::model::CellValue;

pub fn coerce_amount(cell: &CellValue) -> Decimal {
    match cell {
        CellValue::Decimal(d) => normalize_zero(*d),
        CellValue::Integer(i) => Decimal::from(*i),
        other => coerce_amount_str(&other.as_display()),
    }
}

/// `"(1,234.50)"` is `-1234.50`; anything unparsable is zero.
pub fn coerce_amount_str(raw: &str) -> Decimal {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '(' | ')'))
        .collect();
    let parenthesized = kept.starts_with('(') && kept.ends_with(')');
    let body = kept.trim_matches(|c| c == '(' || c == ')');
    let value = Decimal::from_str(body).unwrap_or(Decimal::ZERO);
    normalize_zero(if parenthesized { -value.abs() } else { value })
}

pub fn parse_strict_decimal(cell: &CellValue) -> Option<Decimal> {
    match cell {
        CellValue::Decimal(d) => Some(*d),
        CellValue::Integer(i) => Some(Decimal::from(*i)),
        CellValue::Float(f) if !f.is_finite() => None,
        CellValue::Empty | CellValue::Date(_) => None,
        other => {
            let text = other.as_display();
            let trimmed = text.trim();
            Decimal::from_str(trimmed)
                .or_else(|_| Decimal::from_scientific(trimmed))
                .ok()
        }
    }
}

fn normalize_zero(value: Decimal) -> Decimal {
    if value.is_zero() { Decimal::ZERO } else { value }
}
