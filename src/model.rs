//! Table, row and cell types shared by every normalization stage.
//!
//! - [`RawTable`] is what callers hand in: headers (possibly repeated) plus
//!   rows of loosely typed [`CellValue`]s.
//! - [`WorkingTable`] is what flows between the stages. It keeps every
//!   column, renamed or not, so amount logic can reference either a working
//!   field or an untouched raw column.
//! - [`CanonicalTable`] is the seven-column result.

use std::{fmt, str::FromStr};

use anyhow::{Error, anyhow};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Output columns, in their fixed order.
pub const CANONICAL_COLUMNS: [&str; 7] = [
    "date",
    "description",
    "amount",
    "direction",
    "category",
    "balance",
    "source",
];

static EMPTY_CELL: CellValue = CellValue::Empty;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Date(NaiveDate),
}

impl CellValue {
    pub fn as_display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            CellValue::Decimal(d) => d.to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// Empty cells and blank text both count as "no value".
    pub fn is_unset(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        if self.is_unset() {
            None
        } else {
            Some(self.as_display())
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<Decimal> for CellValue {
    fn from(value: Decimal) -> Self {
        CellValue::Decimal(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// Caller-owned input table. Header names are not required to be unique.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Builds a table of text cells; empty strings become [`CellValue::Empty`].
    pub fn from_text(headers: &[&str], rows: &[&[&str]]) -> Self {
        let mut table = Self::new(headers.iter().map(|h| h.to_string()).collect());
        for row in rows {
            table.push_row(
                row.iter()
                    .map(|cell| {
                        if cell.is_empty() {
                            CellValue::Empty
                        } else {
                            CellValue::from(*cell)
                        }
                    })
                    .collect(),
            );
        }
        table
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Field names a raw column can be mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkingField {
    Date,
    Description,
    Amount,
    Debit,
    Credit,
    Balance,
    Category,
    Type,
    Source,
}

impl WorkingField {
    pub const ALL: [WorkingField; 9] = [
        WorkingField::Date,
        WorkingField::Description,
        WorkingField::Amount,
        WorkingField::Debit,
        WorkingField::Credit,
        WorkingField::Balance,
        WorkingField::Category,
        WorkingField::Type,
        WorkingField::Source,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkingField::Date => "date",
            WorkingField::Description => "description",
            WorkingField::Amount => "amount",
            WorkingField::Debit => "debit",
            WorkingField::Credit => "credit",
            WorkingField::Balance => "balance",
            WorkingField::Category => "category",
            WorkingField::Type => "type",
            WorkingField::Source => "source",
        }
    }
}

impl fmt::Display for WorkingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkingField {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        WorkingField::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| anyhow!("Unknown working field '{value}'"))
    }
}

/// Column-oriented view used between stages. Every row has exactly
/// `headers.len()` cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkingTable {
    headers: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl WorkingTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Returns the cell, or an empty cell when the column does not exist.
    pub fn value(&self, row: usize, column: &str) -> &CellValue {
        self.column_index(column)
            .and_then(|idx| self.rows.get(row).and_then(|r| r.get(idx)))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn column(&self, name: &str) -> Option<Vec<&CellValue>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Like [`column`](Self::column), reading a missing column as all-empty.
    pub fn column_or_empty(&self, name: &str) -> Vec<&CellValue> {
        self.column(name)
            .unwrap_or_else(|| vec![&EMPTY_CELL; self.rows.len()])
    }

    /// Appends an all-empty column unless `name` already exists.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(CellValue::Empty);
        }
        self.headers.len() - 1
    }

    /// Replaces (or creates) a column; `values` must have one entry per row.
    pub fn set_column(&mut self, name: &str, values: Vec<CellValue>) {
        debug_assert_eq!(values.len(), self.rows.len());
        let idx = self.ensure_column(name);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
    }

    pub fn set_value(&mut self, row: usize, column: usize, value: CellValue) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            *cell = value;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inflow,
    Outflow,
}

impl Direction {
    /// Positive is an inflow, negative an outflow, zero has no direction.
    pub fn from_amount(amount: &Decimal) -> Option<Direction> {
        if amount.is_zero() {
            None
        } else if amount.is_sign_negative() {
            Some(Direction::Outflow)
        } else {
            Some(Direction::Inflow)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inflow => "inflow",
            Direction::Outflow => "outflow",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inflow" => Ok(Direction::Inflow),
            "outflow" => Ok(Direction::Outflow),
            other => Err(anyhow!("Unknown direction '{other}'")),
        }
    }
}

/// A non-fatal note about a fallback taken or a defect detected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Issue(String);

impl Issue {
    pub fn new(message: impl Into<String>) -> Self {
        Issue(message.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Issue {
    fn from(value: String) -> Self {
        Issue(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRow {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Option<Decimal>,
    pub direction: Option<Direction>,
    pub category: Option<String>,
    pub balance: Option<Decimal>,
    pub source: Option<String>,
}

impl CanonicalRow {
    /// Cells in [`CANONICAL_COLUMNS`] order.
    pub fn cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::Date(self.date),
            CellValue::Text(self.description.clone()),
            self.amount.into(),
            self.direction.map(|d| d.as_str()).into(),
            self.category.clone().into(),
            self.balance.into(),
            self.source.clone().into(),
        ]
    }

    /// Cells rendered as strings, absent values as empty strings.
    pub fn to_record(&self) -> Vec<String> {
        self.cells().iter().map(CellValue::as_display).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CanonicalTable {
    pub rows: Vec<CanonicalRow>,
}

impl CanonicalTable {
    pub fn headers() -> Vec<String> {
        CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CanonicalRow> {
        self.rows.iter()
    }

    /// Re-expresses the canonical table as engine input.
    pub fn to_raw_table(&self) -> RawTable {
        RawTable {
            headers: Self::headers(),
            rows: self.rows.iter().map(CanonicalRow::cells).collect(),
        }
    }
}
