use thiserror::Error;

/// A specification that violates its own shape constraints.
///
/// These are raised before any row is processed; problems in the data itself
/// are reported as [`Issue`](crate::model::Issue)s instead.
#[derive(Debug, Error, PartialEq)]
pub enum SpecError {
    #[error("amount_logic mode '{mode}' requires a non-empty '{field}'")]
    MissingColumnReference {
        mode: &'static str,
        field: &'static str,
    },
    #[error("unknown amount_logic mode '{0}' (expected signed_amount, debit_credit or type_flag)")]
    UnknownMode(String),
    #[error("amount_logic mode 'type_flag' has a blank {kind} token")]
    BlankTypeToken { kind: &'static str },
    #[error("date_rules.normalize_to must be 'YYYY-MM-DD' (found '{0}')")]
    UnsupportedDateTarget(String),
    #[error("classify rule #{index} ('{pattern}') has an empty set_category")]
    EmptyCategory { index: usize, pattern: String },
}
