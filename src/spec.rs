//! Declarative normalization rules and their persisted form.
//!
//! A [`NormalizationSpec`] is produced once per input layout (by hand or by a
//! spec-inference collaborator) and is read-only afterwards. It can be stored
//! as YAML or JSON; the file extension decides which.

use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{error::SpecError, model::WorkingField};

pub const SPEC_VERSION: &str = "normalization_spec_v1";
pub const DATE_TARGET_FORMAT: &str = "YYYY-MM-DD";

/// How the signed amount is derived. Each mode carries only the column
/// references it needs; a missing required reference fails to deserialize.
/// A record without `mode` reads as `signed_amount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "mode",
    rename_all = "snake_case",
    try_from = "AmountLogicRecord"
)]
pub enum AmountLogic {
    /// One column already holds the signed amount.
    SignedAmount { amount_col: String },
    /// `amount = credit - debit`.
    DebitCredit { debit_col: String, credit_col: String },
    /// A magnitude column signed by token membership in a type column.
    TypeFlag {
        type_col: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount_col: Option<String>,
        #[serde(default)]
        credit_tokens: Vec<String>,
        #[serde(default)]
        debit_tokens: Vec<String>,
    },
}

/// The flat on-disk shape of [`AmountLogic`]; fields a mode does not use
/// are ignored.
#[derive(Debug, Deserialize)]
struct AmountLogicRecord {
    mode: Option<String>,
    amount_col: Option<String>,
    debit_col: Option<String>,
    credit_col: Option<String>,
    type_col: Option<String>,
    #[serde(default)]
    credit_tokens: Vec<String>,
    #[serde(default)]
    debit_tokens: Vec<String>,
}

impl TryFrom<AmountLogicRecord> for AmountLogic {
    type Error = SpecError;

    fn try_from(record: AmountLogicRecord) -> Result<Self, Self::Error> {
        let required = |mode: &'static str, field: &'static str, value: Option<String>| {
            value.ok_or(SpecError::MissingColumnReference { mode, field })
        };
        match record.mode.as_deref().unwrap_or("signed_amount") {
            "signed_amount" => Ok(AmountLogic::SignedAmount {
                amount_col: required("signed_amount", "amount_col", record.amount_col)?,
            }),
            "debit_credit" => Ok(AmountLogic::DebitCredit {
                debit_col: required("debit_credit", "debit_col", record.debit_col)?,
                credit_col: required("debit_credit", "credit_col", record.credit_col)?,
            }),
            "type_flag" => Ok(AmountLogic::TypeFlag {
                type_col: required("type_flag", "type_col", record.type_col)?,
                amount_col: record.amount_col,
                credit_tokens: record.credit_tokens,
                debit_tokens: record.debit_tokens,
            }),
            other => Err(SpecError::UnknownMode(other.to_string())),
        }
    }
}

impl AmountLogic {
    pub fn mode(&self) -> &'static str {
        match self {
            AmountLogic::SignedAmount { .. } => "signed_amount",
            AmountLogic::DebitCredit { .. } => "debit_credit",
            AmountLogic::TypeFlag { .. } => "type_flag",
        }
    }

    fn validate(&self) -> Result<(), SpecError> {
        let mode = self.mode();
        let require = |field: &'static str, value: &str| {
            if value.trim().is_empty() {
                Err(SpecError::MissingColumnReference { mode, field })
            } else {
                Ok(())
            }
        };
        match self {
            AmountLogic::SignedAmount { amount_col } => require("amount_col", amount_col),
            AmountLogic::DebitCredit {
                debit_col,
                credit_col,
            } => {
                require("debit_col", debit_col)?;
                require("credit_col", credit_col)
            }
            AmountLogic::TypeFlag {
                type_col,
                amount_col,
                credit_tokens,
                debit_tokens,
            } => {
                require("type_col", type_col)?;
                if let Some(col) = amount_col {
                    require("amount_col", col)?;
                }
                if credit_tokens.iter().any(|t| t.trim().is_empty()) {
                    return Err(SpecError::BlankTypeToken { kind: "credit" });
                }
                if debit_tokens.iter().any(|t| t.trim().is_empty()) {
                    return Err(SpecError::BlankTypeToken { kind: "debit" });
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRules {
    /// strftime-style formats tried in order before fuzzy parsing.
    #[serde(default)]
    pub known_formats: Vec<String>,
    #[serde(default = "DateRules::default_target")]
    pub normalize_to: String,
    /// Carried through; the transform itself is timezone-agnostic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl DateRules {
    fn default_target() -> String {
        DATE_TARGET_FORMAT.to_string()
    }
}

impl Default for DateRules {
    fn default() -> Self {
        Self {
            known_formats: Vec::new(),
            normalize_to: Self::default_target(),
            timezone: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyRule {
    /// Case-insensitive regular expression searched in `description`.
    #[serde(alias = "pattern")]
    pub when: String,
    #[serde(alias = "category")]
    pub set_category: String,
}

impl ClassifyRule {
    pub fn new(when: impl Into<String>, set_category: impl Into<String>) -> Self {
        Self {
            when: when.into(),
            set_category: set_category.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizationSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_version: Option<String>,
    /// Raw column name to working field. Unknown raw columns are ignored.
    #[serde(default)]
    pub column_mapping: BTreeMap<String, WorkingField>,
    /// `None` means the inference source could not settle on a mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_logic: Option<AmountLogic>,
    #[serde(default)]
    pub date_rules: DateRules,
    #[serde(default)]
    pub classify_rules: Vec<ClassifyRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drop_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
    /// Advisory, as reported by the inference source; never checked.
    #[serde(default)]
    pub confidence: f64,
}

impl NormalizationSpec {
    /// Checks the spec's own shape. Data never causes an error here.
    pub fn validate(&self) -> Result<(), SpecError> {
        if let Some(logic) = &self.amount_logic {
            logic.validate()?;
        }
        if self.date_rules.normalize_to.trim() != DATE_TARGET_FORMAT {
            return Err(SpecError::UnsupportedDateTarget(
                self.date_rules.normalize_to.clone(),
            ));
        }
        for (index, rule) in self.classify_rules.iter().enumerate() {
            if rule.set_category.trim().is_empty() {
                return Err(SpecError::EmptyCategory {
                    index,
                    pattern: rule.when.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("Parsing spec YAML")
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Parsing spec JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening spec file {path:?}"))?;
        let reader = BufReader::new(file);
        let spec: NormalizationSpec = if is_json(path) {
            serde_json::from_reader(reader).context("Parsing spec JSON")?
        } else {
            serde_yaml::from_reader(reader).context("Parsing spec YAML")?
        };
        Ok(spec)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut spec = self.clone();
        if spec.spec_version.is_none() {
            spec.spec_version = Some(SPEC_VERSION.to_string());
        }
        let file = File::create(path).with_context(|| format!("Creating spec file {path:?}"))?;
        if is_json(path) {
            serde_json::to_writer_pretty(file, &spec).context("Writing spec JSON")
        } else {
            serde_yaml::to_writer(file, &spec).context("Writing spec YAML")
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
