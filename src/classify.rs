//! Stage 3: fill `category` from ordered description rules.
//!
//! Rules run in list order and only ever fill a category that is still unset,
//! so the first matching rule wins and categories already present in the
//! data are never overwritten.

use log::debug;
use regex::{Regex, RegexBuilder};

use crate::{
    model::{CellValue, Issue, WorkingTable},
    spec::ClassifyRule,
};

/// A [`ClassifyRule`] with its pattern compiled case-insensitively.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    regex: Regex,
    category: String,
}

impl CompiledRule {
    pub fn compile(rule: &ClassifyRule) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(&rule.when)
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            regex,
            category: rule.set_category.clone(),
        })
    }

    /// The category to write for this row, if the rule applies and the row
    /// has no category yet.
    pub fn fill(&self, description: &str, current: &CellValue) -> Option<&str> {
        (current.is_unset() && self.regex.is_match(description)).then_some(self.category.as_str())
    }
}

pub fn classify(mut table: WorkingTable, rules: &[ClassifyRule]) -> (WorkingTable, Vec<Issue>) {
    let mut issues = Vec::new();
    let descriptions = table
        .column_or_empty("description")
        .into_iter()
        .map(CellValue::as_display)
        .collect::<Vec<_>>();
    let category_idx = table.ensure_column("category");

    for rule in rules {
        let compiled = match CompiledRule::compile(rule) {
            Ok(compiled) => compiled,
            Err(err) => {
                debug!("Skipping classify rule {:?}: {err}", rule.when);
                issues.push(Issue::new(format!(
                    "Invalid classify rule regex: '{}'",
                    rule.when
                )));
                continue;
            }
        };
        let mut filled = 0usize;
        for (row, description) in descriptions.iter().enumerate() {
            let current = &table.rows()[row][category_idx];
            if let Some(category) = compiled.fill(description, current) {
                let value = CellValue::Text(category.to_string());
                table.set_value(row, category_idx, value);
                filled += 1;
            }
        }
        debug!(
            "Rule {:?} -> '{}' filled {filled} row(s)",
            rule.when, rule.set_category
        );
    }
    (table, issues)
}
