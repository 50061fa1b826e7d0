//! Boundary towards whatever produces a [`NormalizationSpec`] from data.
//!
//! The engine never calls into this module. It exists so an application can
//! sample a table, ask a collaborator for a spec and reuse that spec for
//! every later table with the same header layout.

use std::{collections::HashMap, sync::Arc};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{debug, info};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{
    model::{CellValue, RawTable},
    spec::NormalizationSpec,
};

pub const DEFAULT_PREVIEW_ROWS: usize = 40;

const SIGNATURE_SEPARATOR: &str = "\u{1f}";

/// Produces a spec from a preview of the table it will be applied to.
pub trait SpecInference {
    fn infer(&self, preview: &TablePreview) -> Result<NormalizationSpec>;
}

impl<F> SpecInference for F
where
    F: Fn(&TablePreview) -> Result<NormalizationSpec>,
{
    fn infer(&self, preview: &TablePreview) -> Result<NormalizationSpec> {
        self(preview)
    }
}

/// Headers plus a head/tail sample of rows, every cell rendered as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TablePreview {
    pub signature: String,
    pub headers: Vec<String>,
    pub total_rows: usize,
    pub rows: Vec<Vec<String>>,
}

impl TablePreview {
    /// Takes the first `max_rows / 2` rows, then fills up to `max_rows` from
    /// the end of the table without repeating a row.
    pub fn from_table(table: &RawTable, max_rows: usize) -> Self {
        let total = table.rows.len();
        let head = (max_rows / 2).min(total);
        let tail = max_rows.saturating_sub(head).min(total - head);
        let render = |row: &Vec<CellValue>| row.iter().map(CellValue::as_display).collect_vec();
        let rows = table.rows[..head]
            .iter()
            .chain(&table.rows[total - tail..])
            .map(render)
            .collect();
        Self {
            signature: header_signature(&table.headers),
            headers: table.headers.clone(),
            total_rows: total,
            rows,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Serializing table preview")
    }
}

/// Order-sensitive SHA-256 over the trimmed, lower-cased header names.
pub fn header_signature(headers: &[String]) -> String {
    let joined = headers
        .iter()
        .map(|h| h.trim().to_lowercase())
        .join(SIGNATURE_SEPARATOR);
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// One immutable spec per header signature.
#[derive(Debug, Default)]
pub struct SpecCache {
    specs: HashMap<String, Arc<NormalizationSpec>>,
    max_preview_rows: Option<usize>,
}

impl SpecCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preview_rows(max_rows: usize) -> Self {
        Self {
            specs: HashMap::new(),
            max_preview_rows: Some(max_rows),
        }
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn get(&self, headers: &[String]) -> Option<Arc<NormalizationSpec>> {
        self.specs.get(&header_signature(headers)).cloned()
    }

    pub fn insert(&mut self, headers: &[String], spec: NormalizationSpec) -> Arc<NormalizationSpec> {
        let spec = Arc::new(spec);
        self.specs
            .insert(header_signature(headers), Arc::clone(&spec));
        spec
    }

    /// Returns the cached spec for this layout, inferring and storing it on
    /// a miss. A failed inference leaves the cache untouched.
    pub fn get_or_infer(
        &mut self,
        table: &RawTable,
        inference: &dyn SpecInference,
    ) -> Result<Arc<NormalizationSpec>> {
        let signature = header_signature(&table.headers);
        if let Some(spec) = self.specs.get(&signature) {
            debug!("Spec cache hit for signature {signature}");
            return Ok(Arc::clone(spec));
        }
        let preview = TablePreview::from_table(
            table,
            self.max_preview_rows.unwrap_or(DEFAULT_PREVIEW_ROWS),
        );
        let spec = inference
            .infer(&preview)
            .with_context(|| format!("Inferring spec for header signature {signature}"))?;
        info!(
            "Inferred spec for {} column(s) (confidence {:.2})",
            table.headers.len(),
            spec.confidence
        );
        let spec = Arc::new(spec);
        self.specs.insert(signature, Arc::clone(&spec));
        Ok(spec)
    }
}
