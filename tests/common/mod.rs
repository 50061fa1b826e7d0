#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use cashflow_normalize::{AmountLogic, NormalizationSpec, RawTable};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// A spec that reads `amount` as already signed and maps nothing.
pub fn signed_spec() -> NormalizationSpec {
    NormalizationSpec {
        amount_logic: Some(AmountLogic::SignedAmount {
            amount_col: "amount".into(),
        }),
        ..Default::default()
    }
}

/// `rows` dated `2024-01-01` onwards with the given amount strings.
pub fn dated_amounts(amounts: &[&str]) -> RawTable {
    let dates = (0..amounts.len())
        .map(|idx| format!("2024-01-{:02}", idx % 28 + 1))
        .collect::<Vec<_>>();
    let rows = dates
        .iter()
        .zip(amounts)
        .map(|(date, amount)| vec![date.as_str(), "row", *amount])
        .collect::<Vec<_>>();
    let row_refs = rows.iter().map(|row| row.as_slice()).collect::<Vec<_>>();
    RawTable::from_text(&["date", "description", "amount"], &row_refs)
}
