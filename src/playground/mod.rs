//! Playground module - Batch test case runs
//!
//! It handles:
//! - Cleaning up a list of test cases (drop empty ones, one case per input)
//! - Running every input concurrently through the executor
//! - Exporting finished cases as a `1.in/1.out/...` zip archive, and reading one back
//!
//! The playground module does NOT:
//! - Compare outputs against expectations; a run overwrites `output`
//! - Export partial results (any failed or empty case blocks the export)

use std::collections::{BTreeMap, HashSet};
use std::io::{Read, Seek, Write};
use std::path::Path;

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::Result;
use crate::executor::Executor;
use crate::languages::Code;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    #[serde(default)]
    pub output: String,
    /// Set after a run that did not end Accepted
    #[serde(default)]
    pub error: bool,
}

impl TestCase {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            error: false,
        }
    }

    fn is_blank(&self) -> bool {
        self.input.is_empty() && self.output.is_empty()
    }
}

/// Drop blank cases and keep the first case for each input
pub fn prepare(cases: Vec<TestCase>) -> Vec<TestCase> {
    let mut seen = HashSet::new();
    cases
        .into_iter()
        .filter(|case| !case.is_blank())
        .filter(|case| seen.insert(case.input.clone()))
        .collect()
}

/// Run every prepared case concurrently; a transport failure fails the batch
pub async fn run_all(executor: &Executor, code: &Code, cases: Vec<TestCase>) -> Result<Vec<TestCase>> {
    let cases = prepare(cases);
    info!("Running {} test cases for {}", cases.len(), code.language);

    let results = try_join_all(cases.iter().map(|case| executor.submit(code, &case.input))).await?;

    Ok(cases
        .into_iter()
        .zip(results)
        .map(|(case, result)| TestCase {
            input: case.input,
            error: !result.is_accepted(),
            output: result.output,
        })
        .collect())
}

/// Write `cases` to `path` as a zip archive
///
/// Returns `Ok(false)` and writes nothing when any case failed or has no output.
pub fn export_zip(cases: &[TestCase], path: &Path) -> Result<bool> {
    if let Some(index) = cases.iter().position(|case| case.error || case.output.is_empty()) {
        warn!("Not exporting test cases: case {} has no usable output", index + 1);
        return Ok(false);
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut zip = ZipWriter::new(NamedTempFile::new_in(dir)?);
    let options = SimpleFileOptions::default();

    for (i, case) in cases.iter().enumerate() {
        zip.start_file(format!("{}.in", i + 1), options)?;
        zip.write_all(case.input.as_bytes())?;
        zip.start_file(format!("{}.out", i + 1), options)?;
        zip.write_all(case.output.as_bytes())?;
    }

    zip.finish()?.persist(path).map_err(|e| e.error)?;
    info!("Exported {} test cases to {}", cases.len(), path.display());
    Ok(true)
}

/// Read `N.in` / `N.out` pairs back from an archive, ordered by `N`
pub fn read_zip<R: Read + Seek>(data: R) -> Result<Vec<TestCase>> {
    let mut archive = ZipArchive::new(data)?;
    let mut pairs: BTreeMap<u32, TestCase> = BTreeMap::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let Some(path) = file.enclosed_name() else {
            continue;
        };
        let Some((index, is_input)) = case_slot(&path) else {
            continue;
        };

        let mut content = String::new();
        file.read_to_string(&mut content)?;

        let case = pairs.entry(index).or_default();
        if is_input {
            case.input = content;
        } else {
            case.output = content;
        }
    }

    Ok(pairs.into_values().collect())
}

fn case_slot(path: &Path) -> Option<(u32, bool)> {
    let index = path.file_stem()?.to_str()?.parse().ok()?;
    match path.extension()?.to_str()? {
        "in" => Some((index, true)),
        "out" => Some((index, false)),
        _ => None,
    }
}
