//! Local half of acquisition: unpack the downloaded archive and find the
//! dataset CSV in the raw directory.

use anyhow::{bail, Context, Result};
use glob::{glob, Pattern};
use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};
use tracing::{debug, info};
use zip::ZipArchive;

use crate::config::RAW_FILE_NAME;
use crate::error::LoadError;

fn is_csv(name: &Path) -> bool {
    name.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

/// Write every `.csv` entry of `zip_path` into `raw_dir` (flattened) and
/// return the dataset file: the expected name if present, else the first CSV.
#[tracing::instrument(
    level = "info",
    skip(zip_path, raw_dir),
    fields(archive = %zip_path.as_ref().display())
)]
pub fn extract_archive<P: AsRef<Path>, Q: AsRef<Path>>(
    zip_path: P,
    raw_dir: Q,
) -> Result<PathBuf> {
    let zip_path = zip_path.as_ref();
    let raw_dir = raw_dir.as_ref();

    let file =
        File::open(zip_path).with_context(|| format!("Failed to open ZIP file: {:?}", zip_path))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("Failed to read ZIP archive: {:?}", zip_path))?;
    fs::create_dir_all(raw_dir)
        .with_context(|| format!("creating {}", raw_dir.display()))?;

    let mut written = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to access ZIP entry #{} in {:?}", i, zip_path))?;
        if !entry.is_file() {
            continue;
        }
        let Some(file_name) = entry
            .enclosed_name()
            .and_then(|p| p.file_name().map(PathBuf::from))
        else {
            debug!(name = entry.name(), "skipping entry with unsafe path");
            continue;
        };
        if !is_csv(&file_name) {
            continue;
        }

        let dest = raw_dir.join(&file_name);
        let mut out = File::create(&dest)
            .with_context(|| format!("creating {}", dest.display()))?;
        let bytes = io::copy(&mut entry, &mut out)
            .with_context(|| format!("Failed to extract {} from {:?}", entry.name(), zip_path))?;
        debug!(file = %dest.display(), bytes, "extracted");
        written.push(dest);
    }

    let chosen = written
        .iter()
        .find(|p| p.file_name().is_some_and(|n| n == RAW_FILE_NAME))
        .or_else(|| written.first())
        .cloned();
    match chosen {
        Some(path) => {
            info!(files = written.len(), dataset = %path.display(), "archive extracted");
            Ok(path)
        }
        None => bail!("no CSV file in archive {}", zip_path.display()),
    }
}

/// The dataset CSV in `raw_dir`: the expected name, else the only `*.csv`.
/// Nothing there is `LoadError::SourceNotFound`.
pub fn locate_raw_csv<P: AsRef<Path>>(raw_dir: P) -> Result<PathBuf> {
    let raw_dir = raw_dir.as_ref();
    let expected = raw_dir.join(RAW_FILE_NAME);
    if expected.is_file() {
        return Ok(expected);
    }

    let pattern = format!("{}/*.csv", Pattern::escape(&raw_dir.to_string_lossy()));
    let mut found: Vec<PathBuf> = glob(&pattern)?.filter_map(|e| e.ok()).collect();
    found.sort();
    match found.len() {
        0 => Err(LoadError::SourceNotFound { path: expected }.into()),
        1 => Ok(found.remove(0)),
        n => bail!(
            "{n} CSV files in {} and none named {RAW_FILE_NAME}",
            raw_dir.display()
        ),
    }
}
