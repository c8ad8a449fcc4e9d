//! Chart datasets: the aggregated tables behind each figure, written as
//! Parquet alongside a JSON manifest.

use anyhow::{bail, Context, Result};
use arrow::{
    array::{ArrayRef, Float64Array, Int64Array, StringArray, UInt64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::{
    arrow::ArrowWriter,
    basic::{BrotliLevel, Compression},
    file::properties::WriterProperties,
};
use serde::Serialize;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info, warn};

use crate::analysis::{self, group_mean, group_sum, top_n, MeanGroup, SumGroup};
use crate::config::MONTHS;
use crate::process::schema::col;
use crate::table::CrashTable;

pub const TOP_N: usize = 10;
pub const MANIFEST_FILE: &str = "manifest.json";

pub const COUNTRY_FATALITIES: &str = "Total Fatalities by Country (Top 10)";
pub const COUNTRY_RATE: &str = "Mean Crash Fatality Rate by Country";
pub const MONTH_FATALITIES: &str = "Total Fatalities by Month";
pub const YEAR_SECTOR_RATE: &str = "Crash Fatality Rate by Year and Sector";
pub const RATE_DISTRIBUTION: &str = "Crash Fatality Rate Distribution";
pub const PARTIAL_RATE_DISTRIBUTION: &str =
    "Crash Fatality Rate Distribution (Crashes with Fatality Rate < 1)";
pub const MANUFACTURER_FATALITIES: &str = "Fatalities by Aircraft Manufacturer";
pub const MANUFACTURER_RATE: &str = "Mean Crash Fatality Rate by Aircraft Manufacturer";

/// One chart's worth of data.
#[derive(Debug, Clone)]
pub struct FigureData {
    pub title: &'static str,
    pub batch: RecordBatch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestEntry {
    pub title: String,
    pub file: String,
    pub rows: usize,
}

/// File stem for a chart title.
pub fn figure_slug(title: &str) -> Result<String> {
    let slug = title
        .trim()
        .replace(' ', "_")
        .replace(['-', ':'], "")
        .to_lowercase();
    if slug.is_empty() {
        bail!("figure title {title:?} gives an empty file name");
    }
    Ok(slug)
}

fn utf8_field(name: &str) -> Field {
    Field::new(name, DataType::Utf8, false)
}

fn batch(fields: Vec<Field>, columns: Vec<ArrayRef>) -> Result<RecordBatch> {
    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .context("building figure batch")
}

/// `key` / `value` pairs from single-key sum groups.
fn sums_batch(key: &str, value: &str, groups: &[SumGroup]) -> Result<RecordBatch> {
    let keys: StringArray = groups.iter().map(|g| Some(g.keys[0].as_str())).collect();
    let totals = Int64Array::from_iter_values(groups.iter().map(|g| g.total));
    batch(
        vec![utf8_field(key), Field::new(value, DataType::Int64, false)],
        vec![Arc::new(keys), Arc::new(totals)],
    )
}

/// Largest summed `value` per `key`, top `TOP_N`, descending.
fn top_sums(table: &CrashTable, key: &str, value: &str) -> Result<RecordBatch> {
    let mut groups = group_sum(table, &[key], value)?;
    groups.sort_by(|a, b| b.total.cmp(&a.total));
    groups.truncate(TOP_N);
    sums_batch(key, value, &groups)
}

/// Mean fatality rate over the `TOP_N` keys by fatalities, NaN groups dropped, descending.
fn top_rates(table: &CrashTable, key: &str) -> Result<RecordBatch> {
    let leaders = top_n(table, key, col::FATALITIES, TOP_N)?;
    let subset = table.filter_in(key, &leaders)?;
    let mut groups: Vec<MeanGroup> = group_mean(&subset, &[key], col::FATALITY_PCT)?
        .into_iter()
        .filter(|g| !g.mean.is_nan())
        .collect();
    groups.sort_by(|a, b| b.mean.total_cmp(&a.mean));

    let keys: StringArray = groups.iter().map(|g| Some(g.keys[0].as_str())).collect();
    let means = Float64Array::from_iter_values(groups.iter().map(|g| g.mean));
    batch(
        vec![
            utf8_field(key),
            Field::new(col::FATALITY_PCT, DataType::Float64, false),
        ],
        vec![Arc::new(keys), Arc::new(means)],
    )
}

fn month_fatalities(table: &CrashTable) -> Result<RecordBatch> {
    let mut groups = group_sum(table, &[col::MONTH, col::SECTOR], col::FATALITIES)?;
    let month_pos = |m: &str| MONTHS.iter().position(|x| *x == m).unwrap_or(MONTHS.len());
    groups.sort_by_key(|g| month_pos(g.keys[0].as_str()));

    let months: StringArray = groups.iter().map(|g| Some(g.keys[0].as_str())).collect();
    let sectors: StringArray = groups.iter().map(|g| Some(g.keys[1].as_str())).collect();
    let totals = Int64Array::from_iter_values(groups.iter().map(|g| g.total));
    batch(
        vec![
            utf8_field(col::MONTH),
            utf8_field(col::SECTOR),
            Field::new(col::FATALITIES, DataType::Int64, false),
        ],
        vec![Arc::new(months), Arc::new(sectors), Arc::new(totals)],
    )
}

fn year_sector_rates(table: &CrashTable) -> Result<RecordBatch> {
    let groups = group_mean(table, &[col::YEAR, col::SECTOR], col::FATALITY_PCT)?;
    let mut rows = groups
        .into_iter()
        .filter(|g| !g.mean.is_nan())
        .map(|g| {
            let year: i64 = g.keys[0]
                .parse()
                .with_context(|| format!("year key {:?}", g.keys[0]))?;
            Ok((year, g.keys[1].clone(), g.mean))
        })
        .collect::<Result<Vec<_>>>()?;
    rows.sort_by_key(|(year, _, _)| *year);

    let years = Int64Array::from_iter_values(rows.iter().map(|r| r.0));
    let sectors: StringArray = rows.iter().map(|r| Some(r.1.as_str())).collect();
    let means = Float64Array::from_iter_values(rows.iter().map(|r| r.2));
    batch(
        vec![
            Field::new(col::YEAR, DataType::Int64, false),
            utf8_field(col::SECTOR),
            Field::new(col::FATALITY_PCT, DataType::Float64, false),
        ],
        vec![Arc::new(years), Arc::new(sectors), Arc::new(means)],
    )
}

/// Per-sector counts over bins shared by every sector.
fn rate_distribution(table: &CrashTable, bins: usize) -> Result<RecordBatch> {
    let Some(pct) = table.fatality_pct() else {
        bail!("table has no {} column", col::FATALITY_PCT);
    };
    let values: Vec<f64> = pct.values().iter().copied().collect();
    let edges = analysis::bin_edges(&values, bins);
    let sectors = table.sectors();

    let mut seen: Vec<&str> = Vec::new();
    for s in &sectors {
        if !seen.contains(s) {
            seen.push(*s);
        }
    }

    let (mut names, mut starts, mut ends, mut counts) = (vec![], vec![], vec![], vec![]);
    for sector in seen {
        let own: Vec<f64> = values
            .iter()
            .zip(&sectors)
            .filter(|(_, s)| **s == sector)
            .map(|(v, _)| *v)
            .collect();
        for bin in analysis::bin_counts(&own, &edges) {
            names.push(sector);
            starts.push(bin.start);
            ends.push(bin.end);
            counts.push(bin.count as u64);
        }
    }

    batch(
        vec![
            utf8_field(col::SECTOR),
            Field::new("bin_start", DataType::Float64, false),
            Field::new("bin_end", DataType::Float64, false),
            Field::new("count", DataType::UInt64, false),
        ],
        vec![
            Arc::new(StringArray::from(names)),
            Arc::new(Float64Array::from(starts)),
            Arc::new(Float64Array::from(ends)),
            Arc::new(UInt64Array::from(counts)),
        ],
    )
}

/// Datasets for every chart the table supports.
#[tracing::instrument(level = "info", skip(table), fields(rows = table.num_rows()))]
pub fn build_figures(table: &CrashTable) -> Result<Vec<FigureData>> {
    let has_pct = table.has_column(col::FATALITY_PCT);
    let has_maker = table.has_column(col::MANUFACTURER);
    let mut figs = Vec::with_capacity(8);

    let mut push = |title: &'static str,
                    needs: &[bool],
                    build: &dyn Fn() -> Result<RecordBatch>|
     -> Result<()> {
        if needs.iter().all(|ok| *ok) {
            let batch = build().with_context(|| format!("building {title:?}"))?;
            debug!(title, rows = batch.num_rows(), "built figure data");
            figs.push(FigureData { title, batch });
        } else {
            warn!(title, variant = ?table.variant(), "skipping figure: columns not in table");
        }
        Ok(())
    };

    push(COUNTRY_FATALITIES, &[], &|| {
        top_sums(table, col::COUNTRY, col::FATALITIES)
    })?;
    push(COUNTRY_RATE, &[has_pct], &|| top_rates(table, col::COUNTRY))?;
    push(MONTH_FATALITIES, &[], &|| month_fatalities(table))?;
    push(YEAR_SECTOR_RATE, &[has_pct], &|| year_sector_rates(table))?;
    push(RATE_DISTRIBUTION, &[has_pct], &|| {
        rate_distribution(table, 10)
    })?;
    push(PARTIAL_RATE_DISTRIBUTION, &[has_pct], &|| {
        let partial = table.filter_fatality_pct(|p| p < 1.0)?;
        rate_distribution(&partial, 20)
    })?;
    push(MANUFACTURER_FATALITIES, &[has_maker], &|| {
        top_sums(table, col::MANUFACTURER, col::FATALITIES)
    })?;
    push(MANUFACTURER_RATE, &[has_pct, has_maker], &|| {
        top_rates(table, col::MANUFACTURER)
    })?;

    Ok(figs)
}

/// Write `batch` to `path` (via a `.tmp` sibling) and return the file size.
pub fn write_table_parquet(batch: &RecordBatch, path: &Path) -> Result<u64> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("parquet.tmp");
    let file = File::create(&tmp_path)
        .with_context(|| format!("creating {}", tmp_path.display()))?;

    let props = WriterProperties::builder()
        .set_compression(Compression::BROTLI(BrotliLevel::try_new(5)?))
        .build();
    let mut writer = ArrowWriter::try_new(BufWriter::new(file), batch.schema(), Some(props))
        .context("creating ArrowWriter")?;
    writer.write(batch).context("writing batch")?;
    writer.close().context("closing ArrowWriter")?;

    fs::rename(&tmp_path, path).with_context(|| {
        format!("renaming {} to {}", tmp_path.display(), path.display())
    })?;
    Ok(fs::metadata(path)?.len())
}

/// Write each figure as `<dir>/<slug>.parquet` plus `manifest.json`.
#[tracing::instrument(
    level = "info",
    skip(figs),
    fields(dir = %dir.display(), figures = figs.len())
)]
pub fn write_figures(figs: &[FigureData], dir: &Path) -> Result<Vec<ManifestEntry>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating {}", dir.display()))?;

    let mut manifest = Vec::with_capacity(figs.len());
    for fig in figs {
        let file = format!("{}.parquet", figure_slug(fig.title)?);
        let path: PathBuf = dir.join(&file);
        let bytes = write_table_parquet(&fig.batch, &path)?;
        debug!(file = %path.display(), bytes, "wrote figure data");
        manifest.push(ManifestEntry {
            title: fig.title.to_string(),
            file,
            rows: fig.batch.num_rows(),
        });
    }

    let manifest_path = dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(&manifest)?;
    fs::write(&manifest_path, json)
        .with_context(|| format!("writing {}", manifest_path.display()))?;
    info!(figures = manifest.len(), "wrote chart datasets");
    Ok(manifest)
}
