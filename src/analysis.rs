//! Grouping, top-N and binning over the canonical table: what the chart
//! layer needs from it.

use anyhow::{anyhow, bail, Result};
use arrow::{
    array::{Array, AsArray},
    datatypes::{DataType, Float64Type, Int64Type},
};
use serde::Serialize;
use std::collections::HashMap;

use crate::table::CrashTable;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SumGroup {
    pub keys: Vec<String>,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeanGroup {
    pub keys: Vec<String>,
    /// NaN when every value in the group was NaN.
    pub mean: f64,
    /// Non-NaN values that went into the mean.
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Per-row key text for a text, categorical or integer column.
fn key_column(table: &CrashTable, name: &str) -> Result<Vec<String>> {
    if let Some(values) = table.string_values(name) {
        return Ok(values.into_iter().map(str::to_string).collect());
    }
    let idx = table
        .schema()
        .index_of(name)
        .map_err(|_| anyhow!("no column `{name}` in table"))?;
    let arr = table.batch().column(idx);
    match arr.data_type() {
        DataType::Int64 => Ok(arr
            .as_primitive::<Int64Type>()
            .iter()
            .map(|v| v.map(|v| v.to_string()).unwrap_or_default())
            .collect()),
        other => bail!("cannot group by `{name}` of type {other}"),
    }
}

/// Row keys for a composite grouping.
fn row_keys(table: &CrashTable, keys: &[&str]) -> Result<Vec<Vec<String>>> {
    if keys.is_empty() {
        bail!("grouping needs at least one key column");
    }
    let cols = keys
        .iter()
        .map(|k| key_column(table, k))
        .collect::<Result<Vec<_>>>()?;
    Ok((0..table.num_rows())
        .map(|row| cols.iter().map(|c| c[row].clone()).collect())
        .collect())
}

fn values_f64(table: &CrashTable, name: &str) -> Result<Vec<f64>> {
    let idx = table
        .schema()
        .index_of(name)
        .map_err(|_| anyhow!("no column `{name}` in table"))?;
    let arr = table.batch().column(idx);
    match arr.data_type() {
        DataType::Float64 => Ok(arr
            .as_primitive::<Float64Type>()
            .iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect()),
        DataType::Int64 => Ok(arr
            .as_primitive::<Int64Type>()
            .iter()
            .map(|v| v.map(|v| v as f64).unwrap_or(f64::NAN))
            .collect()),
        other => bail!("`{name}` of type {other} is not numeric"),
    }
}

/// Sum an integer column per key; groups in first-seen order. A total past
/// `i64::MAX` is an error.
pub fn group_sum(table: &CrashTable, keys: &[&str], value: &str) -> Result<Vec<SumGroup>> {
    let idx = table
        .schema()
        .index_of(value)
        .map_err(|_| anyhow!("no column `{value}` in table"))?;
    let arr = table.batch().column(idx);
    if arr.data_type() != &DataType::Int64 {
        bail!("`{value}` is not an integer column");
    }
    let values = arr.as_primitive::<Int64Type>();

    let mut slots: HashMap<Vec<String>, usize> = HashMap::new();
    let mut groups: Vec<SumGroup> = Vec::new();
    for (row, key) in row_keys(table, keys)?.into_iter().enumerate() {
        let v = values.is_valid(row).then(|| values.value(row)).unwrap_or(0);
        match slots.get(&key) {
            Some(&slot) => {
                let group = &mut groups[slot];
                let Some(total) = group.total.checked_add(v) else {
                    bail!("sum of `{value}` overflows for group {:?}", group.keys);
                };
                group.total = total;
            }
            None => {
                slots.insert(key.clone(), groups.len());
                groups.push(SumGroup {
                    keys: key,
                    total: v,
                });
            }
        }
    }
    Ok(groups)
}

/// Mean of a numeric column per key, NaN skipped; groups in first-seen order.
pub fn group_mean(table: &CrashTable, keys: &[&str], value: &str) -> Result<Vec<MeanGroup>> {
    let values = values_f64(table, value)?;

    let mut slots: HashMap<Vec<String>, usize> = HashMap::new();
    let mut acc: Vec<(Vec<String>, f64, usize)> = Vec::new();
    for (key, v) in row_keys(table, keys)?.into_iter().zip(values) {
        let slot = match slots.get(&key) {
            Some(&slot) => slot,
            None => {
                slots.insert(key.clone(), acc.len());
                acc.push((key, 0.0, 0));
                acc.len() - 1
            }
        };
        if !v.is_nan() {
            acc[slot].1 += v;
            acc[slot].2 += 1;
        }
    }

    Ok(acc
        .into_iter()
        .map(|(keys, sum, count)| MeanGroup {
            keys,
            mean: if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            },
            count,
        })
        .collect())
}

/// The `n` keys of `key` with the largest summed `value`. Ties keep first-seen order.
pub fn top_n(table: &CrashTable, key: &str, value: &str, n: usize) -> Result<Vec<String>> {
    let mut groups = group_sum(table, &[key], value)?;
    groups.sort_by(|a, b| b.total.cmp(&a.total));
    Ok(groups
        .into_iter()
        .take(n)
        .filter_map(|g| g.keys.into_iter().next())
        .collect())
}

/// `bins` equal-width edges spanning the finite values. Empty input gives no edges;
/// a single distinct value gives one zero-width bin.
pub fn bin_edges(values: &[f64], bins: usize) -> Vec<f64> {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if bins == 0 || min > max {
        return Vec::new();
    }
    if min == max {
        return vec![min, max];
    }
    let width = (max - min) / bins as f64;
    let mut edges: Vec<f64> = (0..=bins).map(|i| min + width * i as f64).collect();
    edges[bins] = max;
    edges
}

/// Count finite values into the bins `edges` describe. The last bin is closed.
pub fn bin_counts(values: &[f64], edges: &[f64]) -> Vec<Bin> {
    if edges.len() < 2 {
        return Vec::new();
    }
    let mut bins: Vec<Bin> = edges
        .windows(2)
        .map(|w| Bin {
            start: w[0],
            end: w[1],
            count: 0,
        })
        .collect();
    let last = bins.len() - 1;
    for v in values.iter().copied().filter(|v| v.is_finite()) {
        if v < edges[0] || v > edges[edges.len() - 1] {
            continue;
        }
        let slot = bins
            .iter()
            .position(|b| v >= b.start && v < b.end)
            .unwrap_or(last);
        bins[slot].count += 1;
    }
    bins
}

/// Convenience: `bins` equal-width bins over `values`.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    bin_counts(values, &bin_edges(values, bins))
}
