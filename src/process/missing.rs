use arrow::{
    array::{Array, BooleanArray},
    compute::filter_record_batch,
    record_batch::RecordBatch,
};
use std::collections::HashSet;

use crate::error::Result;

/// Cell values read as "no value".
#[derive(Debug, Clone)]
pub struct NaMarkers {
    markers: HashSet<String>,
}

impl NaMarkers {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            markers: markers.into_iter().map(Into::into).collect(),
        }
    }

    /// Blank after trimming, or one of the markers.
    pub fn is_missing(&self, cell: &str) -> bool {
        let t = cell.trim();
        t.is_empty() || self.markers.contains(t)
    }
}

/// Keep only rows with a value in every column. Returns the dense batch and
/// how many rows were dropped.
pub fn drop_incomplete_rows(batch: &RecordBatch) -> Result<(RecordBatch, usize)> {
    if batch.columns().iter().all(|c| c.null_count() == 0) {
        return Ok((batch.clone(), 0));
    }

    let keep: BooleanArray = (0..batch.num_rows())
        .map(|row| Some(batch.columns().iter().all(|c| c.is_valid(row))))
        .collect();
    let dense = filter_record_batch(batch, &keep)?;
    let dropped = batch.num_rows() - dense.num_rows();
    Ok((dense, dropped))
}
