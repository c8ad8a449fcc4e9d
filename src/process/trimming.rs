use arrow::{
    array::{ArrayRef, StringArray},
    record_batch::RecordBatch,
};
use std::sync::Arc;

use crate::error::Result;

/// Strip surrounding whitespace from every text column; other columns pass through.
pub fn trim_text_columns(batch: &RecordBatch) -> Result<RecordBatch> {
    let cols: Vec<ArrayRef> = batch
        .columns()
        .iter()
        .map(|arr| match arr.as_any().downcast_ref::<StringArray>() {
            Some(sarr) => {
                let trimmed: StringArray = sarr.iter().map(|opt| opt.map(str::trim)).collect();
                Arc::new(trimmed) as ArrayRef
            }
            None => arr.clone(),
        })
        .collect();

    RecordBatch::try_new(batch.schema(), cols)
        .map_err(Into::into)
}
