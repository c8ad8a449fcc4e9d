// src/process/mod.rs
//! The cleaning steps, each a function over a whole Arrow batch:
//!
//! 1. parse  : [`raw_table::read_raw_csv`] + [`convert::raw_to_dated_batch`]
//! 2. prune  : [`prune_columns`]
//! 3. rename : [`lowercase_headers`]
//! 4. dense  : [`missing::drop_incomplete_rows`]
//! 5. trim   : [`trimming::trim_text_columns`]
//! 6. derive : [`derive::derive_canonical`] (also step 7, canonical order)

pub mod convert;
pub mod date_parser;
pub mod derive;
pub mod missing;
pub mod raw_table;
pub mod schema;
pub mod trimming;

use arrow::{
    datatypes::{Field, Schema},
    record_batch::RecordBatch,
};
use std::{collections::HashSet, sync::Arc};
use tracing::debug;

use crate::error::{ParseError, Result};
use schema::{PRUNED_COLUMNS, REQUIRED_COLUMNS};

fn is_pruned(header: &str) -> bool {
    let header = header.trim().to_lowercase();
    PRUNED_COLUMNS.contains(&header.as_str())
}

/// Drop the columns nothing downstream reads. Absent ones are ignored.
pub fn prune_columns(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let keep: Vec<usize> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| !is_pruned(f.name()))
        .map(|(i, _)| i)
        .collect();
    debug!(
        pruned = schema.fields().len() - keep.len(),
        kept = keep.len(),
        "pruned columns"
    );
    batch.project(&keep).map_err(Into::into)
}

/// Lower-case (and trim) every header, then check the required ones are there.
pub fn lowercase_headers(batch: &RecordBatch) -> Result<RecordBatch> {
    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(batch.num_columns());
    for f in batch.schema().fields() {
        let name = f.name().trim().to_lowercase();
        if !seen.insert(name.clone()) {
            return Err(ParseError::DuplicateColumn(name).into());
        }
        let field = Field::new(name, f.data_type().clone(), f.is_nullable());
        fields.push(field);
    }

    if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !seen.contains(**c)) {
        return Err(ParseError::MissingColumn(missing.to_string()).into());
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), batch.columns().to_vec())
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use arrow::{
        array::{ArrayRef, StringArray},
        datatypes::DataType,
    };

    fn batch_with(headers: &[&str]) -> RecordBatch {
        let fields: Vec<Field> = headers
            .iter()
            .map(|h| Field::new(*h, DataType::Utf8, true))
            .collect();
        let cols: Vec<ArrayRef> = headers
            .iter()
            .map(|h| Arc::new(StringArray::from(vec![*h])) as ArrayRef)
            .collect();
        RecordBatch::try_new(Arc::new(Schema::new(fields)), cols).unwrap()
    }

    const FULL: &[&str] = &[
        "Date",
        "Time",
        "Location",
        "Operator",
        "Flight #",
        "Route",
        "Type",
        "Registration",
        "cn/In",
        "Aboard",
        "Fatalities",
        "Ground",
        "Summary",
    ];

    #[test]
    fn prune_then_rename() -> anyhow::Result<()> {
        let out = lowercase_headers(&prune_columns(&batch_with(FULL))?)?;
        let names: Vec<String> = out
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(
            names,
            vec![
                "date",
                "location",
                "operator",
                "type",
                "aboard",
                "fatalities",
                "ground",
                "summary",
            ]
        );
        let summary = out
            .column(7)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(summary.value(0), "Summary");
        Ok(())
    }

    #[test]
    fn unknown_columns_survive_until_reorder() -> anyhow::Result<()> {
        let mut headers = FULL.to_vec();
        headers.push("Notes");
        let out = lowercase_headers(&prune_columns(&batch_with(&headers))?)?;
        assert!(out.schema().index_of("notes").is_ok());
        Ok(())
    }

    #[test]
    fn missing_required_column() -> anyhow::Result<()> {
        let headers: Vec<&str> = FULL.iter().copied().filter(|h| *h != "Ground").collect();
        let err = lowercase_headers(&prune_columns(&batch_with(&headers))?).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Parse(ParseError::MissingColumn(ref c)) if c == "ground"
        ));
        Ok(())
    }

    #[test]
    fn case_collision() {
        let err = lowercase_headers(&batch_with(&["Date", "DATE"])).unwrap_err();
        assert!(matches!(err, LoadError::Parse(ParseError::DuplicateColumn(_))));
    }
}
