use arrow::{
    array::{Array, ArrayRef, Date32Array, Int64Array, Int64Builder, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::sync::Arc;

use crate::error::{LoadError, ParseError, Result};
use crate::process::{
    date_parser::{parse_date, to_date32},
    missing::NaMarkers,
    raw_table::RawTable,
    schema::{col, find_header, raw_schema},
};

fn text_column(raw: &RawTable, idx: usize, na: &NaMarkers) -> StringArray {
    raw.column(idx)
        .map(|cell| (!na.is_missing(cell)).then_some(cell))
        .collect()
}

/// The file as read: original headers, every column text, missing cells null.
pub fn raw_to_batch(raw: &RawTable, na: &NaMarkers) -> Result<RecordBatch> {
    let cols: Vec<ArrayRef> = (0..raw.headers.len())
        .map(|idx| Arc::new(text_column(raw, idx, na)) as ArrayRef)
        .collect();
    RecordBatch::try_new(raw_schema(&raw.headers), cols)
        .map_err(Into::into)
}

/// Like [`raw_to_batch`] but with the date column parsed to `Date32`.
/// A missing date stays null; a date that is present but matches none of
/// `formats` fails the whole parse.
pub fn raw_to_dated_batch(
    raw: &RawTable,
    na: &NaMarkers,
    formats: &[String],
) -> Result<RecordBatch> {
    let date_idx = find_header(&raw.headers, col::DATE)
        .ok_or_else(|| ParseError::MissingColumn(col::DATE.to_string()))?;

    let mut fields = Vec::with_capacity(raw.headers.len());
    let mut cols: Vec<ArrayRef> = Vec::with_capacity(raw.headers.len());
    for (idx, header) in raw.headers.iter().enumerate() {
        if idx == date_idx {
            let dates = parse_date_column(raw, idx, na, formats)?;
            fields.push(Field::new(header, DataType::Date32, true));
            cols.push(Arc::new(dates));
        } else {
            fields.push(Field::new(header, DataType::Utf8, true));
            cols.push(Arc::new(text_column(raw, idx, na)));
        }
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), cols).map_err(Into::into)
}

fn parse_date_column(
    raw: &RawTable,
    idx: usize,
    na: &NaMarkers,
    formats: &[String],
) -> Result<Date32Array> {
    let mut days = Vec::with_capacity(raw.num_rows());
    for (cell, line) in raw.column(idx).zip(&raw.lines) {
        if na.is_missing(cell) {
            days.push(None);
            continue;
        }
        let date = parse_date(cell, formats).ok_or_else(|| ParseError::Date {
            line: *line,
            value: cell.to_string(),
        })?;
        days.push(Some(to_date32(date)));
    }
    Ok(Date32Array::from(days))
}

/// Parse a count. Accepts plain integers and integral decimals ("12.0");
/// negatives, fractions and values past `i64::MAX` are rejected.
pub fn coerce_count(value: &str) -> Option<i64> {
    let v = value.trim();
    if let Ok(n) = v.parse::<i64>() {
        return (n >= 0).then_some(n);
    }
    let f = v.parse::<f64>().ok()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Coerce a whole text column of counts; the first bad cell fails it.
pub fn coerce_count_column(name: &str, arr: &StringArray) -> Result<Int64Array> {
    let mut b = Int64Builder::with_capacity(arr.len());
    for (row, opt) in arr.iter().enumerate() {
        match opt {
            None => b.append_null(),
            Some(s) => {
                let n = coerce_count(s).ok_or_else(|| LoadError::TypeCoercion {
                    column: name.to_string(),
                    row,
                    value: s.to_string(),
                })?;
                b.append_value(n);
            }
        }
    }
    Ok(b.finish())
}
