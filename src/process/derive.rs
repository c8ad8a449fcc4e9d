//! Step 6: build every canonical column from the dense, trimmed batch.
//!
//! Columns are independent of one another, so they are derived on the rayon
//! pool and collected back in canonical order. Count coercion runs first and
//! is the only fallible part; when several count columns are bad the error
//! for the earliest one in canonical order wins.

use arrow::{
    array::{
        Array, ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray,
        StringDictionaryBuilder,
    },
    compute::filter,
    datatypes::Int32Type,
    record_batch::RecordBatch,
};
use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use std::{borrow::Cow, sync::Arc};
use tracing::debug;

use crate::classify::{country_part, Classifiers};
use crate::config::{Variant, ZeroAboardPolicy};
use crate::error::{ParseError, Result};
use crate::process::{
    convert::coerce_count_column,
    schema::{canonical_columns, canonical_schema, col, INTEGER_COLUMNS},
};

pub struct DeriveOptions<'a> {
    pub variant: Variant,
    pub zero_aboard: ZeroAboardPolicy,
    pub classifiers: &'a Classifiers,
}

/// Typed views of the input columns.
struct Inputs {
    date: Date32Array,
    location: StringArray,
    operator: StringArray,
    aircraft_type: StringArray,
    summary: StringArray,
    aboard: Int64Array,
    fatalities: Int64Array,
    ground: Int64Array,
}

impl Inputs {
    fn filter(self, keep: &BooleanArray) -> Result<Self> {
        Ok(Self {
            date: downcast::<Date32Array>(&filter(&self.date, keep)?, col::DATE)?,
            location: downcast::<StringArray>(&filter(&self.location, keep)?, col::LOCATION)?,
            operator: downcast::<StringArray>(&filter(&self.operator, keep)?, col::OPERATOR)?,
            aircraft_type: downcast::<StringArray>(&filter(&self.aircraft_type, keep)?, col::TYPE)?,
            summary: downcast::<StringArray>(&filter(&self.summary, keep)?, col::SUMMARY)?,
            aboard: downcast::<Int64Array>(&filter(&self.aboard, keep)?, col::ABOARD)?,
            fatalities: downcast::<Int64Array>(&filter(&self.fatalities, keep)?, col::FATALITIES)?,
            ground: downcast::<Int64Array>(&filter(&self.ground, keep)?, col::GROUND)?,
        })
    }

    fn dates(&self) -> impl Iterator<Item = Option<NaiveDate>> + '_ {
        (0..self.date.len()).map(|i| {
            if self.date.is_valid(i) {
                self.date.value_as_date(i)
            } else {
                None
            }
        })
    }
}

fn downcast<T: Array + Clone + 'static>(arr: &ArrayRef, name: &str) -> Result<T> {
    arr.as_any()
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| ParseError::MissingColumn(name.to_string()).into())
}

fn input<T: Array + Clone + 'static>(batch: &RecordBatch, name: &str) -> Result<T> {
    let arr = batch
        .column_by_name(name)
        .ok_or_else(|| ParseError::MissingColumn(name.to_string()))?;
    downcast(arr, name)
}

/// Build the canonical batch for `opts.variant` from the lower-cased, dense,
/// trimmed batch.
#[tracing::instrument(level = "debug", skip_all, fields(rows = batch.num_rows()))]
pub fn derive_canonical(batch: &RecordBatch, opts: &DeriveOptions<'_>) -> Result<RecordBatch> {
    let text: Vec<StringArray> = INTEGER_COLUMNS
        .iter()
        .map(|name| input::<StringArray>(batch, name))
        .collect::<Result<_>>()?;

    let coerced: Vec<Result<Int64Array>> = INTEGER_COLUMNS[..]
        .par_iter()
        .zip(text.par_iter())
        .map(|(name, arr)| coerce_count_column(name, arr))
        .collect();
    let mut counts = coerced.into_iter().collect::<Result<Vec<_>>>()?.into_iter();
    let (Some(aboard), Some(fatalities), Some(ground)) =
        (counts.next(), counts.next(), counts.next())
    else {
        unreachable!("three count columns coerced")
    };

    let mut inputs = Inputs {
        date: input(batch, col::DATE)?,
        location: input(batch, col::LOCATION)?,
        operator: input(batch, col::OPERATOR)?,
        aircraft_type: input(batch, col::TYPE)?,
        summary: input(batch, col::SUMMARY)?,
        aboard,
        fatalities,
        ground,
    };

    if opts.variant == Variant::Extended && opts.zero_aboard == ZeroAboardPolicy::DropRow {
        let keep: BooleanArray = inputs.aboard.iter().map(|a| a.map(|n| n != 0)).collect();
        let before = inputs.aboard.len();
        inputs = inputs.filter(&keep)?;
        debug!(
            dropped = before - inputs.aboard.len(),
            "dropped rows with nobody aboard"
        );
    }

    let columns: Vec<ArrayRef> = canonical_columns(opts.variant)
        .par_iter()
        .map(|name| derive_column(name, &inputs, opts.classifiers))
        .collect();

    RecordBatch::try_new(canonical_schema(opts.variant), columns)
        .map_err(Into::into)
}

fn categorical<'a, I>(values: I) -> ArrayRef
where
    I: Iterator<Item = Option<Cow<'a, str>>>,
{
    let mut b = StringDictionaryBuilder::<Int32Type>::new();
    for v in values {
        match v {
            Some(s) => {
                b.append_value(s.as_ref());
            }
            None => b.append_null(),
        }
    }
    Arc::new(b.finish())
}

fn sector_label(classifiers: &Classifiers, operator: &str) -> Cow<'static, str> {
    Cow::Borrowed(classifiers.sector.classify(operator).as_str())
}

fn derive_column(name: &str, inputs: &Inputs, classifiers: &Classifiers) -> ArrayRef {
    match name {
        col::DATE => Arc::new(inputs.date.clone()),
        col::YEAR => Arc::new(
            inputs
                .dates()
                .map(|d| d.map(|d| i64::from(d.year())))
                .collect::<Int64Array>(),
        ),
        col::MONTH => Arc::new(
            inputs
                .dates()
                .map(|d| d.map(|d| d.format("%B").to_string()))
                .collect::<StringArray>(),
        ),
        col::LOCATION => Arc::new(inputs.location.clone()),
        col::COUNTRY => categorical(
            inputs
                .location
                .iter()
                .map(|l| l.map(|l| classifiers.country.normalize(country_part(l)))),
        ),
        col::SECTOR => categorical(
            inputs
                .operator
                .iter()
                .map(|o| o.map(|o| sector_label(classifiers, o))),
        ),
        col::OPERATOR => Arc::new(inputs.operator.clone()),
        col::MANUFACTURER => categorical(
            inputs
                .aircraft_type
                .iter()
                .map(|t| t.map(|t| classifiers.manufacturer.extract(t))),
        ),
        col::TYPE => Arc::new(inputs.aircraft_type.clone()),
        col::ABOARD => Arc::new(inputs.aboard.clone()),
        col::FATALITIES => Arc::new(inputs.fatalities.clone()),
        col::FATALITY_PCT => Arc::new(
            inputs
                .fatalities
                .iter()
                .zip(inputs.aboard.iter())
                .map(|(f, a)| match (f, a) {
                    (Some(_), Some(0)) => Some(f64::NAN),
                    (Some(f), Some(a)) => Some(f as f64 / a as f64),
                    _ => None,
                })
                .collect::<Float64Array>(),
        ),
        col::GROUND => Arc::new(inputs.ground.clone()),
        col::SUMMARY => Arc::new(inputs.summary.clone()),
        other => unreachable!("no derivation for column `{other}`"),
    }
}
