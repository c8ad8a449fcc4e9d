use arrow::{
    array::{
        Array, ArrayRef, AsArray, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray,
    },
    compute::filter_record_batch,
    datatypes::{DataType, Date32Type, Float64Type, Int32Type, Int64Type, SchemaRef},
    error::ArrowError,
    record_batch::RecordBatch,
};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashSet;

use crate::classify::{country::is_us_region, Sector};
use crate::config::Variant;
use crate::error::InvariantViolation;
use crate::process::schema::{canonical_columns, canonical_schema, col};

/// One cleaned accident.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanRecord {
    pub date: NaiveDate,
    pub year: i64,
    pub month: String,
    pub location: String,
    pub country: String,
    pub sector: String,
    pub operator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(rename = "type")]
    pub aircraft_type: String,
    pub aboard: i64,
    pub fatalities: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatality_pct: Option<f64>,
    pub ground: i64,
    pub summary: String,
}

/// The canonical table of one pipeline run. Holds a batch whose schema is
/// exactly `canonical_schema(variant)`, and the sector values the run's
/// classifier can produce.
#[derive(Debug, Clone)]
pub struct CrashTable {
    batch: RecordBatch,
    variant: Variant,
    sector_set: &'static [Sector],
}

impl CrashTable {
    /// Caller guarantees the schema; the pipeline builds the batch against it.
    pub(crate) fn new(batch: RecordBatch, variant: Variant, sector_set: &'static [Sector]) -> Self {
        debug_assert_eq!(batch.schema(), canonical_schema(variant));
        Self {
            batch,
            variant,
            sector_set,
        }
    }

    /// Wrap a batch from elsewhere (e.g. read back from Parquet).
    pub fn try_from_batch(
        batch: RecordBatch,
        variant: Variant,
        sector_set: &'static [Sector],
    ) -> Result<Self, ArrowError> {
        let expected = canonical_schema(variant);
        if batch.schema().fields() != expected.fields() {
            return Err(ArrowError::SchemaError(format!(
                "batch does not have the {variant:?} canonical schema"
            )));
        }
        let batch = batch.with_schema(expected)?;
        Ok(Self {
            batch,
            variant,
            sector_set,
        })
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Every value the `sector` column may hold.
    pub fn sector_set(&self) -> &'static [Sector] {
        self.sector_set
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn has_column(&self, name: &str) -> bool {
        canonical_columns(self.variant).contains(&name)
    }

    fn column(&self, name: &str) -> &ArrayRef {
        let idx = canonical_columns(self.variant)
            .iter()
            .position(|c| *c == name)
            .unwrap_or_else(|| panic!("`{name}` is not a {:?} column", self.variant));
        self.batch.column(idx)
    }

    pub fn dates(&self) -> &Date32Array {
        self.column(col::DATE).as_primitive::<Date32Type>()
    }

    pub fn years(&self) -> &Int64Array {
        self.column(col::YEAR).as_primitive::<Int64Type>()
    }

    pub fn months(&self) -> &StringArray {
        self.column(col::MONTH).as_string::<i32>()
    }

    pub fn locations(&self) -> &StringArray {
        self.column(col::LOCATION).as_string::<i32>()
    }

    pub fn operators(&self) -> &StringArray {
        self.column(col::OPERATOR).as_string::<i32>()
    }

    pub fn types(&self) -> &StringArray {
        self.column(col::TYPE).as_string::<i32>()
    }

    pub fn summaries(&self) -> &StringArray {
        self.column(col::SUMMARY).as_string::<i32>()
    }

    pub fn aboard(&self) -> &Int64Array {
        self.column(col::ABOARD).as_primitive::<Int64Type>()
    }

    pub fn fatalities(&self) -> &Int64Array {
        self.column(col::FATALITIES).as_primitive::<Int64Type>()
    }

    pub fn ground(&self) -> &Int64Array {
        self.column(col::GROUND).as_primitive::<Int64Type>()
    }

    /// `None` on a basic table.
    pub fn fatality_pct(&self) -> Option<&Float64Array> {
        self.has_column(col::FATALITY_PCT)
            .then(|| self.column(col::FATALITY_PCT).as_primitive::<Float64Type>())
    }

    pub fn countries(&self) -> Vec<&str> {
        self.categorical(col::COUNTRY)
    }

    pub fn sectors(&self) -> Vec<&str> {
        self.categorical(col::SECTOR)
    }

    /// `None` on a basic table.
    pub fn manufacturers(&self) -> Option<Vec<&str>> {
        self.has_column(col::MANUFACTURER)
            .then(|| self.categorical(col::MANUFACTURER))
    }

    fn categorical(&self, name: &str) -> Vec<&str> {
        self.string_values(name).unwrap_or_default()
    }

    /// Per-row text of a text or categorical column; `None` for other columns.
    pub fn string_values(&self, name: &str) -> Option<Vec<&str>> {
        if !self.has_column(name) {
            return None;
        }
        let arr = self.column(name);
        match arr.data_type() {
            DataType::Utf8 => Some(
                arr.as_string::<i32>()
                    .iter()
                    .map(|v| v.unwrap_or(""))
                    .collect(),
            ),
            DataType::Dictionary(_, _) => {
                let dict = arr.as_dictionary::<Int32Type>();
                let values = dict.values().as_string::<i32>();
                Some(
                    dict.keys()
                        .iter()
                        .map(|k| k.map(|k| values.value(k as usize)).unwrap_or(""))
                        .collect(),
                )
            }
            _ => None,
        }
    }

    /// Rows whose `column` value is one of `values`.
    pub fn filter_in<S: AsRef<str>>(&self, column: &str, values: &[S]) -> Result<Self, ArrowError> {
        let wanted: HashSet<&str> = values.iter().map(AsRef::as_ref).collect();
        let cells = self.string_values(column).ok_or_else(|| {
            ArrowError::InvalidArgumentError(format!("`{column}` is not a text column"))
        })?;
        let keep: BooleanArray = cells.iter().map(|c| Some(wanted.contains(c))).collect();
        Ok(Self {
            batch: filter_record_batch(&self.batch, &keep)?,
            variant: self.variant,
            sector_set: self.sector_set,
        })
    }

    /// Rows where `pred(fatality_pct)` holds. Empty on a basic table.
    pub fn filter_fatality_pct(&self, pred: impl Fn(f64) -> bool) -> Result<Self, ArrowError> {
        let keep: BooleanArray = match self.fatality_pct() {
            Some(pct) => pct.iter().map(|v| Some(v.is_some_and(&pred))).collect(),
            None => BooleanArray::from(vec![false; self.num_rows()]),
        };
        Ok(Self {
            batch: filter_record_batch(&self.batch, &keep)?,
            variant: self.variant,
            sector_set: self.sector_set,
        })
    }

    /// Materialize every row. A date outside chrono's range fails the call.
    pub fn records(&self) -> Result<Vec<CleanRecord>, InvariantViolation> {
        let dates = self.dates();
        let years = self.years();
        let months = self.months();
        let locations = self.locations();
        let countries = self.countries();
        let sectors = self.sectors();
        let operators = self.operators();
        let manufacturers = self.manufacturers();
        let types = self.types();
        let aboard = self.aboard();
        let fatalities = self.fatalities();
        let pct = self.fatality_pct();
        let ground = self.ground();
        let summaries = self.summaries();

        (0..self.num_rows())
            .map(|i| {
                let Some(date) = dates.value_as_date(i) else {
                    let days = dates.value(i);
                    return Err(InvariantViolation {
                        row: i,
                        message: format!("date {days} days from epoch is out of range"),
                    });
                };
                Ok(CleanRecord {
                    date,
                    year: years.value(i),
                    month: months.value(i).to_string(),
                    location: locations.value(i).to_string(),
                    country: countries[i].to_string(),
                    sector: sectors[i].to_string(),
                    operator: operators.value(i).to_string(),
                    manufacturer: manufacturers.as_ref().map(|m| m[i].to_string()),
                    aircraft_type: types.value(i).to_string(),
                    aboard: aboard.value(i),
                    fatalities: fatalities.value(i),
                    fatality_pct: pct.map(|p| p.value(i)),
                    ground: ground.value(i),
                    summary: summaries.value(i).to_string(),
                })
            })
            .collect()
    }

    /// Check every guarantee of a cleaned table; the first broken one is returned.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let fail = |row: usize, message: String| Err(InvariantViolation { row, message });

        let names = canonical_columns(self.variant);
        for (name, arr) in names.iter().zip(self.batch.columns()) {
            if arr.null_count() > 0 {
                let row = (0..arr.len()).find(|i| arr.is_null(*i)).unwrap_or_default();
                return fail(row, format!("missing value in `{name}`"));
            }
        }

        let sectors = self.sectors();
        let scheme: Vec<&str> = self.sector_set.iter().map(|s| s.as_str()).collect();
        let countries = self.countries();
        let dates = self.dates();
        let years = self.years();
        let months = self.months();
        let locations = self.locations();
        let aboard = self.aboard();
        let fatalities = self.fatalities();
        let pct = self.fatality_pct();

        for row in 0..self.num_rows() {
            if !scheme.contains(&sectors[row]) {
                let message = format!("sector {:?} outside {:?}", sectors[row], scheme);
                return fail(row, message);
            }
            if is_us_region(countries[row]) {
                return fail(row, format!("country {:?} is a US region", countries[row]));
            }
            if locations.value(row).is_empty() {
                return fail(row, "empty location".into());
            }
            let Some(date) = dates.value_as_date(row) else {
                return fail(row, "date out of range".into());
            };
            if years.value(row) != i64::from(date.year()) {
                let message = format!("year {} does not match {date}", years.value(row));
                return fail(row, message);
            }
            if months.value(row) != date.format("%B").to_string() {
                let message = format!("month {:?} does not match {date}", months.value(row));
                return fail(row, message);
            }
            if aboard.value(row) < 0 || fatalities.value(row) < 0 || self.ground().value(row) < 0 {
                return fail(row, "negative count".into());
            }
            if let Some(pct) = pct {
                let (f, a, p) = (fatalities.value(row), aboard.value(row), pct.value(row));
                let ok = if a > 0 {
                    p == f as f64 / a as f64
                } else {
                    p.is_nan()
                };
                if !ok {
                    return fail(row, format!("fatality_pct {p} for {f}/{a}"));
                }
            }
        }
        Ok(())
    }
}
