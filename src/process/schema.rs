use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use std::sync::Arc;

use crate::config::Variant;

/// Canonical column names.
pub mod col {
    pub const DATE: &str = "date";
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";
    pub const LOCATION: &str = "location";
    pub const COUNTRY: &str = "country";
    pub const SECTOR: &str = "sector";
    pub const OPERATOR: &str = "operator";
    pub const MANUFACTURER: &str = "manufacturer";
    pub const TYPE: &str = "type";
    pub const ABOARD: &str = "aboard";
    pub const FATALITIES: &str = "fatalities";
    pub const FATALITY_PCT: &str = "fatality_pct";
    pub const GROUND: &str = "ground";
    pub const SUMMARY: &str = "summary";
}

/// Raw columns nothing downstream reads (lower-cased).
pub const PRUNED_COLUMNS: &[&str] = &["flight #", "registration", "cn/in", "route", "time"];

/// Raw columns the cleaner needs (lower-cased).
pub const REQUIRED_COLUMNS: &[&str] = &[
    col::DATE,
    col::LOCATION,
    col::OPERATOR,
    col::TYPE,
    col::ABOARD,
    col::FATALITIES,
    col::GROUND,
    col::SUMMARY,
];

pub const INTEGER_COLUMNS: [&str; 3] = [col::ABOARD, col::FATALITIES, col::GROUND];

pub const CATEGORICAL_COLUMNS: [&str; 3] = [col::COUNTRY, col::SECTOR, col::MANUFACTURER];

const EXTENDED_ORDER: &[&str] = &[
    col::DATE,
    col::YEAR,
    col::MONTH,
    col::LOCATION,
    col::COUNTRY,
    col::SECTOR,
    col::OPERATOR,
    col::MANUFACTURER,
    col::TYPE,
    col::ABOARD,
    col::FATALITIES,
    col::FATALITY_PCT,
    col::GROUND,
    col::SUMMARY,
];

const BASIC_ORDER: &[&str] = &[
    col::DATE,
    col::YEAR,
    col::MONTH,
    col::LOCATION,
    col::COUNTRY,
    col::SECTOR,
    col::OPERATOR,
    col::TYPE,
    col::ABOARD,
    col::FATALITIES,
    col::GROUND,
    col::SUMMARY,
];

/// Output column order for a variant.
pub fn canonical_columns(variant: Variant) -> &'static [&'static str] {
    match variant {
        Variant::Basic => BASIC_ORDER,
        Variant::Extended => EXTENDED_ORDER,
    }
}

pub fn categorical_type() -> DataType {
    DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8))
}

/// Arrow type of a canonical column; anything unknown is text.
pub fn canonical_type(name: &str) -> DataType {
    match name {
        col::DATE => DataType::Date32,
        col::YEAR | col::ABOARD | col::FATALITIES | col::GROUND => DataType::Int64,
        col::FATALITY_PCT => DataType::Float64,
        n if CATEGORICAL_COLUMNS.contains(&n) => categorical_type(),
        _ => DataType::Utf8,
    }
}

/// Every canonical field is non-nullable, so building a batch with a gap fails.
pub fn canonical_schema(variant: Variant) -> SchemaRef {
    let fields: Vec<Field> = canonical_columns(variant)
        .iter()
        .map(|name| Field::new(*name, canonical_type(name), false))
        .collect();
    Arc::new(Schema::new(fields))
}

/// Schema of the pass-through table: the file's headers, all nullable text.
pub fn raw_schema(headers: &[String]) -> SchemaRef {
    let fields: Vec<Field> = headers
        .iter()
        .map(|h| Field::new(h, DataType::Utf8, true))
        .collect();
    Arc::new(Schema::new(fields))
}

/// Index of `name` in `headers`, ignoring case and surrounding whitespace.
pub fn find_header(headers: &[String], name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_differ_by_two_columns() {
        let ext = canonical_schema(Variant::Extended);
        let basic = canonical_schema(Variant::Basic);
        assert_eq!(ext.fields().len(), 14);
        assert_eq!(basic.fields().len(), 12);
        assert!(ext.index_of(col::MANUFACTURER).is_ok());
        assert!(basic.index_of(col::FATALITY_PCT).is_err());
        assert!(ext.fields().iter().all(|f| !f.is_nullable()));
        assert_eq!(ext.field(11).name(), col::FATALITY_PCT);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let headers: Vec<String> = ["Date", " Flight # ", "cn/In"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(find_header(&headers, "date"), Some(0));
        assert_eq!(find_header(&headers, "flight #"), Some(1));
        assert_eq!(find_header(&headers, "CN/IN"), Some(2));
        assert_eq!(find_header(&headers, "route"), None);
    }

    #[test]
    fn types() {
        assert_eq!(canonical_type(col::COUNTRY), categorical_type());
        assert_eq!(canonical_type(col::SUMMARY), DataType::Utf8);
        assert_eq!(canonical_type(col::DATE), DataType::Date32);
    }
}
