use chrono::NaiveDate;
use once_cell::sync::Lazy;

static EPOCH: Lazy<NaiveDate> =
    Lazy::new(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default());

/// Try each chrono format in turn on the trimmed input.
pub fn parse_date(s: &str, formats: &[String]) -> Option<NaiveDate> {
    let s = s.trim();
    formats
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
}

/// Days since 1970-01-01, the Arrow `Date32` encoding.
pub fn to_date32(date: NaiveDate) -> i32 {
    (date - *EPOCH).num_days() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_DATE_FORMATS;

    fn formats() -> Vec<String> {
        DEFAULT_DATE_FORMATS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_dataset_and_iso_forms() {
        let d = NaiveDate::from_ymd_opt(1908, 9, 17).unwrap();
        assert_eq!(parse_date("09/17/1908", &formats()), Some(d));
        assert_eq!(parse_date(" 1908-09-17 ", &formats()), Some(d));
        assert_eq!(parse_date("1908/09/17", &formats()), Some(d));
        assert_eq!(parse_date("17 September 1908", &formats()), Some(d));
    }

    #[test]
    fn rejects_garbage_and_impossible_dates() {
        assert_eq!(parse_date("sometime in 1920", &formats()), None);
        assert_eq!(parse_date("02/30/1950", &formats()), None);
        assert_eq!(parse_date("", &formats()), None);
    }

    #[test]
    fn date32_encoding() {
        let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(to_date32(day(1970, 1, 2)), 1);
        assert_eq!(to_date32(day(1969, 12, 31)), -1);
    }
}
