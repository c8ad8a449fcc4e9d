// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// File name the dataset archive unpacks to.
pub const RAW_FILE_NAME: &str = "Airplane_Crashes_and_Fatalities_Since_1908.csv";

/// File name of the canonical table export inside the processed directory.
pub const CLEAN_FILE_NAME: &str = "crashes.parquet";

/// Region names that show up in the `country` slot of a location and are
/// folded into "United States". "District " / "of Columbia" are kept split
/// the way the source data splits them.
pub const US_STATES: &[&str] = &[
    "Alaska",
    "Alabama",
    "Arkansas",
    "American Samoa",
    "Arizona",
    "California",
    "Colorado",
    "Connecticut",
    "District ",
    "of Columbia",
    "Delaware",
    "Florida",
    "Georgia",
    "Guam",
    "Hawaii",
    "Iowa",
    "Idaho",
    "Illinois",
    "Indiana",
    "Kansas",
    "Kentucky",
    "Louisiana",
    "Massachusetts",
    "Maryland",
    "Maine",
    "Michigan",
    "Minnesota",
    "Missouri",
    "Mississippi",
    "Montana",
    "North Carolina",
    "North Dakota",
    "Nebraska",
    "New Hampshire",
    "New Jersey",
    "New Mexico",
    "Nevada",
    "New York",
    "Ohio",
    "Oklahoma",
    "Oregon",
    "Pennsylvania",
    "Puerto Rico",
    "Rhode Island",
    "South Carolina",
    "South Dakota",
    "Tennessee",
    "Texas",
    "Utah",
    "Virginia",
    "Virgin Islands",
    "Vermont",
    "Washington",
    "Wisconsin",
    "West Virginia",
    "Wyoming",
];

/// Calendar ordering for month-keyed charts.
pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Markers read as a missing cell (pandas' default NA set).
pub const DEFAULT_NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub const DEFAULT_DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d", "%d %B %Y"];

/// Which set of columns the canonical table carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// No `manufacturer`, no `fatality_pct`.
    Basic,
    #[default]
    Extended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SectorScheme {
    /// Military / Private / Commercial
    #[default]
    ThreeWay,
    /// Military / Civilian
    TwoWay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CountryScheme {
    /// US regions and USSR only.
    Basic,
    /// Additionally folds anything mentioning the Atlantic or Pacific into the ocean name.
    #[default]
    Oceans,
}

/// What to do with `fatality_pct` when nobody was aboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ZeroAboardPolicy {
    /// Keep the row, store NaN.
    #[default]
    NotANumber,
    /// Remove the row before derivation.
    DropRow,
}

/// Options steering the cleaning pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub variant: Variant,
    pub sector_scheme: SectorScheme,
    pub country_scheme: CountryScheme,
    pub zero_aboard: ZeroAboardPolicy,
    /// chrono format strings, tried in order.
    pub date_formats: Vec<String>,
    pub na_values: Vec<String>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            sector_scheme: SectorScheme::default(),
            country_scheme: CountryScheme::default(),
            zero_aboard: ZeroAboardPolicy::default(),
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|s| s.to_string()).collect(),
            na_values: DEFAULT_NA_VALUES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Project directory layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub raw_data: PathBuf,
    pub processed_data: PathBuf,
    pub final_data: PathBuf,
    pub figures: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::under(Path::new("."))
    }
}

impl Paths {
    /// Standard layout rooted at `root`.
    pub fn under(root: &Path) -> Self {
        Self {
            raw_data: root.join("data").join("raw"),
            processed_data: root.join("data").join("processed"),
            final_data: root.join("data").join("final"),
            figures: root.join("reports").join("figures"),
        }
    }

    pub fn raw_file(&self) -> PathBuf {
        self.raw_data.join(RAW_FILE_NAME)
    }

    pub fn clean_file(&self) -> PathBuf {
        self.processed_data.join(CLEAN_FILE_NAME)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub paths: Paths,
    pub cleaning: CleaningConfig,
}

impl Config {
    /// Read a YAML config. Any field left out keeps its default.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(Into::into)
    }

    /// `Some(path)` loads the file, `None` gives the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_yaml_file(p),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn partial_yaml_keeps_defaults() -> Result<()> {
        let cfg = Config::from_yaml_str(
            r#"
cleaning:
  sector_scheme: two_way
  zero_aboard: drop_row
paths:
  figures: out/figs
"#,
        )?;
        assert_eq!(cfg.cleaning.sector_scheme, SectorScheme::TwoWay);
        assert_eq!(cfg.cleaning.zero_aboard, ZeroAboardPolicy::DropRow);
        assert_eq!(cfg.cleaning.variant, Variant::Extended);
        assert_eq!(cfg.cleaning.country_scheme, CountryScheme::Oceans);
        assert_eq!(cfg.cleaning.date_formats[0], "%m/%d/%Y");
        assert_eq!(cfg.paths.figures, PathBuf::from("out/figs"));
        assert_eq!(cfg.paths.raw_data, Paths::default().raw_data);
        Ok(())
    }

    #[test]
    fn empty_file_is_default() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        tmp.write_all(b"\n")?;
        assert_eq!(Config::from_yaml_file(tmp.path())?, Config::default());
        Ok(())
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        assert!(Config::from_yaml_str("cleaning:\n  sector_scheme: five_way\n").is_err());
    }

    #[test]
    fn layout_paths() {
        let p = Paths::under(Path::new("/proj"));
        assert_eq!(
            p.raw_file(),
            PathBuf::from("/proj/data/raw").join(RAW_FILE_NAME)
        );
        assert_eq!(
            p.clean_file(),
            PathBuf::from("/proj/data/processed/crashes.parquet")
        );
    }
}
