//! `load(raw_path, clean)`: the raw file as-is, or the canonical table.

use arrow::record_batch::RecordBatch;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::classify::Classifiers;
use crate::config::CleaningConfig;
use crate::error::Result;
use crate::process::{
    self,
    convert::{raw_to_batch, raw_to_dated_batch},
    derive::{derive_canonical, DeriveOptions},
    missing::{drop_incomplete_rows, NaMarkers},
    raw_table::read_raw_csv,
    trimming::trim_text_columns,
};
use crate::table::CrashTable;

/// Result of a load: the untouched file or the cleaned table.
#[derive(Debug, Clone)]
pub enum Table {
    Raw(RecordBatch),
    Clean(CrashTable),
}

impl Table {
    pub fn batch(&self) -> &RecordBatch {
        match self {
            Table::Raw(b) => b,
            Table::Clean(t) => t.batch(),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.batch().num_rows()
    }

    pub fn into_clean(self) -> Option<CrashTable> {
        match self {
            Table::Clean(t) => Some(t),
            Table::Raw(_) => None,
        }
    }
}

pub struct Loader {
    path: PathBuf,
    config: CleaningConfig,
    classifiers: Classifiers,
    na: NaMarkers,
}

impl Loader {
    /// Loader using the classifiers `config` selects.
    pub fn new(path: impl Into<PathBuf>, config: CleaningConfig) -> Self {
        let classifiers = Classifiers::from_config(&config);
        Self::with_classifiers(path, config, classifiers)
    }

    /// Loader with caller-supplied rule strategies.
    pub fn with_classifiers(
        path: impl Into<PathBuf>,
        config: CleaningConfig,
        classifiers: Classifiers,
    ) -> Self {
        let na = NaMarkers::new(config.na_values.iter().cloned());
        Self {
            path: path.into(),
            config,
            classifiers,
            na,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self, clean: bool) -> Result<Table> {
        if clean {
            self.load_clean().map(Table::Clean)
        } else {
            self.load_raw().map(Table::Raw)
        }
    }

    /// The file as read: original headers, text columns, missing cells null.
    #[tracing::instrument(level = "info", skip(self), fields(path = %self.path.display()))]
    pub fn load_raw(&self) -> Result<RecordBatch> {
        let raw = read_raw_csv(&self.path)?;
        let batch = raw_to_batch(&raw, &self.na)?;
        info!(
            rows = batch.num_rows(),
            columns = batch.num_columns(),
            "loaded raw table"
        );
        Ok(batch)
    }

    #[tracing::instrument(level = "info", skip(self), fields(path = %self.path.display()))]
    pub fn load_clean(&self) -> Result<CrashTable> {
        let raw = read_raw_csv(&self.path)?;
        let parsed = raw_to_dated_batch(&raw, &self.na, &self.config.date_formats)?;
        drop(raw);

        let pruned = process::prune_columns(&parsed)?;
        let renamed = process::lowercase_headers(&pruned)?;
        let (dense, dropped) = drop_incomplete_rows(&renamed)?;
        debug!(
            dropped,
            remaining = dense.num_rows(),
            "dropped incomplete rows"
        );
        let trimmed = trim_text_columns(&dense)?;

        let opts = DeriveOptions {
            variant: self.config.variant,
            zero_aboard: self.config.zero_aboard,
            classifiers: &self.classifiers,
        };
        let canonical = derive_canonical(&trimmed, &opts)?;

        info!(
            raw_rows = parsed.num_rows(),
            dropped,
            rows = canonical.num_rows(),
            "cleaned table"
        );
        Ok(CrashTable::new(
            canonical,
            self.config.variant,
            self.classifiers.sector.sectors(),
        ))
    }
}

/// Load with the default cleaning options.
pub fn load<P: AsRef<Path>>(raw_path: P, clean: bool) -> Result<Table> {
    Loader::new(raw_path.as_ref(), CleaningConfig::default())
        .load(clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Sector, SectorClassifier};
    use crate::config::{SectorScheme, Variant, ZeroAboardPolicy};
    use crate::error::{LoadError, ParseError};
    use crate::process::schema::canonical_schema;
    use crate::testing::{init_test_logging, write_csv, write_csv_with, HEADER};
    use arrow::array::{Array, StringArray};

    #[test]
    fn denver_private_cessna() -> anyhow::Result<()> {
        init_test_logging();
        let csv = write_csv(&[
            r#"10/13/1972,14:30,"Near Denver, Colorado",Private owner,,Sightseeing,Cessna 180,N123,12,4,2,0,Crashed shortly after takeoff."#,
        ])?;
        let table = load(csv.path(), true)?.into_clean().unwrap();
        let rows = table.records()?;
        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert_eq!(r.country, "United States");
        assert_eq!(r.sector, "Private");
        assert_eq!(r.manufacturer.as_deref(), Some("Cessna"));
        assert_eq!(r.fatality_pct, Some(0.5));
        assert_eq!(r.location, "Near Denver, Colorado");
        assert_eq!(r.year, 1972);
        assert_eq!(r.month, "October");
        table.check_invariants()?;
        Ok(())
    }

    #[test]
    fn soviet_military() -> anyhow::Result<()> {
        let csv = write_csv(&[
            r#"08/12/1985,,"Moscow, USSR",USSR Military,101,,Antonov An-12,CCCP-1,1,10,10,0, Lost power. "#,
        ])?;
        let table = load(csv.path(), true)?.into_clean().unwrap();
        let r = &table.records()?[0];
        assert_eq!(r.country, "Russia");
        assert_eq!(r.sector, "Military");
        assert_eq!(r.summary, "Lost power.");
        Ok(())
    }

    #[test]
    fn blank_cells_drop_rows_but_pruned_columns_do_not() -> anyhow::Result<()> {
        let csv = write_csv(&[
            // time / flight / route / registration / cn blank: kept
            r#"09/17/1908,,"Fort Myer, Virginia",Military - U.S. Army,,,Wright Flyer III,,,2,1,0,Demonstration flight."#,
            // no summary: dropped
            r#"07/12/1912,06:30,"AtlantiCity, New Jersey",Military - U.S. Navy,,Test flight,Dirigible,,,5,5,0,"#,
            // NA aboard: dropped
            r#"08/06/1913,,"Victoria, British Columbia, Canada",Private,,,Curtiss seaplane,,,NA,1,0,Fell."#,
            // blank date: dropped
            r#",,"Somewhere, France",Air France,,,Douglas DC-3,,,3,0,0,Nothing."#,
        ])?;
        let table = load(csv.path(), true)?.into_clean().unwrap();
        assert_eq!(table.num_rows(), 1);
        assert_eq!(table.records()?[0].country, "United States");
        table.check_invariants()?;
        Ok(())
    }

    #[test]
    fn raw_load_is_untouched() -> anyhow::Result<()> {
        let csv = write_csv(&[
            r#"09/17/1908,17:18,"Fort Myer, Virginia",Military - U.S. Army,,Demonstration,Wright Flyer III,,1,2,1,0,"  padded  ""#,
        ])?;
        let batch = match load(csv.path(), false)? {
            Table::Raw(b) => b,
            Table::Clean(_) => panic!("expected the raw table"),
        };
        let headers: Vec<&str> = HEADER.split(',').collect();
        let names: Vec<String> = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, headers);
        let summary = batch
            .column(12)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(summary.value(0), "  padded  ");
        assert!(batch.column(4).is_null(0));
        Ok(())
    }

    #[test]
    fn header_without_pruned_columns_still_cleans() -> anyhow::Result<()> {
        let csv = write_csv_with(
            "Date,Location,Operator,Type,Aboard,Fatalities,Ground,Summary",
            &[
                r#"10/13/1972,"Near Denver, Colorado",Private owner,Cessna 180,4,2,0,Crashed."#,
                r#"08/12/1985,"Moscow, USSR",USSR Military,Antonov An-12,10,10,0,Lost power."#,
                r#"05/02/1950,"Lyon, France",Air France,Douglas DC-4,,2,0,No count."#,
            ],
        )?;
        let table = load(csv.path(), true)?.into_clean().unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.batch().schema(), canonical_schema(Variant::Extended));
        let rows = table.records()?;
        assert_eq!(rows[0].country, "United States");
        assert_eq!(rows[1].sector, "Military");
        table.check_invariants()?;

        let raw = load(csv.path(), false)?;
        assert_eq!(raw.batch().num_columns(), 8);
        assert_eq!(raw.num_rows(), 3);
        Ok(())
    }

    #[test]
    fn zero_aboard_is_nan_by_default() -> anyhow::Result<()> {
        let csv = write_csv(&[
            r#"05/01/1950,,"Paris, France",Air France,,,Douglas DC-3,,,0,0,2,Ground crew only."#,
        ])?;
        let table = load(csv.path(), true)?.into_clean().unwrap();
        let pct = table.records()?[0].fatality_pct.unwrap();
        assert!(pct.is_nan());
        Ok(())
    }

    #[test]
    fn zero_aboard_drop_row_policy() -> anyhow::Result<()> {
        let csv = write_csv(&[
            r#"05/01/1950,,"Paris, France",Air France,,,Douglas DC-3,,,0,0,2,Ground crew only."#,
            r#"05/02/1950,,"Lyon, France",Air France,,,Douglas DC-4,,,8,2,0,Overran."#,
        ])?;
        let cfg = CleaningConfig {
            zero_aboard: ZeroAboardPolicy::DropRow,
            ..CleaningConfig::default()
        };
        let table = Loader::new(csv.path(), cfg).load_clean()?;
        assert_eq!(table.num_rows(), 1);
        assert_eq!(table.records()?[0].fatality_pct, Some(0.25));
        Ok(())
    }

    #[test]
    fn non_numeric_count_fails_the_load() -> anyhow::Result<()> {
        let csv = write_csv(&[
            r#"05/01/1950,,"Paris, France",Air France,,,Douglas DC-3,,,3,0,0,Fine."#,
            r#"05/02/1950,,"Lyon, France",Air France,,,Douglas DC-4,,,about 8,2,0,Bad count."#,
        ])?;
        let err = load(csv.path(), true).unwrap_err();
        assert!(err.is_type_coercion());
        match err {
            LoadError::TypeCoercion { column, row, value } => {
                assert_eq!(column, "aboard");
                assert_eq!(row, 1);
                assert_eq!(value, "about 8");
            }
            other => panic!("unexpected error {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn unparseable_date_fails_even_when_raw_load_succeeds() -> anyhow::Result<()> {
        let csv = write_csv(&[
            r#"circa 1920,,"Paris, France",Air France,,,Douglas DC-3,,,3,0,0,Fine."#,
        ])?;
        assert_eq!(load(csv.path(), false)?.num_rows(), 1);
        let err = load(csv.path(), true).unwrap_err();
        assert!(
            matches!(err, LoadError::Parse(ParseError::Date { line: 2, .. })),
            "{err}"
        );
        Ok(())
    }

    #[test]
    fn missing_file() {
        for clean in [true, false] {
            let err = load("/no/such/dir/crashes.csv", clean).unwrap_err();
            assert!(err.is_source_not_found());
        }
    }

    #[test]
    fn two_way_basic_deployment() -> anyhow::Result<()> {
        let csv = write_csv(&[
            r#"09/17/1908,,"Fort Myer, Virginia",Military - U.S. Army,,,Wright Flyer III,,,2,1,0,Demo."#,
            r#"05/02/1950,,"Lyon, France",Private business jet,,,Learjet 24,,,8,2,0,Overran."#,
        ])?;
        let cfg = CleaningConfig {
            variant: Variant::Basic,
            sector_scheme: SectorScheme::TwoWay,
            ..CleaningConfig::default()
        };
        let table = Loader::new(csv.path(), cfg).load_clean()?;
        assert_eq!(table.batch().num_columns(), 12);
        let sectors: Vec<String> = table
            .records()?
            .into_iter()
            .map(|r| r.sector)
            .collect();
        assert_eq!(sectors, vec!["Military", "Civilian"]);
        assert!(table.records()?[0].manufacturer.is_none());
        table.check_invariants()?;
        Ok(())
    }

    #[test]
    fn custom_sector_strategy() -> anyhow::Result<()> {
        struct EverythingMilitary;
        impl SectorClassifier for EverythingMilitary {
            fn classify(&self, _operator: &str) -> Sector {
                Sector::Military
            }
            fn sectors(&self) -> &'static [Sector] {
                &[Sector::Military]
            }
        }

        let csv = write_csv(&[
            r#"05/02/1950,,"Lyon, France",Air France,,,Douglas DC-4,,,8,2,0,Overran."#,
        ])?;
        let mut classifiers = Classifiers::default();
        classifiers.sector = Box::new(EverythingMilitary);
        let loader =
            Loader::with_classifiers(csv.path(), CleaningConfig::default(), classifiers);
        assert_eq!(loader.load_clean()?.records()?[0].sector, "Military");
        Ok(())
    }
}
