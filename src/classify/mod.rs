//! Text heuristics that turn free-text cells into categorical values.
//!
//! Each rule is a strategy trait so a pipeline can be handed a different
//! rule set without changing shape. Rules see the cell already trimmed and
//! do their own case folding.

pub mod country;
pub mod manufacturer;
pub mod sector;

use std::borrow::Cow;

use crate::config::{CleaningConfig, CountryScheme, SectorScheme};

pub use country::{BasicCountries, OceanCountries};
pub use manufacturer::TypePrefixManufacturer;
pub use sector::{Sector, ThreeWaySectors, TwoWaySectors};

pub trait SectorClassifier: Send + Sync {
    fn classify(&self, operator: &str) -> Sector;

    /// Every value `classify` can return.
    fn sectors(&self) -> &'static [Sector];
}

pub trait CountryNormalizer: Send + Sync {
    fn normalize<'a>(&self, country: &'a str) -> Cow<'a, str>;
}

pub trait ManufacturerExtractor: Send + Sync {
    fn extract<'a>(&self, aircraft_type: &'a str) -> Cow<'a, str>;
}

/// The rule set one pipeline run uses.
pub struct Classifiers {
    pub sector: Box<dyn SectorClassifier>,
    pub country: Box<dyn CountryNormalizer>,
    pub manufacturer: Box<dyn ManufacturerExtractor>,
}

impl Classifiers {
    pub fn from_config(cfg: &CleaningConfig) -> Self {
        let sector: Box<dyn SectorClassifier> = match cfg.sector_scheme {
            SectorScheme::ThreeWay => Box::new(ThreeWaySectors),
            SectorScheme::TwoWay => Box::new(TwoWaySectors),
        };
        let country: Box<dyn CountryNormalizer> = match cfg.country_scheme {
            CountryScheme::Basic => Box::new(BasicCountries::new()),
            CountryScheme::Oceans => Box::new(OceanCountries::new()),
        };
        Self {
            sector,
            country,
            manufacturer: Box::new(TypePrefixManufacturer),
        }
    }
}

impl Default for Classifiers {
    fn default() -> Self {
        Self::from_config(&CleaningConfig::default())
    }
}

impl std::fmt::Debug for Classifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifiers")
            .field("sectors", &self.sector.sectors())
            .finish_non_exhaustive()
    }
}

/// The part of a location after its last comma, trimmed.
pub fn country_part(location: &str) -> &str {
    location.rsplit(',').next().unwrap_or(location).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_part_takes_last_segment() {
        assert_eq!(country_part("Near Denver, Colorado"), "Colorado");
        assert_eq!(country_part("Off Kent, England ,  UK "), "UK");
        assert_eq!(country_part("  Atlantic Ocean "), "Atlantic Ocean");
        assert_eq!(country_part("Somewhere,"), "");
    }

    #[test]
    fn config_selects_strategies() {
        let cfg = CleaningConfig {
            sector_scheme: SectorScheme::TwoWay,
            country_scheme: CountryScheme::Basic,
            ..CleaningConfig::default()
        };
        let c = Classifiers::from_config(&cfg);
        assert_eq!(c.sector.classify("Private owner"), Sector::Civilian);
        assert_eq!(c.country.normalize("North Atlantic"), "North Atlantic");

        let c = Classifiers::default();
        assert_eq!(c.sector.classify("Private owner"), Sector::Private);
        assert_eq!(c.country.normalize("North Atlantic"), "Atlantic Ocean");
        assert_eq!(c.manufacturer.extract("Boeing 707"), "Boeing");
    }
}
