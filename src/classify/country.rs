use once_cell::sync::Lazy;
use std::{borrow::Cow, collections::HashSet};

use super::CountryNormalizer;
use crate::config::US_STATES;

pub const UNITED_STATES: &str = "United States";
pub const RUSSIA: &str = "Russia";
pub const ATLANTIC_OCEAN: &str = "Atlantic Ocean";
pub const PACIFIC_OCEAN: &str = "Pacific Ocean";

static US_REGIONS: Lazy<HashSet<String>> =
    Lazy::new(|| US_STATES.iter().map(|s| s.trim().to_lowercase()).collect());

/// True when `name` is one of the US regions that get folded into the country.
pub fn is_us_region(name: &str) -> bool {
    US_REGIONS.contains(&name.trim().to_lowercase())
}

fn fold_regions(country: &str) -> Option<&'static str> {
    let key = country.trim().to_lowercase();
    if US_REGIONS.contains(&key) {
        Some(UNITED_STATES)
    } else if key == "ussr" || key == "russia" {
        Some(RUSSIA)
    } else {
        None
    }
}

/// US regions → United States, USSR → Russia.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicCountries;

impl BasicCountries {
    pub fn new() -> Self {
        Self
    }
}

impl CountryNormalizer for BasicCountries {
    fn normalize<'a>(&self, country: &'a str) -> Cow<'a, str> {
        match fold_regions(country) {
            Some(c) => Cow::Borrowed(c),
            None => Cow::Borrowed(country.trim()),
        }
    }
}

/// `BasicCountries` plus ocean folding.
#[derive(Debug, Clone, Copy, Default)]
pub struct OceanCountries;

impl OceanCountries {
    pub fn new() -> Self {
        Self
    }
}

impl CountryNormalizer for OceanCountries {
    fn normalize<'a>(&self, country: &'a str) -> Cow<'a, str> {
        if let Some(c) = fold_regions(country) {
            return Cow::Borrowed(c);
        }
        let lower = country.to_lowercase();
        if lower.contains("atlantic") {
            Cow::Borrowed(ATLANTIC_OCEAN)
        } else if lower.contains("pacific") {
            Cow::Borrowed(PACIFIC_OCEAN)
        } else {
            Cow::Borrowed(country.trim())
        }
    }
}
