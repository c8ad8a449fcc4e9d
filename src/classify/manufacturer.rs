use std::borrow::Cow;

use super::ManufacturerExtractor;

pub const DE_HAVILLAND: &str = "De Havilland";
/// Spelled the way the dataset labels it.
pub const MCDONNELL_DOUGLAS: &str = "McDonell Douglas";

/// Multi-word makers by name, otherwise the first word of the type.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypePrefixManufacturer;

impl ManufacturerExtractor for TypePrefixManufacturer {
    fn extract<'a>(&self, aircraft_type: &'a str) -> Cow<'a, str> {
        let trimmed = aircraft_type.trim();
        let lower = trimmed.to_lowercase();
        if lower.contains("de havilland") {
            Cow::Borrowed(DE_HAVILLAND)
        } else if lower.contains("mcdonnell douglas") {
            Cow::Borrowed(MCDONNELL_DOUGLAS)
        } else {
            Cow::Borrowed(trimmed.split_whitespace().next().unwrap_or(trimmed))
        }
    }
}
