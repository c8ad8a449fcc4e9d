use serde::Serialize;
use std::fmt;

use super::SectorClassifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Sector {
    Military,
    Private,
    Commercial,
    Civilian,
}

impl Sector {
    pub fn as_str(self) -> &'static str {
        match self {
            Sector::Military => "Military",
            Sector::Private => "Private",
            Sector::Commercial => "Commercial",
            Sector::Civilian => "Civilian",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Military, then private/business operators, everything else commercial.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreeWaySectors;

impl SectorClassifier for ThreeWaySectors {
    fn classify(&self, operator: &str) -> Sector {
        let op = operator.to_lowercase();
        if op.contains("military") {
            Sector::Military
        } else if op.contains("private") || op.contains("business") {
            Sector::Private
        } else {
            Sector::Commercial
        }
    }

    fn sectors(&self) -> &'static [Sector] {
        &[Sector::Military, Sector::Private, Sector::Commercial]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TwoWaySectors;

impl SectorClassifier for TwoWaySectors {
    fn classify(&self, operator: &str) -> Sector {
        if operator.to_lowercase().contains("military") {
            Sector::Military
        } else {
            Sector::Civilian
        }
    }

    fn sectors(&self) -> &'static [Sector] {
        &[Sector::Military, Sector::Civilian]
    }
}
