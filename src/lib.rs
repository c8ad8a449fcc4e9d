pub mod acquire;
pub mod analysis;
pub mod classify;
pub mod config;
pub mod error;
pub mod loader;
pub mod process;
pub mod report;
pub mod table;

#[cfg(test)]
mod testing;

pub use config::{CleaningConfig, Config, Variant};
pub use error::{InvariantViolation, LoadError, ParseError};
pub use loader::{load, Loader, Table};
pub use table::{CleanRecord, CrashTable};
