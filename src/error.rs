//! Failure taxonomy of a load. Every variant is fatal: a load either returns
//! the whole table or one of these.

use arrow::error::ArrowError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source file not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("column `{column}` row {row}: {value:?} is not a non-negative integer")]
    TypeCoercion {
        column: String,
        /// Index into the table after missing-value elimination.
        row: usize,
        value: String,
    },

    #[error("building arrow table: {0}")]
    Arrow(#[from] ArrowError),
}

/// The source could not be read as the expected CSV.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("missing required column `{0}`")]
    MissingColumn(String),

    #[error("column `{0}` appears more than once after lower-casing headers")]
    DuplicateColumn(String),

    #[error("line {line}: cannot parse date {value:?}")]
    Date { line: u64, value: String },
}

pub type Result<T> = std::result::Result<T, LoadError>;

impl LoadError {
    pub fn is_source_not_found(&self) -> bool {
        matches!(self, Self::SourceNotFound { .. })
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    pub fn is_type_coercion(&self) -> bool {
        matches!(self, Self::TypeCoercion { .. })
    }
}

/// A cleaned table that breaks one of its guarantees.
#[derive(Debug, Error)]
#[error("row {row}: {message}")]
pub struct InvariantViolation {
    pub row: usize,
    pub message: String,
}
