//! Fixtures shared by the unit tests.

use std::io::Write;
use tempfile::NamedTempFile;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub const HEADER: &str =
    "Date,Time,Location,Operator,Flight #,Route,Type,Registration,cn/In,Aboard,Fatalities,Ground,Summary";

pub fn init_test_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,aircrash=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// A temp CSV with the dataset header followed by `rows`.
pub fn write_csv(rows: &[&str]) -> anyhow::Result<NamedTempFile> {
    write_csv_with(HEADER, rows)
}

pub fn write_csv_with(header: &str, rows: &[&str]) -> anyhow::Result<NamedTempFile> {
    let mut tmp = NamedTempFile::new()?;
    writeln!(tmp, "{header}")?;
    for row in rows {
        writeln!(tmp, "{row}")?;
    }
    tmp.flush()?;
    Ok(tmp)
}
