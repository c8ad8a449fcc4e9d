use csv::ReaderBuilder;
use std::{
    fs::File,
    io::{BufReader, ErrorKind},
    path::Path,
};
use tracing::debug;

use crate::error::{LoadError, ParseError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Header row exactly as the file spells it.
    pub headers: Vec<String>,
    /// Each data row, one String per field.
    pub rows: Vec<Vec<String>>,
    /// 1-based line in the source where each row starts.
    pub lines: Vec<u64>,
}

impl RawTable {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// All cells of column `idx`, top to bottom.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |r| r[idx].as_str())
    }
}

/// Read the whole CSV into memory. Invalid UTF-8 is replaced rather than rejected;
/// rows whose field count differs from the header are a parse error.
#[tracing::instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_raw_csv<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => LoadError::SourceNotFound {
            path: path.to_path_buf(),
        },
        _ => ParseError::Io {
            path: path.to_path_buf(),
            source: e,
        }
        .into(),
    })?;

    let csv_err = |source: csv::Error| ParseError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(BufReader::new(file));

    let headers: Vec<String> = rdr
        .byte_headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();

    let mut rows = Vec::new();
    let mut lines = Vec::new();
    for result in rdr.byte_records() {
        let record = result.map_err(csv_err)?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        lines.push(line);
        rows.push(
            record
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect(),
        );
    }

    debug!(columns = headers.len(), rows = rows.len(), "read raw csv");
    Ok(RawTable {
        headers,
        rows,
        lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_headers_rows_and_lines() -> anyhow::Result<()> {
        let mut tmp = NamedTempFile::new()?;
        write!(
            tmp,
            "Date,Summary\n09/17/1908,\"first line\nsecond line\"\n07/12/1912,short\n"
        )?;

        let raw = read_raw_csv(tmp.path())?;
        assert_eq!(raw.headers, vec!["Date", "Summary"]);
        assert_eq!(raw.num_rows(), 2);
        assert_eq!(raw.rows[0][1], "first line\nsecond line");
        assert_eq!(raw.lines, vec![2, 4]);
        let dates: Vec<&str> = raw.column(0).collect();
        assert_eq!(dates, vec!["09/17/1908", "07/12/1912"]);
        Ok(())
    }

    #[test]
    fn missing_file_is_source_not_found() {
        let err = read_raw_csv("/definitely/not/here.csv").unwrap_err();
        assert!(err.is_source_not_found(), "{err}");
    }

    #[test]
    fn ragged_row_is_parse_error() -> anyhow::Result<()> {
        let mut tmp = NamedTempFile::new()?;
        write!(tmp, "a,b\n1,2\n3\n")?;
        let err = read_raw_csv(tmp.path()).unwrap_err();
        assert!(err.is_parse(), "{err}");
        Ok(())
    }
}
