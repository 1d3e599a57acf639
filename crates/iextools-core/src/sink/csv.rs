use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{SinkError, SymbolRecords};

/// Write one `<symbol>.csv` per symbol into `dir`, one record per line, no
/// header row. Returns the written paths in symbol order.
pub fn write_csv_dir(records: &SymbolRecords, dir: &Path) -> Result<Vec<PathBuf>, SinkError> {
    if !dir.is_dir() {
        return Err(SinkError::MissingDirectory {
            path: dir.to_path_buf(),
        });
    }

    let mut written = Vec::with_capacity(records.symbol_count());
    for (symbol, lines) in records.iter() {
        let path = dir.join(csv_file_name(symbol)?);
        write_lines(&path, lines).map_err(|source| SinkError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(symbol, records = lines.len(), path = %path.display(), "wrote symbol file");
        written.push(path);
    }
    Ok(written)
}

fn csv_file_name(symbol: &str) -> Result<String, SinkError> {
    let unsafe_name = symbol.is_empty()
        || symbol == "."
        || symbol == ".."
        || symbol.contains(['/', '\\', '\0']);
    if unsafe_name {
        return Err(SinkError::InvalidSymbol {
            symbol: symbol.to_string(),
        });
    }
    Ok(format!("{symbol}.csv"))
}

fn write_lines(path: &Path, lines: &[String]) -> std::io::Result<()> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::{csv_file_name, write_csv_dir};
    use crate::sink::{RecordSink, SinkError, SymbolRecords};

    #[test]
    fn writes_one_file_per_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let mut records = SymbolRecords::new();
        records.accept("IBM", "1,100,100.0".to_string());
        records.accept("IBM", "2,50,100.5".to_string());
        records.accept("AAPL", "3,10,150.0".to_string());

        let written = write_csv_dir(&records, dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0], dir.path().join("AAPL.csv"));

        let ibm = std::fs::read_to_string(dir.path().join("IBM.csv")).unwrap();
        assert_eq!(ibm, "1,100,100.0\n2,50,100.5\n");
    }

    #[test]
    fn missing_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_csv_dir(&SymbolRecords::new(), &dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, SinkError::MissingDirectory { .. }));
    }

    #[test]
    fn path_like_symbols_are_rejected() {
        assert!(csv_file_name("BRK.A").is_ok());
        assert!(csv_file_name("").is_err());
        assert!(csv_file_name("..").is_err());
        assert!(csv_file_name("A/B").is_err());
    }
}
