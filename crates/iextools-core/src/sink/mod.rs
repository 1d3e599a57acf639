//! Record sinks.
//!
//! The decoder hands `(symbol, record)` pairs to a `RecordSink` one at a
//! time. `SymbolRecords` is the collector used by the CLI: it groups records
//! per symbol and writes one CSV file per symbol.

mod csv;

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

pub use csv::write_csv_dir;

/// Receiver of formatted records, keyed by trimmed symbol.
pub trait RecordSink {
    fn accept(&mut self, symbol: &str, record: String);
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn accept(&mut self, symbol: &str, record: String) {
        (**self).accept(symbol, record);
    }
}

/// In-memory symbol → records collector with stable symbol order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SymbolRecords {
    records: BTreeMap<String, Vec<String>>,
}

impl SymbolRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &str) -> Option<&[String]> {
        self.records.get(symbol).map(Vec::as_slice)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.records
            .iter()
            .map(|(symbol, records)| (symbol.as_str(), records.as_slice()))
    }

    pub fn symbol_count(&self) -> usize {
        self.records.len()
    }

    pub fn record_count(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSink for SymbolRecords {
    fn accept(&mut self, symbol: &str, record: String) {
        self.records
            .entry(symbol.to_string())
            .or_default()
            .push(record);
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("output directory does not exist: {}", path.display())]
    MissingDirectory { path: PathBuf },
    #[error("symbol {symbol:?} cannot be used as a file name")]
    InvalidSymbol { symbol: String },
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::{RecordSink, SymbolRecords};

    #[test]
    fn groups_records_by_symbol_in_order() {
        let mut records = SymbolRecords::new();
        records.accept("MSFT", "1,10,50.0".to_string());
        records.accept("AAPL", "2,20,150.0".to_string());
        records.accept("MSFT", "3,30,51.0".to_string());

        assert_eq!(records.symbols().collect::<Vec<_>>(), vec!["AAPL", "MSFT"]);
        assert_eq!(
            records.get("MSFT").unwrap(),
            &["1,10,50.0".to_string(), "3,30,51.0".to_string()]
        );
        assert_eq!(records.symbol_count(), 2);
        assert_eq!(records.record_count(), 3);
    }

    #[test]
    fn mutable_reference_is_a_sink() {
        fn feed<S: RecordSink>(mut sink: S) {
            sink.accept("IBM", "1,100,100.0".to_string());
        }
        let mut records = SymbolRecords::new();
        feed(&mut records);
        assert_eq!(records.get("IBM").map(|r| r.len()), Some(1));
    }
}
