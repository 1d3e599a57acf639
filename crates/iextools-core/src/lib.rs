//! iextools core library for offline IEX market-data captures.
//!
//! This crate decodes pcap-ng captures of the IEX TOPS multicast feed. The
//! capture is loaded once into memory and walked in a single forward pass:
//! the `source` container parser yields blocks, Enhanced Packet Blocks are
//! decoded through the link stack (Ethernet II, IPv4, UDP), the IEX-TP
//! envelope and the TOPS sub-message dispatch loop, and decoded messages are
//! handed to an explicit `RecordSink`. Parsing is byte-oriented and side-effect
//! free; the only file output lives in `sink`.
//!
//! Invariants:
//! - Every read is bounds-checked through `ByteCursor`; nothing reads past the
//!   enclosing block.
//! - A framing, link or envelope-overrun error ends the pass with a typed error.
//! - An envelope whose messages do not add up to its payload length is a
//!   diagnostic, not an error.
//! - Report outputs are deterministic and stable across runs.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use iextools_core::{DecodeOptions, SymbolRecords, extract_capture_file, write_csv_dir};
//!
//! let mut records = SymbolRecords::new();
//! let report = extract_capture_file(
//!     Path::new("capture.pcapng"),
//!     &DecodeOptions::default(),
//!     &mut records,
//! )?;
//! write_csv_dir(&records, Path::new("out"))?;
//! println!("report version: {}", report.report_version);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

mod analysis;
#[doc(hidden)]
pub mod fixture;
pub mod protocols;
mod sink;
mod source;

pub use analysis::{
    AnalysisError, CaptureStats, DecodeOptions, decode_capture, extract_capture_file,
    extract_records,
};
pub use protocols::common::{ByteCursor, CursorError, Endianness, FixedWidth};
pub use protocols::iextp::Envelope;
pub use protocols::link::{EthernetHeader, Ipv4Header, LinkError, UdpHeader};
pub use protocols::tops::{
    ApplicationMessage, MessageType, SubMessage, Symbol, TopsError, format_record,
};
pub use sink::{RecordSink, SinkError, SymbolRecords, write_csv_dir};
pub use source::{
    Block, BlockIter, BlockPayload, BlockType, CaptureBuffer, EnhancedPacket, PcapNgError,
    SourceError, parse_blocks,
};

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;

/// Summary of one extraction pass, with deterministic ordering.
///
/// # Examples
/// ```
/// use iextools_core::make_stub_report;
///
/// let report = make_stub_report("capture.pcapng", 123);
/// assert_eq!(report.report_version, iextools_core::REPORT_VERSION);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureReport {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    /// Tool identification metadata.
    pub tool: ToolInfo,
    /// Input capture metadata.
    pub input: InputInfo,
    pub blocks: BlockSummary,
    /// Number of Enhanced Packet Blocks.
    pub packets_total: u64,
    /// RFC3339 timestamp of the first packet (if any).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    /// RFC3339 timestamp of the last packet (if any).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<String>,
    pub messages: MessageSummary,
    /// Symbols that received at least one record, sorted.
    pub symbols: Vec<String>,
    /// Non-fatal findings in capture order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Tool metadata embedded in reports.
///
/// # Examples
/// ```
/// use iextools_core::ToolInfo;
///
/// let tool = ToolInfo {
///     name: "iextools".to_string(),
///     version: "0.1.0".to_string(),
/// };
/// assert_eq!(tool.name, "iextools");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

/// Input capture metadata embedded in reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path as provided to the extractor.
    pub path: String,
    /// Input size in bytes.
    pub bytes: u64,
}

/// Block counts keyed by block type name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub total: u64,
    pub by_type: BTreeMap<String, u64>,
}

/// Sub-message counts keyed by message type name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    pub decoded: BTreeMap<String, u64>,
    /// Recognized-but-undecoded and unknown tags.
    pub skipped: BTreeMap<String, u64>,
    pub records_forwarded: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// Sub-message lengths did not add up to the envelope payload length.
    EnvelopeLengthMismatch,
}

/// Non-fatal finding attached to a frame.
///
/// # Examples
/// ```
/// use iextools_core::{Diagnostic, DiagnosticKind};
///
/// let diagnostic = Diagnostic {
///     frame_number: 3,
///     kind: DiagnosticKind::EnvelopeLengthMismatch,
///     message: "payload length 48 but messages account for 40 bytes".to_string(),
/// };
/// let json = serde_json::to_string(&diagnostic).unwrap();
/// assert!(json.contains("envelope-length-mismatch"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub frame_number: u32,
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Build a stub report with base fields filled and empty aggregates.
///
/// # Examples
/// ```
/// use iextools_core::make_stub_report;
///
/// let report = make_stub_report("capture.pcapng", 123);
/// assert_eq!(report.input.bytes, 123);
/// assert!(report.symbols.is_empty());
/// ```
pub fn make_stub_report(input_path: &str, input_bytes: u64) -> CaptureReport {
    CaptureReport {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "iextools".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        input: InputInfo {
            path: input_path.to_string(),
            bytes: input_bytes,
        },
        blocks: BlockSummary::default(),
        packets_total: 0,
        time_start: None,
        time_end: None,
        messages: MessageSummary::default(),
        symbols: Vec::new(),
        diagnostics: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_omits_time_bounds_when_none() {
        let report = make_stub_report("capture.pcapng", 1);
        let value = serde_json::to_value(&report).expect("report json");
        assert!(value.get("time_start").is_none());
        assert!(value.get("time_end").is_none());
        assert_eq!(value["tool"]["name"], "iextools");
        assert_eq!(value["messages"]["records_forwarded"], 0);
    }

    #[test]
    fn report_round_trips_through_json() {
        let mut report = make_stub_report("capture.pcapng", 10);
        report.time_start = Some("1970-01-01T00:00:01Z".to_string());
        report.symbols = vec!["IBM".to_string()];
        report.diagnostics.push(Diagnostic {
            frame_number: 2,
            kind: DiagnosticKind::EnvelopeLengthMismatch,
            message: "mismatch".to_string(),
        });
        let json = serde_json::to_string(&report).unwrap();
        let back: CaptureReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
