use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::protocols::tops::{
    MessageType, SubMessage, TopsError, format_record, walk_messages,
};
use crate::sink::RecordSink;
use crate::source::{BlockIter, CaptureBuffer, PcapNgError, SourceError};
use crate::{
    BlockSummary, CaptureReport, Diagnostic, DiagnosticKind, MessageSummary, make_stub_report,
};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
    #[error("Capture error: {0}")]
    Capture(#[from] PcapNgError),
    #[error("frame {frame_number}: {source}")]
    Message {
        frame_number: u32,
        #[source]
        source: TopsError,
    },
}

impl AnalysisError {
    /// Frame the failure was detected in, when it came from the capture.
    pub fn frame_number(&self) -> Option<u32> {
        match self {
            AnalysisError::Source(_) => None,
            AnalysisError::Capture(err) => Some(err.frame_number()),
            AnalysisError::Message { frame_number, .. } => Some(*frame_number),
        }
    }
}

/// Decoder settings.
///
/// # Examples
/// ```
/// use iextools_core::{DecodeOptions, MessageType};
///
/// let options = DecodeOptions::default();
/// assert!(options.forwards(MessageType::TradeReport));
/// assert!(!options.forwards(MessageType::QuoteUpdate));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Message types whose records are handed to the sink.
    pub forward: BTreeSet<MessageType>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            forward: BTreeSet::from([MessageType::TradeReport]),
        }
    }
}

impl DecodeOptions {
    pub fn forwarding(types: impl IntoIterator<Item = MessageType>) -> Self {
        Self {
            forward: types.into_iter().collect(),
        }
    }

    pub fn forwards(&self, message_type: MessageType) -> bool {
        self.forward.contains(&message_type)
    }
}

/// Counters gathered during one pass over a capture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureStats {
    pub blocks_total: u64,
    pub blocks_by_type: BTreeMap<String, u64>,
    pub packets_total: u64,
    pub first_ts: Option<f64>,
    pub last_ts: Option<f64>,
    pub decoded: BTreeMap<MessageType, u64>,
    pub skipped: BTreeMap<MessageType, u64>,
    pub records_forwarded: u64,
    pub symbols: BTreeSet<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CaptureStats {
    pub fn decoded_total(&self) -> u64 {
        self.decoded.values().sum()
    }

    pub fn skipped_total(&self) -> u64 {
        self.skipped.values().sum()
    }

    /// Fold the counters into a report for `input_path`.
    pub fn into_report(self, input_path: &str, input_bytes: u64) -> CaptureReport {
        let mut report = make_stub_report(input_path, input_bytes);
        report.blocks = BlockSummary {
            total: self.blocks_total,
            by_type: self.blocks_by_type,
        };
        report.packets_total = self.packets_total;
        report.time_start = ts_to_rfc3339(self.first_ts);
        report.time_end = ts_to_rfc3339(self.last_ts);
        report.messages = MessageSummary {
            decoded: by_name(self.decoded),
            skipped: by_name(self.skipped),
            records_forwarded: self.records_forwarded,
        };
        report.symbols = self.symbols.into_iter().collect();
        report.diagnostics = self.diagnostics;
        report
    }
}

fn by_name(counts: BTreeMap<MessageType, u64>) -> BTreeMap<String, u64> {
    counts
        .into_iter()
        .map(|(message_type, count)| (message_type.to_string(), count))
        .collect()
}

/// Walk every block of `buf` and every sub-message of every Enhanced Packet
/// Block, handing each sub-message to `visit` with its frame number.
///
/// The first fatal error ends the pass; sub-messages already visited stay
/// visited. Envelope length mismatches are logged and recorded as
/// diagnostics without stopping the pass.
pub fn decode_capture<F>(buf: &[u8], mut visit: F) -> Result<CaptureStats, AnalysisError>
where
    F: FnMut(u32, &SubMessage),
{
    let mut stats = CaptureStats::default();

    for block in BlockIter::new(buf) {
        let block = block?;
        stats.blocks_total += 1;
        *stats
            .blocks_by_type
            .entry(block.block_type.name().to_string())
            .or_default() += 1;

        let Some(packet) = block.enhanced_packet() else {
            continue;
        };
        stats.packets_total += 1;
        update_ts_bounds(&mut stats.first_ts, &mut stats.last_ts, Some(packet.timestamp()));

        let frame_number = block.frame_number;
        let outcome = walk_messages(&packet.envelope, |message| {
            match &message {
                SubMessage::Decoded(decoded) => {
                    *stats.decoded.entry(decoded.message_type()).or_default() += 1;
                }
                SubMessage::Skipped { message_type, .. } => {
                    *stats.skipped.entry(*message_type).or_default() += 1;
                }
            }
            visit(frame_number, &message);
        })
        .map_err(|source| AnalysisError::Message {
            frame_number,
            source,
        })?;

        if let Some(mismatch) = outcome.length_mismatch {
            tracing::warn!(
                frame = frame_number,
                declared = mismatch.declared,
                consumed = mismatch.consumed,
                "envelope payload length does not match its messages"
            );
            stats.diagnostics.push(Diagnostic {
                frame_number,
                kind: DiagnosticKind::EnvelopeLengthMismatch,
                message: format!(
                    "payload length {} but messages account for {} bytes",
                    mismatch.declared, mismatch.consumed
                ),
            });
        }
    }

    tracing::info!(
        blocks = stats.blocks_total,
        packets = stats.packets_total,
        decoded = stats.decoded_total(),
        skipped = stats.skipped_total(),
        diagnostics = stats.diagnostics.len(),
        "capture pass finished"
    );
    Ok(stats)
}

/// Decode `buf` and hand one formatted record per forwarded message to `sink`,
/// keyed by trimmed symbol.
///
/// # Examples
/// ```
/// use iextools_core::fixture::{CaptureBuilder, FrameSpec, envelope_payload, trade_report_message};
/// use iextools_core::{DecodeOptions, SymbolRecords, extract_records};
///
/// let payload = envelope_payload(&[trade_report_message(42, *b"IBM     ", 100, 1_000_000, 1)]);
/// let capture = CaptureBuilder::new()
///     .packet(0, &FrameSpec::default(), &payload)
///     .build();
///
/// let mut records = SymbolRecords::new();
/// let stats = extract_records(&capture, &DecodeOptions::default(), &mut records)?;
/// assert_eq!(stats.records_forwarded, 1);
/// assert_eq!(records.get("IBM").unwrap(), &["42,100,100.0".to_string()]);
/// # Ok::<(), iextools_core::AnalysisError>(())
/// ```
pub fn extract_records<S: RecordSink + ?Sized>(
    buf: &[u8],
    options: &DecodeOptions,
    sink: &mut S,
) -> Result<CaptureStats, AnalysisError> {
    let mut forwarded = 0u64;
    let mut symbols = BTreeSet::new();
    let mut stats = decode_capture(buf, |_, message| {
        let SubMessage::Decoded(decoded) = message else {
            return;
        };
        if !options.forwards(decoded.message_type()) {
            return;
        }
        let symbol = decoded.symbol().trimmed();
        sink.accept(&symbol, format_record(decoded));
        forwarded += 1;
        symbols.insert(symbol);
    })?;
    stats.records_forwarded = forwarded;
    stats.symbols = symbols;
    Ok(stats)
}

/// Load the capture at `path`, extract its records into `sink` and build the
/// report.
///
/// # Examples
/// ```no_run
/// use std::path::Path;
///
/// use iextools_core::{DecodeOptions, SymbolRecords, extract_capture_file};
///
/// let mut records = SymbolRecords::new();
/// let report = extract_capture_file(
///     Path::new("capture.pcapng"),
///     &DecodeOptions::default(),
///     &mut records,
/// )?;
/// println!("{} records", report.messages.records_forwarded);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn extract_capture_file<S: RecordSink + ?Sized>(
    path: &Path,
    options: &DecodeOptions,
    sink: &mut S,
) -> Result<CaptureReport, AnalysisError> {
    let capture = CaptureBuffer::open(path)?;
    let stats = extract_records(capture.bytes(), options, sink)?;
    Ok(stats.into_report(&path.display().to_string(), capture.len() as u64))
}

fn update_ts_bounds(first: &mut Option<f64>, last: &mut Option<f64>, ts: Option<f64>) {
    let Some(ts) = ts else {
        return;
    };
    match first {
        Some(existing) if ts >= *existing => {}
        _ => *first = Some(ts),
    }
    match last {
        Some(existing) if ts <= *existing => {}
        _ => *last = Some(ts),
    }
}

fn ts_to_rfc3339(ts: Option<f64>) -> Option<String> {
    let ts = ts?;
    let nanos = (ts * 1_000_000_000.0) as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
}

#[cfg(test)]
mod tests {
    use super::{
        AnalysisError, DecodeOptions, decode_capture, extract_records, ts_to_rfc3339,
        update_ts_bounds,
    };
    use crate::fixture::{
        CaptureBuilder, FrameSpec, envelope_bytes, envelope_payload, quote_update_message,
        raw_message, trade_report_message, trading_status_message,
    };
    use crate::protocols::tops::{MessageType, TopsError};
    use crate::sink::SymbolRecords;
    use crate::DiagnosticKind;

    #[test]
    fn update_ts_bounds_tracks_min_and_max() {
        let mut first = None;
        let mut last = None;
        update_ts_bounds(&mut first, &mut last, Some(2.0));
        update_ts_bounds(&mut first, &mut last, Some(1.0));
        update_ts_bounds(&mut first, &mut last, Some(3.0));
        update_ts_bounds(&mut first, &mut last, None);
        assert_eq!(first, Some(1.0));
        assert_eq!(last, Some(3.0));
    }

    #[test]
    fn ts_to_rfc3339_formats_epoch() {
        assert_eq!(ts_to_rfc3339(Some(0.0)).as_deref(), Some("1970-01-01T00:00:00Z"));
        assert_eq!(ts_to_rfc3339(None), None);
    }

    #[test]
    fn forwards_only_selected_types() {
        let payload = envelope_payload(&[
            trade_report_message(1, *b"IBM     ", 100, 1_000_000, 1),
            quote_update_message(2, *b"IBM     ", 10, 999_900, 1_000_100, 20),
            trading_status_message(3, *b"IBM     ", b'T', *b"    "),
        ]);
        let capture = CaptureBuilder::new()
            .packet(0, &FrameSpec::default(), &payload)
            .build();

        let mut records = SymbolRecords::new();
        let stats = extract_records(&capture, &DecodeOptions::default(), &mut records).unwrap();
        assert_eq!(stats.decoded_total(), 3);
        assert_eq!(stats.records_forwarded, 1);
        assert_eq!(records.get("IBM").unwrap(), &["1,100,100.0".to_string()]);

        let options = DecodeOptions::forwarding([MessageType::QuoteUpdate, MessageType::TradingStatus]);
        let mut records = SymbolRecords::new();
        extract_records(&capture, &options, &mut records).unwrap();
        assert_eq!(
            records.get("IBM").unwrap(),
            &["2,10,99.99,20,100.01".to_string(), "3,T,".to_string()]
        );
    }

    #[test]
    fn counts_blocks_packets_and_skips() {
        let payload = envelope_payload(&[
            raw_message(0x53, &[b'O', 0, 0, 0, 0, 0, 0, 0, 0]),
            trade_report_message(1, *b"AAPL    ", 5, 1_250_000, 1),
        ]);
        let capture = CaptureBuilder::new()
            .packet(1_000_000, &FrameSpec::default(), &payload)
            .packet(2_000_000, &FrameSpec::default(), &payload)
            .build();

        let stats = decode_capture(&capture, |_, _| {}).unwrap();
        assert_eq!(stats.blocks_total, 4);
        assert_eq!(stats.blocks_by_type.get("Enhanced Packet Block"), Some(&2));
        assert_eq!(stats.packets_total, 2);
        assert_eq!(stats.first_ts, Some(1.0));
        assert_eq!(stats.last_ts, Some(2.0));
        assert_eq!(stats.decoded.get(&MessageType::TradeReport), Some(&2));
        assert_eq!(stats.skipped.get(&MessageType::SystemEvent), Some(&2));
        assert!(stats.diagnostics.is_empty());
    }

    #[test]
    fn length_mismatch_is_a_diagnostic() {
        let payload = envelope_bytes(1, 48, &[trade_report_message(1, *b"IBM     ", 1, 10_000, 1)]);
        let capture = CaptureBuilder::new()
            .packet(0, &FrameSpec::default(), &payload)
            .build();

        let mut records = SymbolRecords::new();
        let stats = extract_records(&capture, &DecodeOptions::default(), &mut records).unwrap();
        assert_eq!(stats.records_forwarded, 1);
        assert_eq!(stats.diagnostics.len(), 1);
        assert_eq!(stats.diagnostics[0].frame_number, 2);
        assert_eq!(stats.diagnostics[0].kind, DiagnosticKind::EnvelopeLengthMismatch);
    }

    #[test]
    fn overrun_carries_frame_number() {
        let payload = envelope_bytes(
            2,
            40,
            &[
                trade_report_message(1, *b"IBM     ", 1, 10_000, 1),
                trade_report_message(2, *b"IBM     ", 1, 10_000, 2),
            ],
        );
        let capture = CaptureBuilder::new()
            .packet(0, &FrameSpec::default(), &payload)
            .build();

        let mut records = SymbolRecords::new();
        let err = extract_records(&capture, &DecodeOptions::default(), &mut records).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Message {
                frame_number: 2,
                source: TopsError::PayloadOverrun { index: 1, .. }
            }
        ));
        assert_eq!(err.frame_number(), Some(2));
        // The first message was forwarded before the overrun was detected.
        assert_eq!(records.record_count(), 1);
    }

    #[test]
    fn options_deserialize_kebab_case_types() {
        let options: DecodeOptions =
            serde_json::from_str(r#"{"forward":["quote-update","trade-report"]}"#).unwrap();
        assert!(options.forwards(MessageType::QuoteUpdate));
        assert!(options.forwards(MessageType::TradeReport));

        let defaulted: DecodeOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(defaulted, DecodeOptions::default());
    }
}
