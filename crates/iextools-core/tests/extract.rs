use std::fs;

use iextools_core::fixture::{
    CaptureBuilder, FrameSpec, envelope_bytes, envelope_payload, pcapng_block, raw_message,
    trade_report_message,
};
use iextools_core::{
    AnalysisError, DecodeOptions, DiagnosticKind, Endianness, LinkError, MessageType, PcapNgError,
    SymbolRecords, decode_capture, extract_capture_file, extract_records, write_csv_dir,
};

const NAME_RESOLUTION_BLOCK: u32 = 0x0000_0004;

fn ibm_capture(ts_raw: u64) -> Vec<u8> {
    let payload = envelope_payload(&[trade_report_message(
        1_481_639_400_000_000_000,
        *b"IBM     ",
        100,
        1_000_000,
        7,
    )]);
    CaptureBuilder::new()
        .packet(ts_raw, &FrameSpec::default(), &payload)
        .build()
}

#[test]
fn single_trade_report_becomes_one_record() {
    let capture = ibm_capture(1_481_639_400_000_000);
    let mut records = SymbolRecords::new();
    let stats = extract_records(&capture, &DecodeOptions::default(), &mut records).unwrap();

    assert_eq!(records.symbol_count(), 1);
    assert_eq!(
        records.get("IBM").unwrap(),
        &["1481639400000000000,100,100.0".to_string()]
    );
    assert_eq!(stats.packets_total, 1);
    assert!(stats.diagnostics.is_empty());
}

#[test]
fn framing_mismatch_stops_before_later_blocks() {
    let payload = envelope_payload(&[trade_report_message(1, *b"IBM     ", 1, 10_000, 1)]);
    let mut capture = CaptureBuilder::new().build();
    let bad_start = capture.len();
    capture.extend_from_slice(&pcapng_block(
        Endianness::Little,
        NAME_RESOLUTION_BLOCK,
        &[0u8; 4],
    ));
    capture[bad_start + 12..bad_start + 16].copy_from_slice(&20u32.to_le_bytes());
    // A valid packet after the corrupt block must never be decoded.
    let trailing = CaptureBuilder::new()
        .packet(0, &FrameSpec::default(), &payload)
        .build();
    capture.extend_from_slice(&trailing[48..]);

    let mut seen = 0;
    let err = decode_capture(&capture, |_, _| seen += 1).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Capture(PcapNgError::FramingMismatch {
            frame_number: 2,
            leading: 16,
            trailing: 20,
            ..
        })
    ));
    assert_eq!(seen, 0);
}

#[test]
fn non_udp_packet_fails_the_pass() {
    let spec = FrameSpec {
        protocol: 6,
        ..FrameSpec::default()
    };
    let capture = CaptureBuilder::new()
        .packet(0, &spec, &envelope_payload(&[]))
        .build();
    let err = decode_capture(&capture, |_, _| {}).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Capture(PcapNgError::Link {
            source: LinkError::UnsupportedTransport { protocol: 6 },
            ..
        })
    ));
    assert_eq!(err.frame_number(), Some(2));
}

#[test]
fn ipv4_options_fail_the_pass() {
    let spec = FrameSpec {
        ihl: 7,
        ..FrameSpec::default()
    };
    let capture = CaptureBuilder::new()
        .packet(0, &spec, &envelope_payload(&[]))
        .build();
    let err = decode_capture(&capture, |_, _| {}).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Capture(PcapNgError::Link {
            source: LinkError::UnsupportedOptions { ihl: 7 },
            ..
        })
    ));
}

#[test]
fn exact_payload_length_has_no_diagnostic() {
    let messages: Vec<Vec<u8>> = (0..5)
        .map(|i| trade_report_message(i, *b"MSFT    ", 10 + i as u32, 600_000 + i, i))
        .collect();
    let capture = CaptureBuilder::new()
        .packet(0, &FrameSpec::default(), &envelope_payload(&messages))
        .build();

    let mut records = SymbolRecords::new();
    let stats = extract_records(&capture, &DecodeOptions::default(), &mut records).unwrap();
    assert_eq!(stats.decoded.get(&MessageType::TradeReport), Some(&5));
    assert!(stats.diagnostics.is_empty());
    assert_eq!(records.get("MSFT").map(<[String]>::len), Some(5));
    assert_eq!(records.get("MSFT").unwrap()[4], "4,14,60.0004");
}

#[test]
fn length_mismatch_is_reported_and_decoding_continues() {
    let short = envelope_bytes(1, 50, &[trade_report_message(1, *b"IBM     ", 1, 10_000, 1)]);
    let good = envelope_payload(&[trade_report_message(2, *b"IBM     ", 2, 20_000, 2)]);
    let capture = CaptureBuilder::new()
        .packet(0, &FrameSpec::default(), &short)
        .packet(1, &FrameSpec::default(), &good)
        .build();

    let mut records = SymbolRecords::new();
    let stats = extract_records(&capture, &DecodeOptions::default(), &mut records).unwrap();
    assert_eq!(records.get("IBM").map(<[String]>::len), Some(2));
    assert_eq!(stats.diagnostics.len(), 1);
    assert_eq!(stats.diagnostics[0].kind, DiagnosticKind::EnvelopeLengthMismatch);
    assert_eq!(stats.diagnostics[0].frame_number, 2);
}

#[test]
fn unknown_tags_are_counted_skips() {
    let payload = envelope_payload(&[
        raw_message(0x01, &[0u8; 7]),
        raw_message(0x58, &[0u8; 25]),
    ]);
    let capture = CaptureBuilder::new()
        .packet(0, &FrameSpec::default(), &payload)
        .build();
    let stats = decode_capture(&capture, |_, _| {}).unwrap();
    assert_eq!(stats.skipped.get(&MessageType::Unknown(0x01)), Some(&1));
    assert_eq!(stats.skipped.get(&MessageType::OfficialPrice), Some(&1));
    assert_eq!(stats.decoded_total(), 0);
}

#[test]
fn capture_file_report_and_csv_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("capture.pcapng");
    fs::write(&input, ibm_capture(1_000_000)).unwrap();
    let out = dir.path().join("out");
    fs::create_dir(&out).unwrap();

    let mut records = SymbolRecords::new();
    let report = extract_capture_file(&input, &DecodeOptions::default(), &mut records).unwrap();
    let written = write_csv_dir(&records, &out).unwrap();

    assert_eq!(written, vec![out.join("IBM.csv")]);
    assert_eq!(
        fs::read_to_string(out.join("IBM.csv")).unwrap(),
        "1481639400000000000,100,100.0\n"
    );
    assert_eq!(report.blocks.total, 3);
    assert_eq!(report.packets_total, 1);
    assert_eq!(report.time_start.as_deref(), Some("1970-01-01T00:00:01Z"));
    assert_eq!(report.messages.decoded.get("trade-report"), Some(&1));
    assert_eq!(report.messages.records_forwarded, 1);
    assert_eq!(report.symbols, vec!["IBM".to_string()]);
    assert_eq!(report.input.bytes, fs::metadata(&input).unwrap().len());
}

#[test]
fn missing_capture_file_is_source_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut records = SymbolRecords::new();
    let err = extract_capture_file(
        &dir.path().join("missing.pcapng"),
        &DecodeOptions::default(),
        &mut records,
    )
    .unwrap_err();
    assert!(matches!(err, AnalysisError::Source(_)));
    assert_eq!(err.frame_number(), None);
}
