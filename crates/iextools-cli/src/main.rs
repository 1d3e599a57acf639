use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use glob::glob;
use iextools_core::{
    AnalysisError, ApplicationMessage, BlockPayload, CaptureBuffer, CaptureReport, DecodeOptions,
    LinkError, MessageType, PcapNgError, SubMessage, SymbolRecords, TopsError, decode_capture,
    extract_records, write_csv_dir,
};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("IEXTOOLS_BUILD_COMMIT"),
    "\nbuilt: ",
    env!("IEXTOOLS_BUILD_DATE")
);

#[derive(Parser, Debug)]
#[command(name = "iextools")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Offline decoder for IEX TOPS market-data captures (pcap-ng).",
    long_about = None,
    after_help = "Examples:\n  iextools tops extract capture.pcapng -o out/\n  iextools tops dump capture.pcapng --json\n  iextools pcap blocks capture.pcapng"
)]
struct Cli {
    /// Log filter (e.g. warn, debug, iextools_core=trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on IEX TOPS feeds carried in a capture.
    Tops {
        #[command(subcommand)]
        command: TopsCommands,
    },
    /// Operations on the pcap-ng container itself.
    Pcap {
        #[command(subcommand)]
        command: PcapCommands,
    },
}

#[derive(Subcommand, Debug)]
enum TopsCommands {
    /// Extract per-symbol CSV files (one record per line, no header).
    #[command(
        after_help = "Examples:\n  iextools tops extract capture.pcapng -o out/\n  iextools tops extract capture.pcapng --messages trade-report,quote-update --summary summary.json"
    )]
    Extract(ExtractArgs),
    /// Print decoded messages in capture order.
    Dump(DumpArgs),
}

#[derive(Subcommand, Debug)]
enum PcapCommands {
    /// List the blocks of a capture file.
    Blocks(BlocksArgs),
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Path to a pcap-ng capture (any extension)
    input: PathBuf,

    /// Directory receiving one <symbol>.csv per symbol
    #[arg(short = 'o', long, default_value = ".")]
    out_dir: PathBuf,

    /// Message types to export, comma-separated
    #[arg(long, value_delimiter = ',', default_value = "trade-report")]
    messages: Vec<MessageType>,

    /// Write the JSON capture summary to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Write the JSON capture summary to stdout
    #[arg(long, conflicts_with = "summary")]
    stdout: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Suppress non-error output
    #[arg(long)]
    quiet: bool,
}

#[derive(Args, Debug)]
struct DumpArgs {
    /// Path to a pcap-ng capture (any extension)
    input: PathBuf,

    /// Print one JSON object per decoded message
    #[arg(long)]
    json: bool,

    /// Also list skipped sub-messages
    #[arg(long)]
    skipped: bool,
}

#[derive(Args, Debug)]
struct BlocksArgs {
    /// Path to a pcap-ng capture (any extension)
    input: PathBuf,

    /// Also print the link headers and IEX-TP envelope of packet blocks
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(&cli.log_level) {
        eprintln!("error: {}", err);
        return ExitCode::from(2);
    }

    let result = match cli.command {
        Commands::Tops { command } => match command {
            TopsCommands::Extract(args) => cmd_tops_extract(args),
            TopsCommands::Dump(args) => cmd_tops_dump(args),
        },
        Commands::Pcap { command } => match command {
            PcapCommands::Blocks(args) => cmd_pcap_blocks(args),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

/// Install the stderr tracing subscriber. `RUST_LOG` overrides `level`.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .or_else(|_| EnvFilter::try_new("warn"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .with(filter)
        .init();

    Ok(())
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{:#}", err), None)
    }
}

impl From<AnalysisError> for CliError {
    fn from(err: AnalysisError) -> Self {
        let hint = match &err {
            AnalysisError::Source(_) => None,
            AnalysisError::Capture(PcapNgError::Link {
                source: LinkError::UnsupportedTransport { .. },
                ..
            }) => Some("only UDP multicast feeds are supported".to_string()),
            AnalysisError::Capture(PcapNgError::Link {
                source: LinkError::UnsupportedOptions { .. },
                ..
            }) => Some("IPv4 headers with options are not supported".to_string()),
            AnalysisError::Capture(_) => {
                Some("the capture looks truncated or corrupt; inspect it with `iextools pcap blocks`".to_string())
            }
            AnalysisError::Message {
                source: TopsError::PayloadOverrun { .. },
                ..
            } => Some("the IEX-TP envelope declares fewer payload bytes than its messages use".to_string()),
            AnalysisError::Message { .. } => {
                Some("a TOPS message is shorter than its layout".to_string())
            }
        };
        CliError::new(format!("decoding failed: {}", err), hint)
    }
}

fn cmd_tops_extract(args: ExtractArgs) -> Result<(), CliError> {
    let (input, capture) = load_capture(&args.input)?;
    if let Some(summary) = args.summary.as_ref() {
        ensure_distinct_output(&input, summary)?;
    }

    let options = DecodeOptions::forwarding(args.messages.iter().copied());
    let mut records = SymbolRecords::new();
    let stats = extract_records(capture.bytes(), &options, &mut records)?;
    let report = stats.into_report(&input.display().to_string(), capture.len() as u64);

    fs::create_dir_all(&args.out_dir).with_context(|| {
        format!("Failed to create output directory: {}", args.out_dir.display())
    })?;
    let written = write_csv_dir(&records, &args.out_dir)
        .with_context(|| format!("Failed to write CSV files into {}", args.out_dir.display()))?;

    if args.stdout {
        println!("{}", serialize_json(&report, args.pretty)?);
    } else if let Some(summary) = args.summary.as_ref() {
        write_summary(summary, &report, args.pretty)?;
    }

    if !args.quiet {
        print_extract_summary(&report, written.len(), &args.out_dir);
    }
    Ok(())
}

fn cmd_tops_dump(args: DumpArgs) -> Result<(), CliError> {
    let (_, capture) = load_capture(&args.input)?;
    let mut output_error = None;
    let result = decode_capture(capture.bytes(), |frame_number, message| {
        if output_error.is_some() {
            return;
        }
        let line = match message {
            SubMessage::Decoded(decoded) => render_message(frame_number, decoded, args.json),
            SubMessage::Skipped {
                message_type,
                length,
            } if args.skipped => Ok(format!(
                "{:08} skipped {} ({} bytes)",
                frame_number, message_type, length
            )),
            SubMessage::Skipped { .. } => return,
        };
        match line {
            Ok(line) => println!("{}", line),
            Err(err) => output_error = Some(err),
        }
    });
    if let Some(err) = output_error {
        return Err(err);
    }
    result?;
    Ok(())
}

#[derive(Serialize)]
struct DumpRecord<'a> {
    frame_number: u32,
    #[serde(flatten)]
    message: &'a ApplicationMessage,
}

fn render_message(
    frame_number: u32,
    message: &ApplicationMessage,
    json: bool,
) -> Result<String, CliError> {
    if json {
        serde_json::to_string(&DumpRecord {
            frame_number,
            message,
        })
        .context("JSON serialization failed")
        .map_err(Into::into)
    } else {
        Ok(format!("{:08} {}", frame_number, message))
    }
}

fn cmd_pcap_blocks(args: BlocksArgs) -> Result<(), CliError> {
    let (_, capture) = load_capture(&args.input)?;
    for block in capture.blocks() {
        let block = block.map_err(AnalysisError::from)?;
        println!("{}", block);
        if !args.verbose {
            continue;
        }
        if let Some(BlockPayload::EnhancedPacket(packet)) = &block.payload {
            println!("  {}", packet);
            println!("  {}", packet.ethernet);
            println!("  {}", packet.ipv4);
            println!("  {}", packet.udp);
            println!("  {}", packet.envelope);
        }
    }
    Ok(())
}

fn load_capture(input: &Path) -> Result<(PathBuf, CaptureBuffer), CliError> {
    let resolved = resolve_input_path(input)?;
    validate_input_file(&resolved)?;
    let capture = CaptureBuffer::open(&resolved)
        .with_context(|| format!("Failed to read input file: {}", resolved.display()))?;
    tracing::debug!(path = %resolved.display(), bytes = capture.len(), "loaded capture");
    if !capture.is_pcapng() {
        return Err(CliError::new(
            format!("not a pcap-ng capture: {}", resolved.display()),
            Some("convert legacy .pcap files with `editcap -F pcapng`".to_string()),
        ));
    }
    Ok((resolved, capture))
}

fn ensure_distinct_output(input: &Path, output: &Path) -> Result<(), CliError> {
    let input_abs = fs::canonicalize(input)
        .with_context(|| format!("Failed to resolve input path: {}", input.display()))?;
    let same = fs::canonicalize(output)
        .map(|output_abs| output_abs == input_abs)
        .unwrap_or(false);
    if same {
        return Err(CliError::new(
            format!("summary path must differ from input: {}", output.display()),
            Some("choose a different output path".to_string()),
        ));
    }
    Ok(())
}

fn serialize_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.context("JSON serialization failed").map_err(Into::into)
}

fn write_summary(path: &Path, report: &CaptureReport, pretty: bool) -> Result<(), CliError> {
    let json = serialize_json(report, pretty)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    fs::write(path, json)
        .with_context(|| format!("Failed to write summary: {}", path.display()))?;
    Ok(())
}

fn print_extract_summary(report: &CaptureReport, files: usize, out_dir: &Path) {
    eprintln!(
        "OK: {} records for {} symbols -> {} ({} files)",
        report.messages.records_forwarded,
        report.symbols.len(),
        out_dir.display(),
        files
    );
    if !report.diagnostics.is_empty() {
        eprintln!("Diagnostics:");
        for diagnostic in &report.diagnostics {
            eprintln!("  frame {:08}: {}", diagnostic.frame_number, diagnostic.message);
        }
    }
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("pass a pcap-ng capture (.pcapng or .pcap)".to_string()),
        ));
    }
    if !input.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("pass a pcap-ng capture (.pcapng or .pcap)".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern".to_string()),
        ));
    }
    if matches.len() > 1 {
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let more = if matches.len() > 3 { ", ..." } else { "" };
        return Err(CliError::new(
            format!(
                "multiple files match pattern '{}' ({} matches); matches: {}{}",
                pattern,
                matches.len(),
                listed,
                more
            ),
            Some("pass a single capture file, or run once per file".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
