use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use super::layout;

/// Wire tag of a TOPS sub-message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    AuctionInformation,
    TradeBreak,
    SecurityDirectory,
    TradingStatus,
    OperationalHaltStatus,
    ShortSalePriceTestStatus,
    QuoteUpdate,
    SystemEvent,
    TradeReport,
    OfficialPrice,
    Unknown(u8),
}

impl MessageType {
    /// Every recognized tag, in wire-code order.
    pub const KNOWN: [MessageType; 10] = [
        MessageType::AuctionInformation,
        MessageType::TradeBreak,
        MessageType::SecurityDirectory,
        MessageType::TradingStatus,
        MessageType::OperationalHaltStatus,
        MessageType::ShortSalePriceTestStatus,
        MessageType::QuoteUpdate,
        MessageType::SystemEvent,
        MessageType::TradeReport,
        MessageType::OfficialPrice,
    ];

    pub fn from_tag(tag: u8) -> Self {
        match tag {
            layout::AUCTION_INFORMATION => MessageType::AuctionInformation,
            layout::TRADE_BREAK => MessageType::TradeBreak,
            layout::SECURITY_DIRECTORY => MessageType::SecurityDirectory,
            layout::TRADING_STATUS => MessageType::TradingStatus,
            layout::OPERATIONAL_HALT_STATUS => MessageType::OperationalHaltStatus,
            layout::SHORT_SALE_PRICE_TEST_STATUS => MessageType::ShortSalePriceTestStatus,
            layout::QUOTE_UPDATE => MessageType::QuoteUpdate,
            layout::SYSTEM_EVENT => MessageType::SystemEvent,
            layout::TRADE_REPORT => MessageType::TradeReport,
            layout::OFFICIAL_PRICE => MessageType::OfficialPrice,
            other => MessageType::Unknown(other),
        }
    }

    pub fn tag(&self) -> u8 {
        match self {
            MessageType::AuctionInformation => layout::AUCTION_INFORMATION,
            MessageType::TradeBreak => layout::TRADE_BREAK,
            MessageType::SecurityDirectory => layout::SECURITY_DIRECTORY,
            MessageType::TradingStatus => layout::TRADING_STATUS,
            MessageType::OperationalHaltStatus => layout::OPERATIONAL_HALT_STATUS,
            MessageType::ShortSalePriceTestStatus => layout::SHORT_SALE_PRICE_TEST_STATUS,
            MessageType::QuoteUpdate => layout::QUOTE_UPDATE,
            MessageType::SystemEvent => layout::SYSTEM_EVENT,
            MessageType::TradeReport => layout::TRADE_REPORT,
            MessageType::OfficialPrice => layout::OFFICIAL_PRICE,
            MessageType::Unknown(tag) => *tag,
        }
    }

    /// Stable kebab-case name, also accepted by `FromStr`.
    pub fn name(&self) -> &'static str {
        match self {
            MessageType::AuctionInformation => "auction-information",
            MessageType::TradeBreak => "trade-break",
            MessageType::SecurityDirectory => "security-directory",
            MessageType::TradingStatus => "trading-status",
            MessageType::OperationalHaltStatus => "operational-halt-status",
            MessageType::ShortSalePriceTestStatus => "short-sale-price-test-status",
            MessageType::QuoteUpdate => "quote-update",
            MessageType::SystemEvent => "system-event",
            MessageType::TradeReport => "trade-report",
            MessageType::OfficialPrice => "official-price",
            MessageType::Unknown(_) => "unknown",
        }
    }

    /// Whether sub-messages with this tag are decoded rather than skipped.
    pub fn is_decoded(&self) -> bool {
        matches!(
            self,
            MessageType::TradingStatus | MessageType::QuoteUpdate | MessageType::TradeReport
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Unknown(tag) => write!(f, "unknown(0x{:02x})", tag),
            known => f.write_str(known.name()),
        }
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        MessageType::KNOWN
            .iter()
            .copied()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| {
                let names = MessageType::KNOWN
                    .iter()
                    .map(|kind| kind.name())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("unknown message type '{s}' (expected one of: {names})")
            })
    }
}

/// Eight-byte, space-padded ASCII instrument symbol.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(pub [u8; layout::SYMBOL_LEN]);

impl Symbol {
    /// Symbol text with trailing padding spaces removed.
    pub fn trimmed(&self) -> String {
        let end = self
            .0
            .iter()
            .rposition(|b| *b != layout::SYMBOL_PAD)
            .map_or(0, |idx| idx + 1);
        String::from_utf8_lossy(&self.0[..end]).into_owned()
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.trimmed())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.trimmed())
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Convert a fixed-point wire price to a floating value.
pub fn price_to_f64(raw: i64) -> f64 {
    raw as f64 / layout::PRICE_SCALE
}

/// Trading status code of a trading-status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TradingStatus {
    Halted,
    HaltReleased,
    Paused,
    Trading,
    Other(u8),
}

impl TradingStatus {
    pub fn from_code(code: u8) -> Self {
        match code {
            layout::STATUS_HALTED => TradingStatus::Halted,
            layout::STATUS_HALT_RELEASED => TradingStatus::HaltReleased,
            layout::STATUS_PAUSED => TradingStatus::Paused,
            layout::STATUS_TRADING => TradingStatus::Trading,
            other => TradingStatus::Other(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            TradingStatus::Halted => layout::STATUS_HALTED,
            TradingStatus::HaltReleased => layout::STATUS_HALT_RELEASED,
            TradingStatus::Paused => layout::STATUS_PAUSED,
            TradingStatus::Trading => layout::STATUS_TRADING,
            TradingStatus::Other(code) => *code,
        }
    }

    /// The reason field is only populated for halts and halt releases.
    pub fn carries_reason(&self) -> bool {
        matches!(self, TradingStatus::Halted | TradingStatus::HaltReleased)
    }
}

impl fmt::Display for TradingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingStatus::Halted => {
                f.write_str("H (0x48): Trading halted across all US equity markets")
            }
            TradingStatus::HaltReleased => f.write_str(
                "O (0x4f): Trading halt released into an Order Acceptance Period on IEX (IEX-listed securities only)",
            ),
            TradingStatus::Paused => f.write_str(
                "P (0x50): Trading paused and Order Acceptance Period on IEX (IEX-listed securities only)",
            ),
            TradingStatus::Trading => f.write_str("T (0x54): Trading on IEX"),
            TradingStatus::Other(code) => write!(f, "0x{:02x}", code),
        }
    }
}

fn serialize_ascii<S: Serializer>(bytes: &[u8; layout::REASON_LEN], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(String::from_utf8_lossy(bytes).trim_end())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradingStatusMessage {
    pub status: TradingStatus,
    pub timestamp: i64,
    pub symbol: Symbol,
    #[serde(serialize_with = "serialize_ascii")]
    pub reason: [u8; layout::REASON_LEN],
}

impl TradingStatusMessage {
    pub fn reason(&self) -> Option<String> {
        if !self.status.carries_reason() {
            return None;
        }
        Some(String::from_utf8_lossy(&self.reason).trim_end().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteUpdateMessage {
    pub flags: u8,
    pub timestamp: i64,
    pub symbol: Symbol,
    pub bid_size: u32,
    pub bid_price: i64,
    pub ask_price: i64,
    pub ask_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeReportMessage {
    pub flags: u8,
    pub timestamp: i64,
    pub symbol: Symbol,
    pub size: u32,
    pub price: f64,
    pub trade_id: i64,
}

/// One decoded TOPS sub-message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ApplicationMessage {
    TradingStatus(TradingStatusMessage),
    QuoteUpdate(QuoteUpdateMessage),
    TradeReport(TradeReportMessage),
}

impl ApplicationMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            ApplicationMessage::TradingStatus(_) => MessageType::TradingStatus,
            ApplicationMessage::QuoteUpdate(_) => MessageType::QuoteUpdate,
            ApplicationMessage::TradeReport(_) => MessageType::TradeReport,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        match self {
            ApplicationMessage::TradingStatus(m) => &m.symbol,
            ApplicationMessage::QuoteUpdate(m) => &m.symbol,
            ApplicationMessage::TradeReport(m) => &m.symbol,
        }
    }

    /// Event time in nanoseconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        match self {
            ApplicationMessage::TradingStatus(m) => m.timestamp,
            ApplicationMessage::QuoteUpdate(m) => m.timestamp,
            ApplicationMessage::TradeReport(m) => m.timestamp,
        }
    }
}

/// Comma-joined record forwarded to the sink for `message`.
///
/// Prices are rendered with at least one decimal digit (`100.0`).
pub fn format_record(message: &ApplicationMessage) -> String {
    match message {
        ApplicationMessage::TradeReport(m) => {
            format!("{},{},{:?}", m.timestamp, m.size, m.price)
        }
        ApplicationMessage::QuoteUpdate(m) => format!(
            "{},{},{:?},{},{:?}",
            m.timestamp,
            m.bid_size,
            price_to_f64(m.bid_price),
            m.ask_size,
            price_to_f64(m.ask_price)
        ),
        ApplicationMessage::TradingStatus(m) => format!(
            "{},{},{}",
            m.timestamp,
            m.status.code() as char,
            m.reason().unwrap_or_default()
        ),
    }
}

impl fmt::Display for ApplicationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationMessage::TradingStatus(m) => {
                write!(
                    f,
                    "TradingStatusMessage | timestamp={} symbol={} status={}",
                    m.timestamp, m.symbol, m.status
                )?;
                if let Some(reason) = m.reason() {
                    write!(f, " reason={}", reason)?;
                }
                Ok(())
            }
            ApplicationMessage::QuoteUpdate(m) => write!(
                f,
                "QuoteUpdateMessage | timestamp={} symbol={} bid/ask=${} ({}) /${} ({})",
                m.timestamp,
                m.symbol,
                price_to_f64(m.bid_price),
                m.bid_size,
                price_to_f64(m.ask_price),
                m.ask_size
            ),
            ApplicationMessage::TradeReport(m) => write!(
                f,
                "TradeReportMessage | timestamp={} symbol={} price=${} size={}",
                m.timestamp, m.symbol, m.price, m.size
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(price: f64) -> ApplicationMessage {
        ApplicationMessage::TradeReport(TradeReportMessage {
            flags: 0,
            timestamp: 1_509_634_800_000_000_000,
            symbol: Symbol(*b"IBM     "),
            size: 100,
            price,
            trade_id: 1,
        })
    }

    #[test]
    fn symbol_trims_trailing_spaces_only() {
        assert_eq!(Symbol(*b"AAPL    ").trimmed(), "AAPL");
        assert_eq!(Symbol(*b"BRK A   ").trimmed(), "BRK A");
        assert_eq!(Symbol(*b"ZEXIT123").trimmed(), "ZEXIT123");
        assert_eq!(Symbol(*b"        ").trimmed(), "");
        let once = Symbol(*b"AAPL    ").trimmed();
        assert_eq!(once.trim_end_matches(' '), once);
    }

    #[test]
    fn price_divides_by_scale() {
        assert_eq!(price_to_f64(1_250_000), 125.0);
        assert_eq!(price_to_f64(1_000_000), 100.0);
        assert_eq!(price_to_f64(995_000), 99.5);
    }

    #[test]
    fn message_type_round_trips_tags() {
        for kind in MessageType::KNOWN {
            assert_eq!(MessageType::from_tag(kind.tag()), kind);
        }
        assert_eq!(MessageType::from_tag(0x99), MessageType::Unknown(0x99));
        assert!(MessageType::TradeReport.is_decoded());
        assert!(!MessageType::OfficialPrice.is_decoded());
    }

    #[test]
    fn message_type_parses_names() {
        assert_eq!(
            "trade-report".parse::<MessageType>().unwrap(),
            MessageType::TradeReport
        );
        assert_eq!(
            " Quote-Update ".parse::<MessageType>().unwrap(),
            MessageType::QuoteUpdate
        );
        let err = "trades".parse::<MessageType>().unwrap_err();
        assert!(err.contains("expected one of"));
    }

    #[test]
    fn trade_record_keeps_a_decimal() {
        assert_eq!(format_record(&trade(100.0)), "1509634800000000000,100,100.0");
        assert_eq!(format_record(&trade(125.25)), "1509634800000000000,100,125.25");
    }

    #[test]
    fn quote_record_orders_bid_then_ask() {
        let quote = ApplicationMessage::QuoteUpdate(QuoteUpdateMessage {
            flags: 0,
            timestamp: 5,
            symbol: Symbol(*b"ZIEXT   "),
            bid_size: 100,
            bid_price: 990_000,
            ask_price: 1_010_000,
            ask_size: 200,
        });
        assert_eq!(format_record(&quote), "5,100,99.0,200,101.0");
        assert_eq!(quote.message_type(), MessageType::QuoteUpdate);
    }

    #[test]
    fn trading_status_reason_only_for_halts() {
        let halted = TradingStatusMessage {
            status: TradingStatus::from_code(b'H'),
            timestamp: 1,
            symbol: Symbol(*b"ZIEXT   "),
            reason: *b"T1  ",
        };
        assert_eq!(halted.reason().as_deref(), Some("T1"));
        let trading = TradingStatusMessage {
            status: TradingStatus::Trading,
            ..halted.clone()
        };
        assert_eq!(trading.reason(), None);
        assert_eq!(
            format_record(&ApplicationMessage::TradingStatus(trading)),
            "1,T,"
        );
        let rendered = ApplicationMessage::TradingStatus(halted).to_string();
        assert!(rendered.ends_with("reason=T1"));
    }

    #[test]
    fn trade_display_matches_listing() {
        assert_eq!(
            trade(100.5).to_string(),
            "TradeReportMessage | timestamp=1509634800000000000 symbol=IBM price=$100.5 size=100"
        );
    }

    #[test]
    fn messages_serialize_with_type_tag() {
        let value = serde_json::to_value(trade(100.0)).unwrap();
        assert_eq!(value["type"], "trade-report");
        assert_eq!(value["symbol"], "IBM");
        assert_eq!(value["size"], 100);
    }
}
