pub const AUCTION_INFORMATION: u8 = 0x41;
pub const TRADE_BREAK: u8 = 0x42;
pub const SECURITY_DIRECTORY: u8 = 0x44;
pub const TRADING_STATUS: u8 = 0x48;
pub const OPERATIONAL_HALT_STATUS: u8 = 0x4f;
pub const SHORT_SALE_PRICE_TEST_STATUS: u8 = 0x50;
pub const QUOTE_UPDATE: u8 = 0x51;
pub const SYSTEM_EVENT: u8 = 0x53;
pub const TRADE_REPORT: u8 = 0x54;
pub const OFFICIAL_PRICE: u8 = 0x58;

pub const SYMBOL_LEN: usize = 8;
pub const SYMBOL_PAD: u8 = b' ';
pub const REASON_LEN: usize = 4;

/// Fixed-point prices carry four implied decimal digits.
pub const PRICE_SCALE: f64 = 10_000.0;

/// Declared sub-message lengths (tag byte included).
pub const TRADING_STATUS_LEN: u16 = 22;
pub const QUOTE_UPDATE_LEN: u16 = 42;
pub const TRADE_REPORT_LEN: u16 = 38;

pub const STATUS_HALTED: u8 = b'H';
pub const STATUS_HALT_RELEASED: u8 = b'O';
pub const STATUS_PAUSED: u8 = b'P';
pub const STATUS_TRADING: u8 = b'T';
