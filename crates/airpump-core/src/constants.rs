//! Core constants for the kiosk serial protocol.
//!
//! The kiosk talks to a microcontroller (coin/bill acceptor plus inflation
//! controller) over a UART link using newline-delimited ASCII:
//!
//! ```text
//! kiosk  -> device   PAYMENT:30\r\n
//! device -> kiosk    INSERTED:10
//! device -> kiosk    INSERTED:30
//! device -> kiosk    PAYMENT COMPLETE
//! kiosk  -> device   INFLATE:32\r\n
//! device -> kiosk    PRESSURE:31
//! device -> kiosk    PRESSURE:32
//! ```
//!
//! # Usage
//!
//! ```
//! use airpump_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(BAUD_RATES, [115_200, 9_600]);
//! let settle = Duration::from_millis(SETTLE_DELAY_MS);
//! assert_eq!(settle.as_millis(), 350);
//! ```

// ============================================================================
// Wire format
// ============================================================================

/// Line terminator appended to every outbound command.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Separator between a command verb and its argument (`VERB:ARG`).
pub const VERB_SEPARATOR: char = ':';

/// Verb requesting a payment collection cycle.
pub const VERB_PAYMENT: &str = "PAYMENT";

/// Verb requesting inflation to a target PSI.
pub const VERB_INFLATE: &str = "INFLATE";

/// Default upper bound for a single inbound line.
///
/// Device replies are a few dozen bytes; a line that grows past this limit
/// means the link is running at the wrong baud rate and producing noise.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

// ============================================================================
// Serial link parameters
// ============================================================================

/// Preferred baud rate, tried first.
pub const BAUD_PRIMARY: u32 = 115_200;

/// Legacy fallback baud rate, tried only if the primary rate fails to open.
pub const BAUD_FALLBACK: u32 = 9_600;

/// Baud rates in negotiation order.
pub const BAUD_RATES: [u32; 2] = [BAUD_PRIMARY, BAUD_FALLBACK];

/// Pause after a successful open before the first write, in milliseconds.
///
/// Most microcontroller boards reset when the host asserts DTR on open and
/// drop input until their bootloader hands over to the sketch.
pub const SETTLE_DELAY_MS: u64 = 350;

/// Device paths tried at start-up before falling back to enumeration.
pub const DEFAULT_POSIX_PATHS: [&str; 2] = ["/dev/ttyUSB0", "/dev/ttyACM0"];

/// Path prefix of USB-serial bridge devices on Linux (FTDI, CH340, CP210x).
pub const POSIX_USB_PREFIX: &str = "/dev/ttyUSB";

/// Path prefix of CDC-ACM devices on Linux (native USB boards).
pub const POSIX_ACM_PREFIX: &str = "/dev/ttyACM";

/// USB vendor ids of known microcontroller boards and USB-serial bridges.
///
/// | VID | Vendor |
/// |-----|--------|
/// | `2341` | Arduino |
/// | `2a03` | Arduino.org |
/// | `1a86` | WCH (CH340/CH341) |
/// | `10c4` | Silicon Labs (CP210x) |
/// | `0403` | FTDI |
pub const KNOWN_VENDOR_IDS: [&str; 5] = ["2341", "2a03", "1a86", "10c4", "0403"];

/// Capacity of the broadcast channel carrying inbound lines.
///
/// A subscriber that falls further behind than this skips the oldest lines.
pub const LINE_CHANNEL_CAPACITY: usize = 256;

// ============================================================================
// Pricing defaults
// ============================================================================

/// Default price of the tire PSI lookup service.
pub const DEFAULT_PRICE_TIRE_INFO: u32 = 10;

/// Default price of the DOT code age check.
pub const DEFAULT_PRICE_DOT_CHECK: u32 = 10;

/// Default price of inflation, charged on top of the tire info price.
pub const DEFAULT_PRICE_INFLATION: u32 = 20;

// ============================================================================
// DOT age thresholds
// ============================================================================

/// Age in years from which a tire should be inspected closely.
pub const DOT_CAUTION_AGE_YEARS: f64 = 6.0;

/// Age in years from which a tire should be replaced.
pub const DOT_REPLACE_AGE_YEARS: f64 = 10.0;

/// Average number of weeks per year used by the age estimate.
pub const WEEKS_PER_YEAR: f64 = 52.0;
