//! Shared building blocks for the AirPump vending kiosk.
//!
//! Everything here is free of I/O runtimes: errors, protocol-level constants,
//! domain types shared between the serial, session and storage crates, the
//! kiosk configuration, and the tire/DOT reference data the service flows read.

pub mod config;
pub mod constants;
pub mod dot;
pub mod error;
pub mod tire;
pub mod transaction;
pub mod types;

pub use config::KioskConfig;
pub use error::{Error, Result};
pub use transaction::{MemorySink, TransactionRecord, TransactionSink};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
