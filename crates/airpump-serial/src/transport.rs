//! Port opener abstraction.
//!
//! The connection manager never touches the OS directly; it asks a
//! [`PortOpener`] for a byte stream. [`NativeOpener`] opens a real UART via
//! `tokio-serial`, and [`crate::mock::MockOpener`] hands out in-memory streams
//! for tests and for running the kiosk without a board attached.

use std::future::Future;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::SerialPortBuilderExt;

use crate::{Result, SerialError};

/// Acquires a duplex byte stream for a port path at a baud rate.
pub trait PortOpener: Send + Sync + 'static {
    type Port: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Open `path` at `baud`, 8 data bits, no parity, one stop bit, no flow
    /// control.
    fn open(&self, path: &str, baud: u32) -> impl Future<Output = Result<Self::Port>> + Send;
}

/// Opens real serial ports through `tokio-serial`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeOpener;

impl PortOpener for NativeOpener {
    type Port = tokio_serial::SerialStream;

    async fn open(&self, path: &str, baud: u32) -> Result<Self::Port> {
        tokio_serial::new(path, baud)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| SerialError::open(path, baud, e.to_string()))
    }
}
