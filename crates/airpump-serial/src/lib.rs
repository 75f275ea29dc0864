//! Serial link to the kiosk controller board.
//!
//! The payment acceptor and inflation controller sit behind a single
//! microcontroller on a USB-serial link. This crate finds that board, keeps
//! exactly one link open to it, and turns the byte stream into lines for the
//! session layer.
//!
//! - [`discovery`]: enumerate and rank ports ([`select_port`]).
//! - [`ConnectionManager`]: idempotent open with baud fallback and settle
//!   delay, drained writes, status snapshots, line fan-out.
//! - [`Bootstrapper`]: one-shot auto-open at process start.
//! - [`transport`]: the [`PortOpener`] seam, with the `tokio-serial` backed
//!   [`NativeOpener`].
//! - [`mock`]: in-memory ports and a scriptable device for tests.
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T>`][error::Result] with
//! [`SerialError`]. Discovery never fails outright: [`list_ports`] logs and
//! returns an empty list.

pub mod bootstrap;
pub mod discovery;
pub mod error;
pub mod manager;
pub mod mock;
pub mod transport;

pub use bootstrap::Bootstrapper;
pub use discovery::{Platform, PortDescriptor, PortEnumerator, list_ports, select_port};
pub use error::{Result, SerialError};
pub use manager::{
    ConnectionHandle, ConnectionManager, ConnectionStatus, LineSubscription, SubscriptionGuard,
};
pub use transport::{NativeOpener, PortOpener};
