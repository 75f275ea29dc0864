//! Connection manager for the controller link.
//!
//! The kiosk holds at most one serial link at a time. [`ConnectionManager`]
//! owns it, serializes open/close/write behind an async mutex, and runs one
//! reader task per link that decodes lines and fans them out to every
//! subscriber.
//!
//! # Architecture
//!
//! ```text
//!                      ┌──────────────────────┐
//!  open/close/write ──►│ Mutex<Option<Link>>  │──► WriteHalf (CRLF + flush)
//!                      └──────────────────────┘
//!
//!  ReadHalf ──► reader task ──► LineCodec ──► broadcast ──┬─► LineSubscription
//!                     │                                   ├─► on_data handler
//!                     └──► watch<ConnectionStatus>        └─► ...
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use airpump_serial::ConnectionManager;
//!
//! #[tokio::main]
//! async fn main() -> airpump_serial::Result<()> {
//!     let manager = ConnectionManager::new();
//!     let mut lines = manager.subscribe();
//!
//!     manager.open_with_fallback("/dev/ttyUSB0", &[115_200, 9_600]).await?;
//!     manager.write("PAYMENT:30").await?;
//!
//!     while let Some(line) = lines.recv().await {
//!         println!("device: {line}");
//!     }
//!     Ok(())
//! }
//! ```

use airpump_core::constants::{DEFAULT_MAX_LINE_LENGTH, LINE_CHANNEL_CAPACITY, SETTLE_DELAY_MS};
use airpump_protocol::{DeviceCommand, LineCodec};
use bytes::BytesMut;
use futures::Stream;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, WriteHalf};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::codec::{Decoder, Encoder};

use crate::transport::{NativeOpener, PortOpener};
use crate::{Result, SerialError};

/// Initial capacity of the per-link read buffer.
const READ_BUFFER_SIZE: usize = 1024;

/// The open link as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionHandle {
    pub path: String,
    pub baud_rate: u32,
    pub is_open: bool,
}

/// Snapshot of the link state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ConnectionStatus {
    pub is_open: bool,
    pub path: Option<String>,
    pub baud_rate: Option<u32>,
}

impl ConnectionStatus {
    pub fn closed() -> Self {
        Self::default()
    }

    /// Handle for the open link, if any.
    pub fn handle(&self) -> Option<ConnectionHandle> {
        match (self.is_open, &self.path, self.baud_rate) {
            (true, Some(path), Some(baud_rate)) => Some(ConnectionHandle {
                path: path.clone(),
                baud_rate,
                is_open: true,
            }),
            _ => None,
        }
    }
}

impl From<&ConnectionHandle> for ConnectionStatus {
    fn from(handle: &ConnectionHandle) -> Self {
        Self {
            is_open: handle.is_open,
            path: Some(handle.path.clone()),
            baud_rate: Some(handle.baud_rate),
        }
    }
}

struct Link<P> {
    handle: ConnectionHandle,
    writer: WriteHalf<P>,
    reader: JoinHandle<()>,
}

impl<P> Link<P> {
    /// A link whose reader ended (EOF or read error) has lost its device.
    fn is_alive(&self) -> bool {
        !self.reader.is_finished()
    }

    fn matches(&self, path: &str, baud: u32) -> bool {
        self.handle.path == path && self.handle.baud_rate == baud
    }
}

/// Owner of the single serial link.
///
/// Generic over the [`PortOpener`] so tests and demos can run against
/// [`crate::mock::MockOpener`].
pub struct ConnectionManager<O: PortOpener = NativeOpener> {
    opener: O,
    link: Mutex<Option<Link<O::Port>>>,
    lines: broadcast::Sender<String>,
    status: Arc<watch::Sender<ConnectionStatus>>,
    settle_delay: Duration,
    max_line_length: usize,
}

impl ConnectionManager<NativeOpener> {
    /// Manager for real serial ports.
    pub fn new() -> Self {
        Self::with_opener(NativeOpener)
    }
}

impl Default for ConnectionManager<NativeOpener> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: PortOpener> ConnectionManager<O> {
    pub fn with_opener(opener: O) -> Self {
        let (lines, _) = broadcast::channel(LINE_CHANNEL_CAPACITY);
        let (status, _) = watch::channel(ConnectionStatus::closed());

        Self {
            opener,
            link: Mutex::new(None),
            lines,
            status: Arc::new(status),
            settle_delay: Duration::from_millis(SETTLE_DELAY_MS),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }

    /// Pause applied by [`ConnectionManager::open_with_fallback`] after a
    /// successful open.
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Open `path` at `baud`.
    ///
    /// Reopening the live link with the same path and baud returns it
    /// untouched. Any other open link is closed first, so there is never more
    /// than one.
    ///
    /// # Errors
    /// Returns `SerialError::Open` when the device cannot be acquired. The
    /// previous link, if it differed, is already closed at that point.
    pub async fn open(&self, path: &str, baud: u32) -> Result<ConnectionHandle> {
        let mut guard = self.link.lock().await;

        if let Some(link) = guard.as_ref() {
            if link.is_alive() && link.matches(path, baud) {
                tracing::debug!(path, baud, "Serial port already open");
                return Ok(link.handle.clone());
            }
        }

        if let Some(link) = guard.take() {
            self.teardown(link).await;
        }

        let port = self.opener.open(path, baud).await.inspect_err(|e| {
            tracing::debug!(path, baud, error = %e, "Serial open failed");
        })?;
        let (rx, writer) = tokio::io::split(port);

        let handle = ConnectionHandle {
            path: path.to_string(),
            baud_rate: baud,
            is_open: true,
        };
        self.status.send_replace(ConnectionStatus::from(&handle));

        let reader = tokio::spawn(read_lines(
            path.to_string(),
            rx,
            self.lines.clone(),
            self.status.clone(),
            self.max_line_length,
        ));

        *guard = Some(Link {
            handle: handle.clone(),
            writer,
            reader,
        });

        tracing::info!(path, baud, "Serial port opened");
        Ok(handle)
    }

    /// Try each baud rate in order, stop at the first that opens, then wait
    /// the settle delay before returning.
    ///
    /// # Errors
    /// Returns the last open error when every rate fails.
    pub async fn open_with_fallback(&self, path: &str, bauds: &[u32]) -> Result<ConnectionHandle> {
        let mut last_error = None;

        for &baud in bauds {
            match self.open(path, baud).await {
                Ok(handle) => {
                    tokio::time::sleep(self.settle_delay).await;
                    return Ok(handle);
                }
                Err(e) => last_error = Some(e),
            }
        }

        let error = last_error.unwrap_or_else(|| SerialError::open(path, 0, "no baud rates to try"));
        tracing::warn!(path, error = %error, "Could not open serial port at any baud rate");
        Err(error)
    }

    /// Close the link. Always safe, also when nothing is open.
    pub async fn close(&self) {
        let mut guard = self.link.lock().await;
        match guard.take() {
            Some(link) => self.teardown(link).await,
            None => tracing::debug!("Close requested with no open serial port"),
        }
    }

    async fn teardown(&self, mut link: Link<O::Port>) {
        if let Err(e) = link.writer.shutdown().await {
            tracing::debug!(path = %link.handle.path, error = %e, "Serial writer shutdown failed");
        }
        link.reader.abort();
        let _ = link.reader.await;

        self.status.send_replace(ConnectionStatus::closed());
        tracing::info!(path = %link.handle.path, baud = link.handle.baud_rate, "Serial port closed");
    }

    /// Write one line and wait until it is drained to the device.
    ///
    /// CRLF is appended unless the payload already ends in a newline.
    ///
    /// # Errors
    /// - `SerialError::NotOpen` when no link is open.
    /// - `SerialError::Disconnected` when the device went away; the dead link
    ///   is closed.
    /// - `SerialError::Protocol` when the payload contains an embedded newline.
    /// - `SerialError::Write` when writing or draining fails.
    pub async fn write(&self, line: &str) -> Result<()> {
        let mut frame = BytesMut::new();
        LineCodec::new().encode(line, &mut frame)?;

        let mut guard = self.link.lock().await;
        let Some(link) = guard.as_mut() else {
            return Err(SerialError::NotOpen);
        };

        if !link.is_alive() {
            let path = link.handle.path.clone();
            if let Some(link) = guard.take() {
                self.teardown(link).await;
            }
            return Err(SerialError::disconnected(path));
        }

        let path = link.handle.path.as_str();
        link.writer
            .write_all(&frame)
            .await
            .map_err(|e| SerialError::write(path, e.to_string()))?;
        link.writer
            .flush()
            .await
            .map_err(|e| SerialError::write(path, e.to_string()))?;

        tracing::debug!(path, line = line.trim_end(), "Wrote line");
        Ok(())
    }

    pub async fn write_command(&self, command: DeviceCommand) -> Result<()> {
        self.write(&command.to_line()).await
    }

    /// Current link state. Never blocks.
    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    /// Handle of the open link, if any.
    pub fn handle(&self) -> Option<ConnectionHandle> {
        self.status.borrow().handle()
    }

    /// Observe link state changes.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Receive every line decoded from now on, in arrival order.
    pub fn subscribe(&self) -> LineSubscription {
        LineSubscription {
            rx: self.lines.subscribe(),
        }
    }

    /// Call `handler` for every line until the returned guard is dropped.
    pub fn on_data<F>(&self, mut handler: F) -> SubscriptionGuard
    where
        F: FnMut(String) + Send + 'static,
    {
        let mut subscription = self.subscribe();
        let task = tokio::spawn(async move {
            while let Some(line) = subscription.recv().await {
                handler(line);
            }
        });
        SubscriptionGuard { task }
    }
}

impl<O: PortOpener> Drop for ConnectionManager<O> {
    fn drop(&mut self) {
        if let Some(link) = self.link.get_mut().take() {
            link.reader.abort();
        }
    }
}

async fn read_lines<R>(
    path: String,
    mut rx: R,
    lines: broadcast::Sender<String>,
    status: Arc<watch::Sender<ConnectionStatus>>,
    max_line_length: usize,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut codec = LineCodec::with_max_length(max_line_length);
    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);

    loop {
        loop {
            match codec.decode(&mut buf) {
                Ok(Some(line)) => publish(&path, &lines, line),
                Ok(None) => break,
                Err(e) => {
                    // The codec skips to the next newline on its own.
                    tracing::warn!(path = %path, error = %e, "Discarding device input, check the baud rate");
                }
            }
        }

        match rx.read_buf(&mut buf).await {
            Ok(0) => {
                if let Ok(Some(line)) = codec.decode_eof(&mut buf) {
                    publish(&path, &lines, line);
                }
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Serial read failed");
                break;
            }
        }
    }

    tracing::warn!(path = %path, "Serial link lost");
    status.send_replace(ConnectionStatus::closed());
}

fn publish(path: &str, lines: &broadcast::Sender<String>, line: String) {
    tracing::trace!(path, line = %line, "Received line");
    // Nobody listening is not an error.
    let _ = lines.send(line);
}

/// Receiver for decoded lines.
///
/// A subscriber that falls more than the channel capacity behind skips the
/// oldest lines; the gap is logged.
#[derive(Debug)]
pub struct LineSubscription {
    rx: broadcast::Receiver<String>,
}

impl LineSubscription {
    /// Next line, or `None` once the manager is gone.
    pub async fn recv(&mut self) -> Option<String> {
        loop {
            match self.rx.recv().await {
                Ok(line) => return Some(line),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Line subscriber lagged, lines dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Line already received, without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        loop {
            match self.rx.try_recv() {
                Ok(line) => return Some(line),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Line subscriber lagged, lines dropped");
                }
                Err(_) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = String> + Send {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription.recv().await.map(|line| (line, subscription))
        })
    }
}

/// Keeps an [`ConnectionManager::on_data`] handler attached.
#[derive(Debug)]
pub struct SubscriptionGuard {
    task: JoinHandle<()>,
}

impl SubscriptionGuard {
    /// Detach the handler. Equivalent to dropping the guard.
    pub fn unsubscribe(self) {}
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockOpener;

    fn manager() -> (ConnectionManager<MockOpener>, crate::mock::MockOpenerHandle) {
        let (opener, handle) = MockOpener::new();
        (ConnectionManager::with_opener(opener), handle)
    }

    #[tokio::test]
    async fn test_initial_status_closed() {
        let (manager, _handle) = manager();
        assert_eq!(manager.status(), ConnectionStatus::closed());
        assert!(manager.handle().is_none());
    }

    #[tokio::test]
    async fn test_open_updates_status() {
        let (manager, _handle) = manager();
        let handle = manager.open("/dev/ttyUSB0", 115_200).await.unwrap();

        assert!(handle.is_open);
        let status = manager.status();
        assert!(status.is_open);
        assert_eq!(status.path.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(status.baud_rate, Some(115_200));
        assert_eq!(manager.handle(), Some(handle));
    }

    #[tokio::test]
    async fn test_write_without_link() {
        let (manager, _handle) = manager();
        let result = manager.write("PAYMENT:10").await;
        assert!(matches!(result, Err(SerialError::NotOpen)));
    }

    #[tokio::test]
    async fn test_write_appends_crlf() {
        let (manager, mut handle) = manager();
        manager.open("/dev/ttyUSB0", 115_200).await.unwrap();
        let mut device = handle.next_device().await.unwrap();

        manager.write("PAYMENT:30").await.unwrap();
        manager
            .write_command(DeviceCommand::Inflate { target_psi: 32 })
            .await
            .unwrap();

        assert_eq!(device.read_line().await.as_deref(), Some("PAYMENT:30"));
        assert_eq!(device.read_line().await.as_deref(), Some("INFLATE:32"));
    }

    #[tokio::test]
    async fn test_write_rejects_embedded_newline() {
        let (manager, _handle) = manager();
        manager.open("/dev/ttyUSB0", 115_200).await.unwrap();
        let result = manager.write("PAYMENT:30\nINFLATE:32").await;
        assert!(matches!(result, Err(SerialError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_close_is_always_safe() {
        let (manager, _handle) = manager();
        manager.close().await;
        manager.open("/dev/ttyUSB0", 9_600).await.unwrap();
        manager.close().await;
        manager.close().await;
        assert_eq!(manager.status(), ConnectionStatus::closed());
    }

    #[tokio::test]
    async fn test_close_signals_device() {
        let (manager, mut handle) = manager();
        manager.open("/dev/ttyUSB0", 9_600).await.unwrap();
        let mut device = handle.next_device().await.unwrap();

        manager.close().await;
        assert_eq!(device.read_line().await, None);
    }

    #[tokio::test]
    async fn test_on_data_receives_lines() {
        let (manager, mut handle) = manager();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let guard = manager.on_data(move |line| {
            let _ = tx.send(line);
        });

        manager.open("/dev/ttyUSB0", 115_200).await.unwrap();
        let mut device = handle.next_device().await.unwrap();
        device.send_line("INSERTED:10").await.unwrap();

        assert_eq!(rx.recv().await.as_deref(), Some("INSERTED:10"));
        guard.unsubscribe();
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_status_watch_sees_unplug() {
        let (manager, mut handle) = manager();
        let mut status = manager.watch_status();

        manager.open("/dev/ttyACM0", 115_200).await.unwrap();
        status.wait_for(|s| s.is_open).await.unwrap();

        handle.next_device().await.unwrap().unplug();
        status.wait_for(|s| !s.is_open).await.unwrap();
        assert!(!manager.status().is_open);
    }
}
