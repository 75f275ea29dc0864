//! In-memory serial ports for testing and development.
//!
//! [`MockOpener`] implements [`PortOpener`] on top of `tokio::io::duplex`.
//! Every successful open produces a [`MockDevice`], the far end of the
//! stream, which tests use to play the payment/inflation controller.

use airpump_protocol::LineCodec;
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;

use crate::transport::PortOpener;
use crate::{Result, SerialError};

/// Buffer size of each in-memory link, in bytes.
const MOCK_BUFFER_SIZE: usize = 4096;

/// One call to [`PortOpener::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAttempt {
    pub path: String,
    pub baud: u32,
    pub succeeded: bool,
}

#[derive(Debug, Default)]
struct MockState {
    attempts: Vec<OpenAttempt>,
    failing_paths: HashSet<String>,
    failing_bauds: HashSet<u32>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Port opener backed by in-memory duplex streams.
///
/// # Examples
///
/// ```
/// use airpump_serial::mock::MockOpener;
/// use airpump_serial::transport::PortOpener;
///
/// # #[tokio::main]
/// # async fn main() {
/// let (opener, mut handle) = MockOpener::new();
/// handle.fail_baud(115_200);
///
/// assert!(opener.open("/dev/ttyUSB0", 115_200).await.is_err());
/// let _port = opener.open("/dev/ttyUSB0", 9_600).await.unwrap();
///
/// let device = handle.next_device().await.unwrap();
/// assert_eq!(device.baud(), 9_600);
/// assert_eq!(handle.attempts().len(), 2);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockOpener {
    state: Arc<Mutex<MockState>>,
    devices: mpsc::UnboundedSender<MockDevice>,
}

impl MockOpener {
    /// Create an opener and the handle that controls it.
    pub fn new() -> (Self, MockOpenerHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        let (devices_tx, devices_rx) = mpsc::unbounded_channel();

        let opener = Self {
            state: state.clone(),
            devices: devices_tx,
        };
        let handle = MockOpenerHandle {
            state,
            devices: devices_rx,
        };

        (opener, handle)
    }
}

impl PortOpener for MockOpener {
    type Port = DuplexStream;

    async fn open(&self, path: &str, baud: u32) -> Result<DuplexStream> {
        let refused = {
            let mut state = lock(&self.state);
            let refused =
                state.failing_paths.contains(path) || state.failing_bauds.contains(&baud);
            state.attempts.push(OpenAttempt {
                path: path.to_string(),
                baud,
                succeeded: !refused,
            });
            refused
        };

        if refused {
            return Err(SerialError::open(path, baud, "mock device refused open"));
        }

        let (kiosk, device) = tokio::io::duplex(MOCK_BUFFER_SIZE);
        let (rx, tx) = tokio::io::split(device);
        let device = MockDevice {
            path: path.to_string(),
            baud,
            lines: FramedRead::new(rx, LineCodec::new()),
            writer: tx,
        };
        // The handle may have been dropped; the port still works.
        let _ = self.devices.send(device);

        Ok(kiosk)
    }
}

/// Controls a [`MockOpener`]: failure injection, attempt log and access to
/// the device end of every opened link.
#[derive(Debug)]
pub struct MockOpenerHandle {
    state: Arc<Mutex<MockState>>,
    devices: mpsc::UnboundedReceiver<MockDevice>,
}

impl MockOpenerHandle {
    /// Refuse every open of `path`.
    pub fn fail_path(&self, path: impl Into<String>) {
        lock(&self.state).failing_paths.insert(path.into());
    }

    /// Refuse every open at `baud`.
    pub fn fail_baud(&self, baud: u32) {
        lock(&self.state).failing_bauds.insert(baud);
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        let mut state = lock(&self.state);
        state.failing_paths.clear();
        state.failing_bauds.clear();
    }

    /// Every open call so far, in order.
    pub fn attempts(&self) -> Vec<OpenAttempt> {
        lock(&self.state).attempts.clone()
    }

    /// Number of opens that produced a device.
    pub fn successful_opens(&self) -> usize {
        lock(&self.state)
            .attempts
            .iter()
            .filter(|a| a.succeeded)
            .count()
    }

    /// Device end of the next successfully opened link.
    ///
    /// Returns `None` once the opener and all its clones are dropped and no
    /// devices are pending.
    pub async fn next_device(&mut self) -> Option<MockDevice> {
        self.devices.recv().await
    }

    /// Device end of an already opened link, without waiting.
    pub fn try_next_device(&mut self) -> Option<MockDevice> {
        self.devices.try_recv().ok()
    }
}

/// Simulated controller at the far end of a mock link.
///
/// Dropping the device closes the link, which the kiosk observes as the
/// board being unplugged.
#[derive(Debug)]
pub struct MockDevice {
    path: String,
    baud: u32,
    lines: FramedRead<ReadHalf<DuplexStream>, LineCodec>,
    writer: WriteHalf<DuplexStream>,
}

impl MockDevice {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }

    /// Send one line to the kiosk, CRLF terminated.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Send raw bytes without framing.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Next line written by the kiosk, without terminator.
    ///
    /// Returns `None` when the kiosk closed the link.
    pub async fn read_line(&mut self) -> Option<String> {
        match self.lines.next().await {
            Some(Ok(line)) => Some(line),
            Some(Err(e)) => {
                tracing::warn!(error = %e, path = %self.path, "Mock device read failed");
                None
            }
            None => None,
        }
    }

    /// Simulate the board being unplugged.
    pub fn unplug(self) {
        tracing::debug!(path = %self.path, "Mock device unplugged");
    }
}
