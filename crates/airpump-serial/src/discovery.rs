//! Serial port enumeration and ranking.
//!
//! The kiosk does not know in advance where the controller board shows up.
//! [`select_port`] ranks the enumerated ports by naming convention first
//! (what a USB-serial bridge is called on this platform) and by USB vendor
//! id second, so a single board is picked deterministically even when a GPS
//! receiver or modem is also attached.

use airpump_core::constants::{KNOWN_VENDOR_IDS, POSIX_ACM_PREFIX, POSIX_USB_PREFIX};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::{Result, SerialError};

static WINDOWS_COM_PORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^COM\d+$").expect("built-in pattern is valid"));

/// One enumerated serial port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortDescriptor {
    /// OS path or name (`/dev/ttyUSB0`, `COM3`).
    pub path: String,

    /// USB vendor id as four lowercase hex digits, for USB ports only.
    pub vendor_id: Option<String>,
}

impl PortDescriptor {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            vendor_id: None,
        }
    }

    /// Attach a vendor id; any case is accepted and stored lowercase.
    pub fn with_vendor_id(mut self, vendor_id: impl AsRef<str>) -> Self {
        self.vendor_id = Some(vendor_id.as_ref().to_ascii_lowercase());
        self
    }

    /// Returns `true` if the vendor is a known microcontroller or bridge maker.
    pub fn has_known_vendor(&self) -> bool {
        self.vendor_id
            .as_deref()
            .is_some_and(|vid| KNOWN_VENDOR_IDS.iter().any(|known| known.eq_ignore_ascii_case(vid)))
    }
}

/// Naming convention used to rank ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Linux and macOS style `/dev/tty*` paths.
    Posix,
    /// `COM<n>` port names.
    Windows,
}

impl Platform {
    /// Platform of the compile target.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }
}

/// Enumerate ports through the operating system.
///
/// # Errors
/// Returns `SerialError::Discovery` if the OS enumeration call fails.
pub fn try_list_ports() -> Result<Vec<PortDescriptor>> {
    let ports =
        serialport::available_ports().map_err(|e| SerialError::discovery(e.to_string()))?;

    Ok(ports
        .into_iter()
        .map(|info| {
            let descriptor = PortDescriptor::new(info.port_name);
            match info.port_type {
                serialport::SerialPortType::UsbPort(usb) => {
                    descriptor.with_vendor_id(format!("{:04x}", usb.vid))
                }
                _ => descriptor,
            }
        })
        .collect())
}

/// Enumerate ports, logging and swallowing enumeration failures.
///
/// Never cached: every call asks the OS again, so hot-plugged boards appear.
pub fn list_ports() -> Vec<PortDescriptor> {
    match try_list_ports() {
        Ok(ports) => {
            tracing::debug!(count = ports.len(), "Enumerated serial ports");
            ports
        }
        Err(e) => {
            tracing::warn!(error = %e, "Serial port enumeration failed");
            Vec::new()
        }
    }
}

/// Pick the most likely controller port.
///
/// Priority, first match wins:
///
/// 1. POSIX: first `/dev/ttyUSB*`, then first `/dev/ttyACM*`.
///    Windows: first name matching `COM<n>`.
/// 2. First port whose vendor id is a known board or bridge vendor.
/// 3. The first port.
///
/// # Examples
///
/// ```
/// use airpump_serial::discovery::{select_port, Platform, PortDescriptor};
///
/// let ports = vec![
///     PortDescriptor::new("/dev/ttyS0"),
///     PortDescriptor::new("/dev/ttyACM0"),
///     PortDescriptor::new("/dev/ttyUSB1"),
/// ];
/// assert_eq!(select_port(&ports, Platform::Posix).as_deref(), Some("/dev/ttyUSB1"));
/// assert_eq!(select_port(&[], Platform::Posix), None);
/// ```
pub fn select_port(ports: &[PortDescriptor], platform: Platform) -> Option<String> {
    let by_name = match platform {
        Platform::Posix => ports
            .iter()
            .find(|p| p.path.starts_with(POSIX_USB_PREFIX))
            .or_else(|| ports.iter().find(|p| p.path.starts_with(POSIX_ACM_PREFIX))),
        Platform::Windows => ports.iter().find(|p| WINDOWS_COM_PORT.is_match(&p.path)),
    };

    by_name
        .or_else(|| ports.iter().find(|p| p.has_known_vendor()))
        .or_else(|| ports.first())
        .map(|p| p.path.clone())
}

/// Source of port listings.
///
/// The bootstrapper is written against this trait so deployments with a
/// fixed wiring, and tests, can supply a static list.
pub trait PortEnumerator: Send + Sync {
    fn list(&self) -> Vec<PortDescriptor>;
}

/// Enumerates through the operating system on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPorts;

impl PortEnumerator for SystemPorts {
    fn list(&self) -> Vec<PortDescriptor> {
        list_ports()
    }
}

/// Fixed port list.
#[derive(Debug, Clone, Default)]
pub struct StaticPorts(pub Vec<PortDescriptor>);

impl PortEnumerator for StaticPorts {
    fn list(&self) -> Vec<PortDescriptor> {
        self.0.clone()
    }
}
