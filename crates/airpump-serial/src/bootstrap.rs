//! Auto-open at process start.
//!
//! Runs once when the kiosk starts: try the configured default paths, then
//! fall back to enumeration and ranking. Nothing here is fatal; a kiosk with
//! no board attached still boots and shows its screens, it just cannot take
//! payment until a link is opened.

use airpump_core::config::SerialSettings;
use std::sync::Arc;

use crate::discovery::{Platform, PortEnumerator, select_port};
use crate::manager::{ConnectionHandle, ConnectionManager};
use crate::transport::PortOpener;

/// Establishes the controller link at start-up.
///
/// # Examples
///
/// ```no_run
/// use airpump_core::KioskConfig;
/// use airpump_serial::{Bootstrapper, ConnectionManager, discovery::SystemPorts};
/// use std::sync::Arc;
///
/// # async fn example() {
/// let config = KioskConfig::default();
/// let manager = Arc::new(ConnectionManager::new());
///
/// let bootstrapper = Bootstrapper::new(manager.clone(), SystemPorts).with_settings(&config.serial);
/// match bootstrapper.run().await {
///     Some(handle) => println!("connected to {} at {}", handle.path, handle.baud_rate),
///     None => println!("no controller found"),
/// }
/// # }
/// ```
pub struct Bootstrapper<O: PortOpener, E: PortEnumerator> {
    manager: Arc<ConnectionManager<O>>,
    enumerator: E,
    default_paths: Vec<String>,
    baud_rates: Vec<u32>,
    platform: Platform,
}

impl<O: PortOpener, E: PortEnumerator> Bootstrapper<O, E> {
    /// Bootstrapper with the factory serial settings for the current platform.
    pub fn new(manager: Arc<ConnectionManager<O>>, enumerator: E) -> Self {
        Self {
            manager,
            enumerator,
            default_paths: Vec::new(),
            baud_rates: Vec::new(),
            platform: Platform::current(),
        }
        .with_settings(&SerialSettings::default())
    }

    pub fn with_settings(mut self, settings: &SerialSettings) -> Self {
        self.default_paths = settings.default_paths.clone();
        self.baud_rates = settings.baud_rates.clone();
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Open the controller link if possible.
    ///
    /// An already open link is returned as is. Default paths apply to POSIX
    /// only; Windows goes straight to enumeration.
    pub async fn run(&self) -> Option<ConnectionHandle> {
        if let Some(handle) = self.manager.handle() {
            tracing::debug!(path = %handle.path, "Serial link already open, skipping bootstrap");
            return Some(handle);
        }

        if self.platform == Platform::Posix {
            for path in &self.default_paths {
                if let Some(handle) = self.try_path(path).await {
                    return Some(handle);
                }
            }
        }

        let ports = self.enumerator.list();
        let Some(path) = select_port(&ports, self.platform) else {
            tracing::warn!("No serial ports found, controller link not opened");
            return None;
        };

        tracing::info!(path = %path, candidates = ports.len(), "Selected serial port");
        let handle = self.try_path(&path).await;
        if handle.is_none() {
            tracing::warn!(path = %path, "Controller link not opened");
        }
        handle
    }

    async fn try_path(&self, path: &str) -> Option<ConnectionHandle> {
        match self
            .manager
            .open_with_fallback(path, &self.baud_rates)
            .await
        {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::debug!(path, error = %e, "Serial path unavailable");
                None
            }
        }
    }
}
