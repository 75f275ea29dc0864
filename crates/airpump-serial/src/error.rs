//! Error types for serial link operations.
//!
//! Discovery and open failures are expected in normal operation (no board
//! plugged in, wrong baud rate, port held by another process) and are usually
//! logged and retried by the caller rather than surfaced to the customer.

/// Result type alias for serial operations.
pub type Result<T> = std::result::Result<T, SerialError>;

/// Errors that can occur on the serial link.
#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    /// The operating system refused to enumerate serial ports.
    #[error("Port discovery failed: {message}")]
    Discovery { message: String },

    /// The device could not be acquired at the requested rate.
    #[error("Failed to open {path} at {baud} baud: {message}")]
    Open {
        path: String,
        baud: u32,
        message: String,
    },

    /// A write was requested while no link is open.
    #[error("Serial port is not open")]
    NotOpen,

    /// Writing or draining the output buffer failed.
    #[error("Write to {path} failed: {message}")]
    Write { path: String, message: String },

    /// The device went away while the link was open.
    #[error("Device disconnected: {path}")]
    Disconnected { path: String },

    /// The payload cannot be framed as a single line.
    #[error(transparent)]
    Protocol(#[from] airpump_core::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SerialError {
    /// Create a new discovery error.
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }

    /// Create a new open error.
    pub fn open(path: impl Into<String>, baud: u32, message: impl Into<String>) -> Self {
        Self::Open {
            path: path.into(),
            baud,
            message: message.into(),
        }
    }

    /// Create a new write error.
    pub fn write(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Write {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new disconnected error.
    pub fn disconnected(path: impl Into<String>) -> Self {
        Self::Disconnected { path: path.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_error() {
        let error = SerialError::open("/dev/ttyUSB0", 115_200, "Permission denied");
        assert!(matches!(error, SerialError::Open { baud: 115_200, .. }));
        assert_eq!(
            error.to_string(),
            "Failed to open /dev/ttyUSB0 at 115200 baud: Permission denied"
        );
    }

    #[test]
    fn test_write_error() {
        let error = SerialError::write("COM3", "broken pipe");
        assert_eq!(error.to_string(), "Write to COM3 failed: broken pipe");
    }

    #[test]
    fn test_protocol_error_is_transparent() {
        let error = SerialError::from(airpump_core::Error::InvalidCommand("A\nB".into()));
        assert_eq!(error.to_string(), "Invalid command: A\nB");
    }

    #[test]
    fn test_error_display() {
        let errors = vec![
            SerialError::discovery("udev unavailable"),
            SerialError::disconnected("/dev/ttyACM0"),
            SerialError::NotOpen,
        ];

        for error in errors {
            let _ = format!("{}", error);
            let _ = format!("{:?}", error);
        }
    }
}
