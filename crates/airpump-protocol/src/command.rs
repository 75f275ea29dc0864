//! Outbound commands sent from the kiosk to the device.

use airpump_core::constants::{LINE_TERMINATOR, VERB_INFLATE, VERB_PAYMENT, VERB_SEPARATOR};
use airpump_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Command understood by the payment/inflation controller.
///
/// The [`Display`](fmt::Display) form is the wire line without terminator;
/// [`DeviceCommand::to_line`] appends `\r\n`.
///
/// # Examples
///
/// ```
/// use airpump_protocol::DeviceCommand;
///
/// assert_eq!(DeviceCommand::payment(30).to_line(), "PAYMENT:30\r\n");
/// assert_eq!(DeviceCommand::inflate(31.6).unwrap().to_string(), "INFLATE:32");
/// assert!(DeviceCommand::inflate(0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceCommand {
    /// Start collecting `total` currency units.
    Payment { total: u32 },
    /// Inflate until the tire reaches `target_psi`.
    Inflate { target_psi: u32 },
}

impl DeviceCommand {
    #[must_use]
    pub fn payment(total: u32) -> Self {
        DeviceCommand::Payment { total }
    }

    /// Build an inflate command from a possibly fractional target.
    ///
    /// The target is rounded to the nearest whole PSI.
    ///
    /// # Errors
    /// Returns `Error::InvalidTarget` when the target is not finite or does
    /// not round to at least 1 PSI.
    pub fn inflate(target_psi: f64) -> Result<Self> {
        if !target_psi.is_finite() || target_psi <= 0.0 {
            return Err(Error::InvalidTarget(target_psi.to_string()));
        }
        let rounded = target_psi.round();
        if rounded < 1.0 || rounded > f64::from(u32::MAX) {
            return Err(Error::InvalidTarget(target_psi.to_string()));
        }
        Ok(DeviceCommand::Inflate {
            target_psi: rounded as u32,
        })
    }

    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            DeviceCommand::Payment { .. } => VERB_PAYMENT,
            DeviceCommand::Inflate { .. } => VERB_INFLATE,
        }
    }

    #[must_use]
    pub fn argument(&self) -> u32 {
        match self {
            DeviceCommand::Payment { total } => *total,
            DeviceCommand::Inflate { target_psi } => *target_psi,
        }
    }

    /// Wire line including the `\r\n` terminator.
    #[must_use]
    pub fn to_line(&self) -> String {
        format!("{self}{LINE_TERMINATOR}")
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}{}", self.verb(), VERB_SEPARATOR, self.argument())
    }
}
