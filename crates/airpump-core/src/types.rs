use crate::{Result, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Service sold by the kiosk.
///
/// Each service runs its own session; only inflation drives the hose and
/// compressor, the other two are information services paid through the same
/// acceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceKind {
    /// Recommended PSI lookup for a tire code.
    TireInfo,
    /// Tire age check from the sidewall DOT code.
    DotCheck,
    /// Automated inflation to a target PSI.
    Inflation,
}

impl ServiceKind {
    /// All services in menu order.
    pub const ALL: [ServiceKind; 3] = [
        ServiceKind::TireInfo,
        ServiceKind::DotCheck,
        ServiceKind::Inflation,
    ];

    /// Wire/storage name of the service (`TIRE_INFO`, `DOT_CHECK`, `INFLATION`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceKind::TireInfo => "TIRE_INFO",
            ServiceKind::DotCheck => "DOT_CHECK",
            ServiceKind::Inflation => "INFLATION",
        }
    }

    /// Returns `true` if the flow has the hose connect and inflate steps.
    #[inline]
    #[must_use]
    pub fn drives_compressor(self) -> bool {
        matches!(self, ServiceKind::Inflation)
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceKind {
    type Err = Error;

    /// Accepts the wire name as well as the short CLI spelling
    /// (`tire`, `dot`, `inflate`), case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "TIRE_INFO" | "TIRE" => Ok(ServiceKind::TireInfo),
            "DOT_CHECK" | "DOT" => Ok(ServiceKind::DotCheck),
            "INFLATION" | "INFLATE" => Ok(ServiceKind::Inflation),
            _ => Err(Error::UnknownService(s.to_string())),
        }
    }
}

/// Axle position of the tire being serviced.
///
/// Front tires run slightly lower pressure for steering feel, rear tires
/// slightly higher to carry load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TirePosition {
    #[default]
    Front,
    Rear,
}

impl fmt::Display for TirePosition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TirePosition::Front => write!(f, "front"),
            TirePosition::Rear => write!(f, "rear"),
        }
    }
}

impl std::str::FromStr for TirePosition {
    type Err = Error;

    /// Anything other than `rear` means front, the same default the kiosk
    /// screens use.
    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("rear") {
            Ok(TirePosition::Rear)
        } else {
            Ok(TirePosition::Front)
        }
    }
}
