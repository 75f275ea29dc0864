use serde::{Deserialize, Serialize};

/// Event decoded from one inbound device line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolEvent {
    /// Running total inserted so far in this payment cycle (absolute, not a delta).
    PaymentInserted { amount_so_far: u32 },
    /// The acceptor reached the requested total.
    PaymentComplete,
    /// Current tire pressure while inflating.
    PressureReading { psi: u32 },
    /// The controller stopped the compressor at the target.
    InflationComplete,
    /// Anything else: boot banners, debug output, line noise.
    Unrecognized { raw: String },
}

impl ProtocolEvent {
    #[must_use]
    pub fn is_recognized(&self) -> bool {
        !matches!(self, ProtocolEvent::Unrecognized { .. })
    }
}
