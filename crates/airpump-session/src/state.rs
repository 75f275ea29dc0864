//! Session states and the pure event reducer.
//!
//! # States
//!
//! - `Payment`: collecting currency toward `required`.
//! - `Connect`: waiting for the customer to attach the hose (inflation only).
//! - `Inflate`: compressor running toward `target`.
//! - `Completed`: terminal; every further event is ignored.
//!
//! # Valid Transitions
//!
//! - Payment → Payment (running total) → Completed (information services)
//! - Payment → Connect → Inflate → Inflate (readings) → Completed (inflation)
//!
//! A free session has no `Payment` step: information services start in
//! `Completed`, inflation starts in `Connect`.
//!
//! Device events only move a session through [`reduce`]. `Connect → Inflate`
//! and `Inflate → Completed` are customer actions driven by
//! [`Session`](crate::Session).
//!
//! # Examples
//!
//! ```
//! use airpump_core::ServiceKind;
//! use airpump_protocol::ProtocolEvent;
//! use airpump_session::{SessionState, reduce};
//!
//! let state = SessionState::Payment { required: 30, inserted: 0 };
//! let state = reduce(
//!     ServiceKind::Inflation,
//!     state,
//!     &ProtocolEvent::PaymentInserted { amount_so_far: 20 },
//! );
//! assert_eq!(state, SessionState::Payment { required: 30, inserted: 20 });
//!
//! let state = reduce(ServiceKind::Inflation, state, &ProtocolEvent::PaymentComplete);
//! assert_eq!(state, SessionState::Connect);
//! ```

use airpump_core::ServiceKind;
use airpump_protocol::ProtocolEvent;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a service flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SessionState {
    /// Waiting for the acceptor to collect `required`.
    ///
    /// `inserted` is the device's running total, replaced on every report.
    Payment { required: u32, inserted: u32 },

    /// Paid; waiting for the customer to connect the hose.
    Connect,

    /// Inflating toward `target` PSI.
    ///
    /// `started` is set once the `INFLATE` command was written; readings are
    /// only taken into account after that.
    Inflate {
        target: u32,
        current: Option<u32>,
        started: bool,
        completed: bool,
    },

    /// Service delivered.
    Completed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Payment { required, inserted } => {
                write!(f, "Payment({inserted}/{required})")
            }
            SessionState::Connect => write!(f, "Connect"),
            SessionState::Inflate {
                target,
                current,
                started,
                completed,
            } => {
                let phase = match (started, completed) {
                    (_, true) => "done",
                    (true, false) => "running",
                    (false, false) => "ready",
                };
                match current {
                    Some(current) => write!(f, "Inflate({current}/{target} psi, {phase})"),
                    None => write!(f, "Inflate(-/{target} psi, {phase})"),
                }
            }
            SessionState::Completed => write!(f, "Completed"),
        }
    }
}

impl SessionState {
    /// Initial state for `service` priced at `required`.
    ///
    /// Free services skip payment. A free information service is delivered
    /// right away; a free inflation still has to connect and inflate.
    #[must_use]
    pub fn initial(service: ServiceKind, required: u32) -> Self {
        if required > 0 {
            SessionState::Payment {
                required,
                inserted: 0,
            }
        } else if service.drives_compressor() {
            SessionState::Connect
        } else {
            SessionState::Completed
        }
    }

    /// Short state name, used in logs and errors.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Payment { .. } => "payment",
            SessionState::Connect => "connect",
            SessionState::Inflate { .. } => "inflate",
            SessionState::Completed => "completed",
        }
    }

    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed)
    }

    /// Returns `true` once the compressor reached its target, before the
    /// customer finished the session.
    #[inline]
    #[must_use]
    pub fn is_inflation_done(&self) -> bool {
        matches!(
            self,
            SessionState::Inflate {
                completed: true,
                ..
            }
        )
    }

    /// Inflation progress in percent, `None` outside of `Inflate`.
    ///
    /// `clamp(round(current / target * 100), 0, 100)`; zero until the first
    /// reading arrives or when the target is zero.
    #[must_use]
    pub fn progress_percent(&self) -> Option<u8> {
        let SessionState::Inflate {
            target, current, ..
        } = *self
        else {
            return None;
        };

        match current {
            Some(current) if target > 0 => {
                let percent = (f64::from(current) / f64::from(target) * 100.0).round();
                Some(percent.clamp(0.0, 100.0) as u8)
            }
            _ => Some(0),
        }
    }

    /// Check if moving to `target` is allowed from this state.
    ///
    /// Staying in the same variant is allowed for `Payment` and `Inflate`,
    /// whose fields change as the device reports progress.
    ///
    /// # Examples
    ///
    /// ```
    /// use airpump_session::SessionState;
    ///
    /// let payment = SessionState::Payment { required: 10, inserted: 0 };
    /// assert!(payment.can_transition_to(&SessionState::Completed));
    /// assert!(!SessionState::Completed.can_transition_to(&payment));
    /// ```
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, target),
            (Payment { .. }, Payment { .. } | Connect | Completed)
                | (Connect, Inflate { .. })
                | (Inflate { .. }, Inflate { .. } | Completed)
        )
    }
}

/// Apply one device event to a session state.
///
/// Pure and total: unknown or out-of-place events return the state
/// unchanged.
pub fn reduce(service: ServiceKind, state: SessionState, event: &ProtocolEvent) -> SessionState {
    match (state, event) {
        (
            SessionState::Payment { required, .. },
            ProtocolEvent::PaymentInserted { amount_so_far },
        ) => SessionState::Payment {
            required,
            inserted: *amount_so_far,
        },

        (SessionState::Payment { required, .. }, ProtocolEvent::PaymentComplete)
            if required > 0 =>
        {
            if service.drives_compressor() {
                SessionState::Connect
            } else {
                SessionState::Completed
            }
        }

        (
            SessionState::Inflate {
                target,
                started: true,
                completed: false,
                ..
            },
            ProtocolEvent::PressureReading { psi },
        ) => SessionState::Inflate {
            target,
            current: Some(*psi),
            started: true,
            completed: target > 0 && *psi >= target,
        },

        (
            SessionState::Inflate {
                target,
                current,
                started: true,
                ..
            },
            ProtocolEvent::InflationComplete,
        ) => SessionState::Inflate {
            target,
            current,
            started: true,
            completed: true,
        },

        (state, _) => state,
    }
}
