//! One service flow with its guarded side effects.
//!
//! A [`Session`] wraps a [`SessionState`] and adds what the pure reducer
//! cannot know: whether the `PAYMENT` and `INFLATE` commands were already
//! handed out, whether the transaction was already recorded, and the recent
//! transition history.
//!
//! A session is created when a service screen opens and dropped when the
//! customer leaves it. Sessions are not shared; in async code the owning
//! task (usually a [`SessionDriver`](crate::SessionDriver)) holds it.
//!
//! # Examples
//!
//! ```
//! use airpump_core::ServiceKind;
//! use airpump_protocol::{DeviceCommand, ProtocolEvent};
//! use airpump_session::{Session, SessionState};
//!
//! let mut session = Session::builder(ServiceKind::Inflation)
//!     .with_price(30)
//!     .with_target(32.0)
//!     .build();
//!
//! assert_eq!(session.claim_payment_command(), Some(DeviceCommand::payment(30)));
//! assert_eq!(session.claim_payment_command(), None);
//!
//! session.apply(&ProtocolEvent::PaymentComplete);
//! assert_eq!(session.state(), SessionState::Connect);
//!
//! session.confirm_connected().unwrap();
//! let command = session.claim_inflate_command().unwrap();
//! assert_eq!(command, Some(DeviceCommand::Inflate { target_psi: 32 }));
//! session.mark_inflation_started().unwrap();
//!
//! session.apply(&ProtocolEvent::PressureReading { psi: 32 });
//! session.finish().unwrap();
//! assert!(session.take_transaction().is_some());
//! assert!(session.take_transaction().is_none());
//! ```

use airpump_core::{ServiceKind, TransactionRecord};
use airpump_protocol::{DeviceCommand, ProtocolEvent};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::error::{Result, SessionError};
use crate::state::{SessionState, reduce};

/// Maximum number of state transitions kept per session.
///
/// A full inflation flow is a few dozen transitions (one per payment report
/// and pressure reading), so this covers a whole session in practice.
pub const MAX_HISTORY_SIZE: usize = 100;

/// One recorded state change.
///
/// The `timestamp` is process-local and not serialized; deserialized
/// transitions carry the time of deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: SessionState,
    pub to: SessionState,
    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl StateTransition {
    pub fn new(from: SessionState, to: SessionState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// A single service flow.
#[derive(Debug)]
pub struct Session {
    service: ServiceKind,
    price: u32,
    target: Option<f64>,
    details: Option<String>,
    state: SessionState,
    state_entered_at: Instant,
    history: VecDeque<StateTransition>,
    payment_claimed: bool,
    inflate_claimed: bool,
    recorded: bool,
}

impl Session {
    /// Session for `service` priced at `price`.
    ///
    /// A price of zero skips payment: information services start in
    /// `Completed`, inflation starts in `Connect`.
    pub fn new(service: ServiceKind, price: u32) -> Self {
        Self::builder(service).with_price(price).build()
    }

    pub fn builder(service: ServiceKind) -> SessionBuilder {
        SessionBuilder::new(service)
    }

    pub fn service(&self) -> ServiceKind {
        self.service
    }

    pub fn price(&self) -> u32 {
        self.price
    }

    /// Requested inflation target, as entered.
    pub fn target(&self) -> Option<f64> {
        self.target
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn time_in_current_state(&self) -> Duration {
        self.state_entered_at.elapsed()
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// The last `count` transitions, oldest first.
    pub fn last_transitions(&self, count: usize) -> Vec<StateTransition> {
        self.history
            .iter()
            .rev()
            .take(count)
            .rev()
            .cloned()
            .collect()
    }

    /// Feed one device event through the reducer.
    ///
    /// Returns `true` if the state changed.
    pub fn apply(&mut self, event: &ProtocolEvent) -> bool {
        let next = reduce(self.service, self.state, event);
        if next == self.state {
            return false;
        }
        self.enter(next);
        true
    }

    /// The `PAYMENT` command for this session, handed out at most once.
    ///
    /// `None` for free sessions, after payment, and on every call after the
    /// first. The claim sticks even if the caller fails to write the command;
    /// a remount must not charge twice.
    pub fn claim_payment_command(&mut self) -> Option<DeviceCommand> {
        if self.payment_claimed {
            return None;
        }
        match self.state {
            SessionState::Payment { required, .. } if required > 0 => {
                self.payment_claimed = true;
                Some(DeviceCommand::payment(required))
            }
            _ => None,
        }
    }

    /// Customer confirmed the hose is on the valve.
    ///
    /// # Errors
    /// `SessionError::InvalidTransition` outside of `Connect`.
    pub fn confirm_connected(&mut self) -> Result<()> {
        if self.state != SessionState::Connect {
            return Err(SessionError::invalid_transition(
                self.state,
                "confirm connection",
            ));
        }

        let target = self
            .target
            .and_then(|t| DeviceCommand::inflate(t).ok())
            .map_or(0, |command| command.argument());

        self.enter(SessionState::Inflate {
            target,
            current: None,
            started: false,
            completed: false,
        });
        Ok(())
    }

    /// The `INFLATE` command for this session, handed out at most once.
    ///
    /// Returns `Ok(None)` when the command was already claimed.
    ///
    /// # Errors
    /// - `SessionError::InvalidTransition` unless the session is in `Inflate`
    ///   and not yet started.
    /// - `SessionError::InvalidTarget` when the target is missing, not
    ///   finite, or not positive. No command is produced.
    pub fn claim_inflate_command(&mut self) -> Result<Option<DeviceCommand>> {
        if !matches!(self.state, SessionState::Inflate { started: false, .. }) {
            return Err(SessionError::invalid_transition(
                self.state,
                "start inflation",
            ));
        }
        if self.inflate_claimed {
            return Ok(None);
        }

        let target = self.target.unwrap_or(f64::NAN);
        let command =
            DeviceCommand::inflate(target).map_err(|_| SessionError::InvalidTarget(target))?;

        self.inflate_claimed = true;
        Ok(Some(command))
    }

    /// The `INFLATE` command reached the controller.
    ///
    /// # Errors
    /// `SessionError::InvalidTransition` unless the command was claimed and
    /// inflation has not started yet.
    pub fn mark_inflation_started(&mut self) -> Result<()> {
        match self.state {
            SessionState::Inflate {
                target,
                current,
                started: false,
                completed,
            } if self.inflate_claimed => {
                self.enter(SessionState::Inflate {
                    target,
                    current,
                    started: true,
                    completed,
                });
                Ok(())
            }
            state => Err(SessionError::invalid_transition(state, "mark inflation started")),
        }
    }

    /// Customer leaves a finished inflation.
    ///
    /// # Errors
    /// `SessionError::InvalidTransition` unless inflation completed.
    pub fn finish(&mut self) -> Result<()> {
        if !self.state.is_inflation_done() {
            return Err(SessionError::invalid_transition(self.state, "finish"));
        }
        self.enter(SessionState::Completed);
        Ok(())
    }

    /// Inflation progress in percent, `None` outside of `Inflate`.
    pub fn progress_percent(&self) -> Option<u8> {
        self.state.progress_percent()
    }

    /// Transaction for a finished session, handed out exactly once.
    pub fn take_transaction(&mut self) -> Option<TransactionRecord> {
        if self.recorded || !self.is_terminal() {
            return None;
        }
        self.recorded = true;
        Some(TransactionRecord::new(
            self.service,
            self.price,
            self.details.clone(),
        ))
    }

    fn enter(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(&next),
            "illegal transition {} -> {}",
            self.state,
            next
        );

        tracing::debug!(
            service = %self.service,
            from = %self.state,
            to = %next,
            "Session transition"
        );

        self.history.push_back(StateTransition::new(self.state, next));
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.state = next;
        self.state_entered_at = Instant::now();
    }
}

/// Builder for [`Session`].
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    service: ServiceKind,
    price: u32,
    target: Option<f64>,
    details: Option<String>,
}

impl SessionBuilder {
    fn new(service: ServiceKind) -> Self {
        Self {
            service,
            price: 0,
            target: None,
            details: None,
        }
    }

    pub fn with_price(mut self, price: u32) -> Self {
        self.price = price;
        self
    }

    /// Inflation target in PSI; only used by inflation sessions.
    pub fn with_target(mut self, psi: f64) -> Self {
        self.target = Some(psi);
        self
    }

    /// Summary stored with the transaction, e.g. `205/55R16 (front)`.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn build(self) -> Session {
        Session {
            service: self.service,
            price: self.price,
            target: self.target,
            details: self.details,
            state: SessionState::initial(self.service, self.price),
            state_entered_at: Instant::now(),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            payment_claimed: false,
            inflate_claimed: false,
            recorded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn inflation(target: f64) -> Session {
        let mut session = Session::builder(ServiceKind::Inflation)
            .with_price(30)
            .with_target(target)
            .build();
        session.apply(&ProtocolEvent::PaymentComplete);
        session.confirm_connected().unwrap();
        session
    }

    fn started(target: f64) -> Session {
        let mut session = inflation(target);
        session.claim_inflate_command().unwrap();
        session.mark_inflation_started().unwrap();
        session
    }

    #[test]
    fn test_new_session_starts_in_payment() {
        let session = Session::new(ServiceKind::TireInfo, 10);
        assert_eq!(
            session.state(),
            SessionState::Payment {
                required: 10,
                inserted: 0
            }
        );
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_free_session_never_claims_payment() {
        let mut session = Session::new(ServiceKind::DotCheck, 0);
        assert!(session.is_terminal());
        assert_eq!(session.claim_payment_command(), None);
    }

    #[test]
    fn test_free_inflation_starts_at_connect() {
        let mut session = Session::builder(ServiceKind::Inflation)
            .with_target(30.0)
            .build();
        assert_eq!(session.state(), SessionState::Connect);
        assert_eq!(session.claim_payment_command(), None);
        assert!(session.take_transaction().is_none());

        session.confirm_connected().unwrap();
        assert_eq!(
            session.claim_inflate_command().unwrap(),
            Some(DeviceCommand::Inflate { target_psi: 30 })
        );
    }

    #[test]
    fn test_payment_claimed_once() {
        let mut session = Session::new(ServiceKind::TireInfo, 10);
        assert_eq!(
            session.claim_payment_command(),
            Some(DeviceCommand::payment(10))
        );
        for _ in 0..5 {
            assert_eq!(session.claim_payment_command(), None);
        }
    }

    #[test]
    fn test_apply_reports_change() {
        let mut session = Session::new(ServiceKind::TireInfo, 10);
        assert!(session.apply(&ProtocolEvent::PaymentInserted { amount_so_far: 5 }));
        assert!(!session.apply(&ProtocolEvent::PaymentInserted { amount_so_far: 5 }));
        assert!(!session.apply(&ProtocolEvent::Unrecognized { raw: "?".into() }));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_confirm_connected_only_from_connect() {
        let mut session = Session::new(ServiceKind::Inflation, 30);
        let err = session.confirm_connected().unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { .. }));
    }

    #[test]
    fn test_confirm_connected_rounds_target() {
        let session = inflation(31.6);
        assert_eq!(
            session.state(),
            SessionState::Inflate {
                target: 32,
                current: None,
                started: false,
                completed: false,
            }
        );
    }

    #[rstest]
    #[case(0.0)]
    #[case(-5.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    #[case(0.2)]
    fn test_invalid_target_suppresses_command(#[case] target: f64) {
        let mut session = inflation(target);
        let err = session.claim_inflate_command().unwrap_err();
        assert!(matches!(err, SessionError::InvalidTarget(_)));

        // Nothing was claimed, so inflation cannot be marked as started.
        assert!(session.mark_inflation_started().is_err());
    }

    #[test]
    fn test_missing_target_is_invalid() {
        let mut session = Session::new(ServiceKind::Inflation, 30);
        session.apply(&ProtocolEvent::PaymentComplete);
        session.confirm_connected().unwrap();
        assert!(matches!(
            session.claim_inflate_command(),
            Err(SessionError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_inflate_claimed_once() {
        let mut session = inflation(32.0);
        assert!(session.claim_inflate_command().unwrap().is_some());
        assert!(session.claim_inflate_command().unwrap().is_none());

        session.mark_inflation_started().unwrap();
        assert!(session.claim_inflate_command().is_err());
    }

    #[test]
    fn test_mark_started_requires_claim() {
        let mut session = inflation(32.0);
        assert!(session.mark_inflation_started().is_err());
    }

    #[test]
    fn test_progress_percent() {
        let mut session = started(32.0);
        assert_eq!(session.progress_percent(), Some(0));

        session.apply(&ProtocolEvent::PressureReading { psi: 16 });
        assert_eq!(session.progress_percent(), Some(50));

        session.apply(&ProtocolEvent::PressureReading { psi: 40 });
        assert_eq!(session.progress_percent(), Some(100));
    }

    #[test]
    fn test_progress_outside_inflate() {
        assert_eq!(Session::new(ServiceKind::Inflation, 30).progress_percent(), None);
    }

    #[test]
    fn test_finish_requires_completed_inflation() {
        let mut session = started(32.0);
        assert!(session.finish().is_err());

        session.apply(&ProtocolEvent::InflationComplete);
        session.finish().unwrap();
        assert!(session.is_terminal());
    }

    #[test]
    fn test_transaction_taken_once_when_terminal() {
        let mut session = Session::builder(ServiceKind::TireInfo)
            .with_price(10)
            .with_details("205/55R16 (front)")
            .build();
        assert!(session.take_transaction().is_none());

        session.apply(&ProtocolEvent::PaymentComplete);
        let record = session.take_transaction().unwrap();
        assert_eq!(record.service, ServiceKind::TireInfo);
        assert_eq!(record.amount, 10);
        assert_eq!(record.details.as_deref(), Some("205/55R16 (front)"));

        assert!(session.take_transaction().is_none());
    }

    #[test]
    fn test_history_bounded() {
        let mut session = Session::new(ServiceKind::TireInfo, 10_000);
        for amount in 1..=(MAX_HISTORY_SIZE as u32 + 20) {
            session.apply(&ProtocolEvent::PaymentInserted {
                amount_so_far: amount,
            });
        }
        assert_eq!(session.history().len(), MAX_HISTORY_SIZE);

        let last = session.last_transitions(1);
        assert_eq!(
            last[0].to,
            SessionState::Payment {
                required: 10_000,
                inserted: MAX_HISTORY_SIZE as u32 + 20
            }
        );
    }
}
