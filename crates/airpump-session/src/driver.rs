//! Connects a [`Session`] to the serial link and the transaction log.
//!
//! The driver owns the session, writes its commands through the
//! [`ConnectionManager`], feeds it the lines the controller sends back and
//! publishes every state on a `watch` channel for the screen to render.
//! When the session finishes the transaction is recorded exactly once.

use airpump_core::TransactionSink;
use airpump_protocol::{DeviceCommand, parse_line};
use airpump_serial::{ConnectionManager, LineSubscription, NativeOpener, PortOpener};
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::Result;
use crate::session::Session;
use crate::state::SessionState;

/// Runs one session against the controller.
///
/// # Examples
///
/// ```no_run
/// use airpump_core::{MemorySink, ServiceKind};
/// use airpump_serial::ConnectionManager;
/// use airpump_session::{Session, SessionDriver};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let manager = Arc::new(ConnectionManager::new());
/// manager.open_with_fallback("/dev/ttyUSB0", &[115_200, 9_600]).await?;
///
/// let lines = manager.subscribe();
/// let mut driver = SessionDriver::new(
///     Session::new(ServiceKind::TireInfo, 10),
///     manager,
///     MemorySink::new(),
/// );
///
/// driver.begin().await?;
/// let state = driver.run(lines).await;
/// println!("session ended in {state}");
/// # Ok(())
/// # }
/// ```
pub struct SessionDriver<S: TransactionSink, O: PortOpener = NativeOpener> {
    session: Session,
    manager: Arc<ConnectionManager<O>>,
    sink: S,
    state: watch::Sender<SessionState>,
}

impl<S: TransactionSink, O: PortOpener> SessionDriver<S, O> {
    pub fn new(session: Session, manager: Arc<ConnectionManager<O>>, sink: S) -> Self {
        let (state, _) = watch::channel(session.state());
        Self {
            session,
            manager,
            sink,
            state,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Receiver that sees every state the session goes through.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Start the session: request payment, or record a free service.
    ///
    /// Calling it again never sends a second `PAYMENT` command.
    ///
    /// # Errors
    /// `SessionError::Serial` when the command could not be written. The
    /// failure is logged and the state is left as is.
    pub async fn begin(&mut self) -> Result<()> {
        if let Some(command) = self.session.claim_payment_command() {
            self.send(command).await?;
        }
        self.record_if_finished().await;
        Ok(())
    }

    /// Feed one raw line from the controller into the session.
    pub async fn handle_line(&mut self, line: &str) -> SessionState {
        let event = parse_line(line);
        if !event.is_recognized() {
            tracing::trace!(line, "Ignoring unrecognized line");
            return self.state();
        }

        if self.session.apply(&event) {
            if self.session.state().is_inflation_done() {
                if let Err(e) = self.session.finish() {
                    tracing::debug!(error = %e, "Inflation done but session not finished");
                }
            }
            self.publish();
            self.record_if_finished().await;
        }
        self.state()
    }

    /// Customer confirmed the hose is connected.
    ///
    /// # Errors
    /// `SessionError::InvalidTransition` outside of `Connect`.
    pub fn confirm_connected(&mut self) -> Result<()> {
        self.session.confirm_connected()?;
        self.publish();
        Ok(())
    }

    /// Customer pressed start: send `INFLATE` once.
    ///
    /// Returns `true` if the command was written by this call.
    ///
    /// # Errors
    /// - `SessionError::InvalidTarget` when the target is unusable; nothing
    ///   is sent.
    /// - `SessionError::InvalidTransition` when not ready to inflate.
    /// - `SessionError::Serial` when the write failed; the session stays
    ///   not started and the command is not offered again.
    pub async fn start_inflation(&mut self) -> Result<bool> {
        let command = match self.session.claim_inflate_command() {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(false),
            Err(e) => {
                tracing::warn!(error = %e, "Inflation not started");
                return Err(e);
            }
        };

        self.send(command).await?;
        self.session.mark_inflation_started()?;
        self.publish();
        Ok(true)
    }

    /// Consume lines until the session is finished or the link goes away.
    pub async fn run(&mut self, mut lines: LineSubscription) -> SessionState {
        self.run_until(&mut lines, SessionState::is_terminal).await
    }

    /// Consume lines until `done` holds for the current state or the link
    /// goes away.
    ///
    /// Used by flows that need a customer action in between, e.g. run until
    /// `Connect`, confirm, start inflation, then run to the end.
    pub async fn run_until<F>(&mut self, lines: &mut LineSubscription, done: F) -> SessionState
    where
        F: Fn(&SessionState) -> bool,
    {
        while !done(&self.state()) {
            let Some(line) = lines.recv().await else {
                tracing::warn!(state = %self.state(), "Line stream ended before session finished");
                break;
            };
            self.handle_line(&line).await;
        }
        self.state()
    }

    async fn send(&self, command: DeviceCommand) -> Result<()> {
        match self.manager.write_command(command).await {
            Ok(()) => {
                tracing::info!(service = %self.session.service(), %command, "Command sent");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    service = %self.session.service(),
                    %command,
                    error = %e,
                    "Failed to send command"
                );
                Err(e.into())
            }
        }
    }

    fn publish(&self) {
        self.state.send_replace(self.session.state());
    }

    async fn record_if_finished(&mut self) {
        let Some(record) = self.session.take_transaction() else {
            return;
        };

        match self.sink.record(&record).await {
            Ok(()) => tracing::info!(
                id = %record.id,
                service = %record.service,
                amount = record.amount,
                "Transaction recorded"
            ),
            Err(e) => tracing::error!(
                id = %record.id,
                service = %record.service,
                error = %e,
                "Failed to record transaction"
            ),
        }
    }
}
