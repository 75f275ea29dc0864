//! Service session state machine.
//!
//! Every kiosk service (tire info, DOT check, inflation) runs as one session:
//! pay, then for inflation connect the hose and inflate to target.
//!
//! - [`state`]: [`SessionState`] and the pure [`reduce`] function.
//! - [`session`]: [`Session`], which adds at-most-once command guards,
//!   customer actions, progress and a bounded transition history.
//! - [`driver`]: [`SessionDriver`], which runs a session against the serial
//!   link and records the finished transaction.

pub mod driver;
pub mod error;
pub mod session;
pub mod state;

pub use driver::SessionDriver;
pub use error::{Result, SessionError};
pub use session::{MAX_HISTORY_SIZE, Session, SessionBuilder, StateTransition};
pub use state::{SessionState, reduce};
