//! Device protocol for the AirPump kiosk controller.
//!
//! The controller speaks newline-delimited ASCII. The kiosk sends two
//! commands ([`DeviceCommand`]) and interprets whatever comes back through a
//! forgiving, ordered rule table ([`parse_line`]) that turns each line into a
//! [`ProtocolEvent`]. [`LineCodec`] adapts both directions to
//! `tokio_util::codec`.

pub mod codec;
pub mod command;
pub mod event;
pub mod parser;

pub use codec::LineCodec;
pub use command::DeviceCommand;
pub use event::ProtocolEvent;
pub use parser::parse_line;
