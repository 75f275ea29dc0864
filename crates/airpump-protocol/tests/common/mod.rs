//! Shared helpers for protocol integration tests.

use airpump_protocol::{LineCodec, ProtocolEvent, parse_line};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Decode a raw device transcript into events, the way the serial reader does.
pub fn decode_transcript(raw: &[u8]) -> Vec<ProtocolEvent> {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::from(raw);
    let mut events = Vec::new();
    while let Some(line) = codec
        .decode_eof(&mut buf)
        .expect("transcript lines fit the default limit")
    {
        events.push(parse_line(&line));
    }
    events
}

/// Keep only events that a session reacts to.
pub fn recognized(events: Vec<ProtocolEvent>) -> Vec<ProtocolEvent> {
    events.into_iter().filter(ProtocolEvent::is_recognized).collect()
}
