//! Property-based tests for the device line parser and codec.
//!
//! The parser sits directly on a serial link that can deliver arbitrary
//! bytes, so these tests throw generated input at it and check that it never
//! panics and that numeric rules keep their rounding contracts.

use airpump_protocol::{DeviceCommand, LineCodec, ProtocolEvent, parse_line};
use bytes::BytesMut;
use proptest::prelude::*;
use tokio_util::codec::Decoder;

/// Printable ASCII lines without the keywords any rule looks for.
fn chatter() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9 #=.,_-]{0,60}")
        .expect("Failed to create chatter regex strategy")
        .prop_filter("no keywords", |s| {
            let upper = s.to_ascii_uppercase();
            !["PAYMENT COMPLETE", "INSERTED", "PRESSURE", "COMPLETE", "TARGET REACHED", "DONE"]
                .iter()
                .any(|k| upper.contains(k))
        })
}

proptest! {
    /// Property: arbitrary input never panics the parser.
    #[test]
    fn prop_parse_never_panics(line in any::<String>()) {
        let _ = parse_line(&line);
    }

    /// Property: `INSERTED:<n>` yields `max(0, floor(n))`.
    #[test]
    fn prop_inserted_floors(whole in -1000i64..100_000, frac in 0u32..100) {
        let line = format!("INSERTED:{whole}.{frac:02}");
        let value: f64 = format!("{whole}.{frac:02}").parse().unwrap();
        let expected = value.floor().max(0.0) as u32;
        prop_assert_eq!(parse_line(&line), ProtocolEvent::PaymentInserted { amount_so_far: expected });
    }

    /// Property: `PRESSURE:<n>` yields `max(0, round(n))`.
    #[test]
    fn prop_pressure_rounds(whole in -50i64..200, frac in 0u32..10) {
        let line = format!("pressure : {whole}.{frac}");
        let value: f64 = format!("{whole}.{frac}").parse().unwrap();
        let expected = value.round().max(0.0) as u32;
        prop_assert_eq!(parse_line(&line), ProtocolEvent::PressureReading { psi: expected });
    }

    /// Property: lines matching no rule come back verbatim (trimmed).
    #[test]
    fn prop_chatter_is_unrecognized(line in chatter()) {
        prop_assert_eq!(
            parse_line(&line),
            ProtocolEvent::Unrecognized { raw: line.trim().to_string() }
        );
    }

    /// Property: valid inflate targets always render as a positive integer.
    #[test]
    fn prop_inflate_target_renders(target in 0.5f64..500.0) {
        let command = DeviceCommand::inflate(target).unwrap();
        let line = command.to_line();
        prop_assert!(line.starts_with("INFLATE:"));
        prop_assert!(line.ends_with("\r\n"));
        let n: u32 = line["INFLATE:".len()..line.len() - 2].parse().unwrap();
        prop_assert!(n >= 1);
    }

    /// Property: the decoder never panics and never yields a line longer than
    /// its limit, whatever the byte stream.
    #[test]
    fn prop_decoder_bounded(chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..16)) {
        let mut codec = LineCodec::with_max_length(32);
        let mut buf = BytesMut::new();
        for chunk in chunks {
            buf.extend_from_slice(&chunk);
            loop {
                match codec.decode(&mut buf) {
                    Ok(Some(line)) => prop_assert!(line.len() <= 32 * 3),
                    Ok(None) => break,
                    Err(_) => continue,
                }
            }
        }
    }
}
