//! Inbound line parser.
//!
//! Device firmware revisions differ in spelling and case, so lines are matched
//! loosely against an ordered rule table; the first rule that produces an
//! event wins:
//!
//! | # | Rule | Event |
//! |---|------|-------|
//! | 1 | contains `PAYMENT COMPLETE` | [`ProtocolEvent::PaymentComplete`] |
//! | 2 | `INSERTED:<n>` | [`ProtocolEvent::PaymentInserted`], `max(0, floor(n))` |
//! | 3 | `PRESSURE:<n>` | [`ProtocolEvent::PressureReading`], `max(0, round(n))` |
//! | 4 | contains `INFLATION COMPLETE`, `INFLATE COMPLETE`, `TARGET REACHED` or `DONE` | [`ProtocolEvent::InflationComplete`] |
//! | - | anything else | [`ProtocolEvent::Unrecognized`] |
//!
//! Matching is case-insensitive and runs on the trimmed line.

use crate::ProtocolEvent;
use regex::Regex;
use std::sync::LazyLock;

/// How a rule recognizes a line.
enum Matcher {
    /// Upper-cased line contains any of the needles.
    ContainsAny(&'static [&'static str]),
    /// Pattern whose first group captures the numeric argument.
    Numeric(Regex),
}

impl Matcher {
    /// Returns `None` when the line does not match, otherwise the captured
    /// argument (empty for substring rules).
    fn capture<'a>(&self, line: &'a str, upper: &str) -> Option<&'a str> {
        match self {
            Matcher::ContainsAny(needles) => needles
                .iter()
                .any(|needle| upper.contains(needle))
                .then_some(""),
            Matcher::Numeric(pattern) => pattern
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str()),
        }
    }
}

struct Rule {
    matcher: Matcher,
    build: fn(&str) -> Option<ProtocolEvent>,
}

fn numeric_rule(verb: &str, build: fn(&str) -> Option<ProtocolEvent>) -> Rule {
    let pattern = format!(r"(?i)^{verb}\s*:\s*(-?\d+(?:\.\d+)?)");
    Rule {
        matcher: Matcher::Numeric(Regex::new(&pattern).expect("built-in pattern is valid")),
        build,
    }
}

/// Parse a captured decimal, rejecting values that overflow to infinity.
fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Clamp to `0..=u32::MAX`; float-to-int `as` saturates.
fn to_count(value: f64) -> u32 {
    value.max(0.0) as u32
}

static RULES: LazyLock<[Rule; 4]> = LazyLock::new(|| {
    [
        Rule {
            matcher: Matcher::ContainsAny(&["PAYMENT COMPLETE"]),
            build: |_| Some(ProtocolEvent::PaymentComplete),
        },
        numeric_rule("INSERTED", |raw| {
            parse_number(raw).map(|n| ProtocolEvent::PaymentInserted {
                amount_so_far: to_count(n.floor()),
            })
        }),
        numeric_rule("PRESSURE", |raw| {
            parse_number(raw).map(|n| ProtocolEvent::PressureReading {
                psi: to_count(n.round()),
            })
        }),
        Rule {
            matcher: Matcher::ContainsAny(&[
                "INFLATION COMPLETE",
                "INFLATE COMPLETE",
                "TARGET REACHED",
                "DONE",
            ]),
            build: |_| Some(ProtocolEvent::InflationComplete),
        },
    ]
});

/// Parse one inbound line. Never fails: unknown input becomes
/// [`ProtocolEvent::Unrecognized`] carrying the trimmed line.
///
/// # Examples
///
/// ```
/// use airpump_protocol::{parse_line, ProtocolEvent};
///
/// assert_eq!(parse_line("inserted: 12.9"), ProtocolEvent::PaymentInserted { amount_so_far: 12 });
/// assert_eq!(parse_line("PRESSURE:31.5\r"), ProtocolEvent::PressureReading { psi: 32 });
/// assert_eq!(parse_line("Payment Complete"), ProtocolEvent::PaymentComplete);
/// assert!(!parse_line("BOOT v1.2").is_recognized());
/// ```
#[must_use]
pub fn parse_line(line: &str) -> ProtocolEvent {
    let line = line.trim();
    let upper = line.to_ascii_uppercase();

    for rule in RULES.iter() {
        if let Some(event) = rule
            .matcher
            .capture(line, &upper)
            .and_then(|arg| (rule.build)(arg))
        {
            return event;
        }
    }

    tracing::trace!(line, "Unrecognized device line");
    ProtocolEvent::Unrecognized {
        raw: line.to_string(),
    }
}
