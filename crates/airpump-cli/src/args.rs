//! Command-line definition.

use airpump_core::TirePosition;
use airpump_core::dot::DotCode;
use clap::{Parser, Subcommand};
use std::convert::Infallible;

/// AirPump kiosk services from a terminal.
#[derive(Parser, Debug)]
#[command(
    name = "airpump",
    version,
    about = "Run AirPump kiosk services headless",
    after_help = "Environment:\n  AIRPUMP_CONFIG  Kiosk configuration file (JSON)\n  RUST_LOG        Log filter (default: info)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List serial ports and mark the one that would be used.
    Ports,

    /// Open the controller link and print its status as JSON.
    Status,

    /// Open the controller link.
    Bootstrap,

    /// Pay for and show the recommended PSI of a tire.
    Tire {
        /// Tire size code, e.g. 205/55R16.
        code: String,
        #[arg(default_value_t = TirePosition::Front, value_parser = parse_position)]
        position: TirePosition,
    },

    /// Pay for and run a tire age check.
    Dot {
        /// Last four digits of the DOT code (WWYY).
        #[arg(value_parser = DotCode::parse)]
        code: DotCode,
    },

    /// Pay for and run an inflation.
    Inflate {
        /// Target pressure in PSI, or a tire code to look it up.
        #[arg(value_parser = parse_target)]
        target: InflateTarget,
        #[arg(default_value_t = TirePosition::Front, value_parser = parse_position)]
        position: TirePosition,
    },

    /// Show recent transactions, newest first.
    History {
        #[arg(
            default_value_t = DEFAULT_HISTORY_LIMIT,
            value_parser = clap::value_parser!(i64).range(1..)
        )]
        limit: i64,
    },
}

const DEFAULT_HISTORY_LIMIT: i64 = 20;

/// What to inflate to: an explicit pressure or a tire code lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum InflateTarget {
    Psi(f64),
    Code(String),
}

fn parse_target(arg: &str) -> Result<InflateTarget, Infallible> {
    Ok(match arg.parse::<f64>() {
        Ok(psi) => InflateTarget::Psi(psi),
        Err(_) => InflateTarget::Code(arg.to_string()),
    })
}

fn parse_position(arg: &str) -> Result<TirePosition, String> {
    match arg.to_ascii_lowercase().as_str() {
        "front" => Ok(TirePosition::Front),
        "rear" => Ok(TirePosition::Rear),
        other => Err(format!("expected `front` or `rear`, got `{other}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    fn parse(line: &str) -> Result<Command, clap::Error> {
        let args = std::iter::once("airpump").chain(line.split_whitespace());
        Cli::try_parse_from(args).map(|cli| cli.command)
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case("ports", Command::Ports)]
    #[case("status", Command::Status)]
    #[case("bootstrap", Command::Bootstrap)]
    #[case("history", Command::History { limit: 20 })]
    #[case("history 5", Command::History { limit: 5 })]
    fn test_simple_commands(#[case] line: &str, #[case] expected: Command) {
        assert_eq!(parse(line).unwrap(), expected);
    }

    #[test]
    fn test_tire_defaults_to_front() {
        assert_eq!(
            parse("tire 205/55R16").unwrap(),
            Command::Tire {
                code: "205/55R16".into(),
                position: TirePosition::Front,
            }
        );
    }

    #[rstest]
    #[case("inflate 32", InflateTarget::Psi(32.0), TirePosition::Front)]
    #[case("inflate 31.5 rear", InflateTarget::Psi(31.5), TirePosition::Rear)]
    #[case(
        "inflate 90/90-14 REAR",
        InflateTarget::Code("90/90-14".into()),
        TirePosition::Rear
    )]
    fn test_inflate_target(
        #[case] line: &str,
        #[case] target: InflateTarget,
        #[case] position: TirePosition,
    ) {
        assert_eq!(parse(line).unwrap(), Command::Inflate { target, position });
    }

    #[test]
    fn test_dot_code_validated() {
        assert!(matches!(parse("dot 0718").unwrap(), Command::Dot { .. }));
        assert!(parse("dot 5918").is_err());
    }

    #[rstest]
    #[case("")]
    #[case("tire")]
    #[case("tire 205/55R16 left")]
    #[case("inflate")]
    #[case("history 0")]
    #[case("history many")]
    #[case("wash")]
    fn test_rejected(#[case] line: &str) {
        assert!(parse(line).is_err());
    }
}
