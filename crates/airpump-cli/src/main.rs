//! `airpump`: run the AirPump kiosk services from a terminal.
//!
//! Useful on the bench with a controller board attached, and on a deployed
//! kiosk over SSH to check the link and the transaction log.

mod args;
mod flows;

use airpump_core::KioskConfig;
use airpump_serial::{Platform, list_ports, select_port};
use airpump_storage::TransactionRepository;
use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Command};
use crate::flows::{Kiosk, wait_for_enter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let command = Cli::parse().command;

    let config = KioskConfig::from_env().context("loading kiosk configuration")?;
    tracing::info!(version = airpump_core::VERSION, "Starting airpump");

    if command == Command::Ports {
        return ports();
    }

    let kiosk = Kiosk::new(config).await?;
    let result = run(&kiosk, command).await;

    kiosk.manager.close().await;
    kiosk.db.close().await;
    result
}

async fn run(kiosk: &Kiosk, command: Command) -> Result<()> {
    match command {
        Command::Status => {
            kiosk.bootstrap().await;
            let status = kiosk.manager.status();
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Bootstrap => match kiosk.bootstrap().await {
            Some(handle) => println!("Connected to {} at {} baud", handle.path, handle.baud_rate),
            None => anyhow::bail!("no controller found"),
        },
        Command::Tire { code, position } => kiosk.tire_info(&code, position).await?,
        Command::Dot { code } => kiosk.dot_check(code).await?,
        Command::Inflate { target, position } => {
            kiosk.inflate(target, position, wait_for_enter()).await?;
        }
        Command::History { limit } => {
            for record in kiosk.repo.find_recent(limit).await? {
                println!(
                    "{}  {:<10} {:>4}  {}",
                    record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    record.service.as_str(),
                    record.amount,
                    record.details.as_deref().unwrap_or("")
                );
            }
        }
        Command::Ports => {}
    }
    Ok(())
}

fn ports() -> Result<()> {
    let ports = list_ports();
    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }

    let selected = select_port(&ports, Platform::current());
    for port in &ports {
        let marker = if selected.as_deref() == Some(port.path.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {:<20} {}",
            port.path,
            port.vendor_id.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
