//! Headless service flows: what the kiosk screens do, driven from a
//! terminal.

use airpump_core::dot::DotCode;
use airpump_core::tire::PsiTable;
use airpump_core::{KioskConfig, ServiceKind, TirePosition};
use airpump_serial::discovery::SystemPorts;
use airpump_serial::{Bootstrapper, ConnectionHandle, ConnectionManager, NativeOpener, PortOpener};
use airpump_session::{Session, SessionDriver, SessionState};
use airpump_storage::{Database, DatabaseConfig, SqliteTransactionRepository};
use anyhow::{Context, Result, bail};
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::args::InflateTarget;

/// Everything a service flow needs.
pub struct Kiosk<O: PortOpener = NativeOpener> {
    pub config: KioskConfig,
    pub manager: Arc<ConnectionManager<O>>,
    pub repo: SqliteTransactionRepository,
    pub db: Database,
    pub tires: PsiTable,
}

impl Kiosk {
    pub async fn new(config: KioskConfig) -> Result<Self> {
        let manager = Arc::new(
            ConnectionManager::new().with_settle_delay(config.serial.settle_delay()),
        );
        Self::with_manager(config, manager).await
    }
}

impl<O: PortOpener> Kiosk<O> {
    pub async fn with_manager(
        config: KioskConfig,
        manager: Arc<ConnectionManager<O>>,
    ) -> Result<Self> {
        let db = match &config.database_path {
            Some(path) => Database::new(DatabaseConfig::new(path.clone()))
                .await
                .with_context(|| format!("opening transaction log {path}"))?,
            None => {
                tracing::warn!("No database_path configured, transactions are not persisted");
                Database::in_memory().await?
            }
        };
        let repo = SqliteTransactionRepository::new(db.pool().clone());
        let tires = PsiTable::with_custom(&config.tire_codes);

        Ok(Self {
            config,
            manager,
            repo,
            db,
            tires,
        })
    }

    pub async fn bootstrap(&self) -> Option<ConnectionHandle> {
        Bootstrapper::new(self.manager.clone(), SystemPorts)
            .with_settings(&self.config.serial)
            .run()
            .await
    }

    async fn require_link(&self) -> Result<ConnectionHandle> {
        self.bootstrap()
            .await
            .context("no controller found; check the USB cable and `airpump ports`")
    }

    pub async fn tire_info(&self, code: &str, position: TirePosition) -> Result<()> {
        // Look the code up before taking money for it.
        let psi = self.tires.recommended_psi(code, position)?;

        let session = Session::builder(ServiceKind::TireInfo)
            .with_price(self.config.prices.total_for(ServiceKind::TireInfo))
            .with_details(format!("{} ({position})", code.trim()))
            .build();
        self.run_paid(session).await?;

        println!("{} ({position}): {psi} PSI", code.trim());
        Ok(())
    }

    pub async fn dot_check(&self, code: DotCode) -> Result<()> {
        if !self.config.services.dot_check_enabled {
            bail!("DOT check is disabled on this kiosk");
        }

        let session = Session::builder(ServiceKind::DotCheck)
            .with_price(self.config.prices.total_for(ServiceKind::DotCheck))
            .with_details(format!("DOT {code}"))
            .build();
        self.run_paid(session).await?;

        let report = code.report();
        if report.future {
            println!("DOT {code}: manufacture date is in the future, check the code");
        } else {
            println!(
                "DOT {code}: week {}, {} - {:.1} years old - {}",
                report.week, report.year, report.age_years, report.status
            );
        }
        Ok(())
    }

    /// Run an inflation. `hose_connected` resolves once the customer has
    /// attached the hose; it is only awaited after payment.
    pub async fn inflate<C>(
        &self,
        target: InflateTarget,
        position: TirePosition,
        hose_connected: C,
    ) -> Result<()>
    where
        C: Future<Output = Result<()>>,
    {
        let (psi, details) = match target {
            InflateTarget::Psi(psi) => (psi, format!("{psi} PSI")),
            InflateTarget::Code(code) => {
                let psi = self.tires.recommended_psi(&code, position)?;
                (f64::from(psi), format!("{} ({position})", code.trim()))
            }
        };
        self.require_link().await?;

        let session = Session::builder(ServiceKind::Inflation)
            .with_price(self.config.prices.total_for(ServiceKind::Inflation))
            .with_target(psi)
            .with_details(details)
            .build();

        let mut lines = self.manager.subscribe();
        let mut driver = SessionDriver::new(session, self.manager.clone(), self.repo.clone());
        let progress = spawn_progress(&driver);

        driver.begin().await?;
        let state = self
            .interruptible(driver.run_until(&mut lines, |s| {
                !matches!(s, SessionState::Payment { .. })
            }))
            .await?;

        if state == SessionState::Connect {
            println!("Connect the hose to the valve, then press Enter");
            self.interruptible(hose_connected).await??;
            driver.confirm_connected()?;
            driver.start_inflation().await?;
        }

        let state = self.interruptible(driver.run(lines)).await?;
        drop(driver);
        let _ = progress.await;

        if state.is_terminal() {
            println!("Inflation complete, disconnect the hose");
            Ok(())
        } else {
            bail!("session ended in {state}")
        }
    }

    async fn run_paid(&self, session: Session) -> Result<()> {
        if session.price() > 0 {
            self.require_link().await?;
        }

        let lines = self.manager.subscribe();
        let mut driver = SessionDriver::new(session, self.manager.clone(), self.repo.clone());
        let progress = spawn_progress(&driver);

        driver.begin().await?;
        let state = self.interruptible(driver.run(lines)).await?;
        drop(driver);
        let _ = progress.await;

        if !state.is_terminal() {
            bail!("session ended in {state}");
        }
        Ok(())
    }

    /// Run `work` until it finishes, the link drops or the operator hits
    /// Ctrl-C.
    ///
    /// A disconnect only counts if a link was open when `work` started; free
    /// services run without one.
    async fn interruptible<F: Future>(&self, work: F) -> Result<F::Output> {
        let mut status = self.manager.watch_status();
        let linked = status.borrow().is_open;
        let disconnected = async move {
            if linked {
                let _ = status.wait_for(|s| !s.is_open).await;
            } else {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            biased;
            output = work => Ok(output),
            () = disconnected => bail!("controller disconnected"),
            _ = tokio::signal::ctrl_c() => bail!("interrupted"),
        }
    }
}

/// Print every state change until the driver goes away.
fn spawn_progress<S, O>(driver: &SessionDriver<S, O>) -> tokio::task::JoinHandle<()>
where
    S: airpump_core::TransactionSink,
    O: PortOpener,
{
    let mut states = driver.watch();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            match state {
                SessionState::Payment { required, inserted } => {
                    println!("Inserted {inserted} of {required}");
                }
                SessionState::Inflate {
                    target,
                    current: Some(current),
                    ..
                } => {
                    let percent = state.progress_percent().unwrap_or(0);
                    println!("{current} / {target} PSI ({percent}%)");
                }
                other => println!("{other}"),
            }
        }
    })
}

/// Wait for the operator to press Enter.
pub async fn wait_for_enter() -> Result<()> {
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("reading confirmation from stdin")?;
    Ok(())
}
