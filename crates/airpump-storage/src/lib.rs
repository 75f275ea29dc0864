//! Transaction log for the AirPump kiosk.
//!
//! Every finished service (paid or free) is appended to a SQLite table so
//! the operator can review what was sold. The session layer writes
//! through the [`TransactionSink`](airpump_core::TransactionSink) trait,
//! which [`SqliteTransactionRepository`] implements.
//!
//! - [`Database`]: connection pool with WAL and embedded migrations.
//! - [`TransactionRepository`]: append and query.
//!
//! # Examples
//!
//! ```no_run
//! use airpump_core::{ServiceKind, TransactionRecord};
//! use airpump_storage::{Database, DatabaseConfig, SqliteTransactionRepository, TransactionRepository};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("airpump.db")).await?;
//! let repo = SqliteTransactionRepository::new(db.pool().clone());
//!
//! repo.create(&TransactionRecord::new(ServiceKind::Inflation, 30, None)).await?;
//! for record in repo.find_recent(10).await? {
//!     println!("{} {} {}", record.timestamp, record.service, record.amount);
//! }
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;

pub use connection::{DEFAULT_DATABASE_PATH, Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
pub use models::TransactionRow;
pub use repositories::{SqliteTransactionRepository, TransactionRepository};
