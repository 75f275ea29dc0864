use airpump_core::{ServiceKind, TransactionRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// One row of the `transactions` table.
///
/// `id` and `service` are stored as text (`TIRE_INFO`, `DOT_CHECK`,
/// `INFLATION`) so the log stays readable with the `sqlite3` shell.
/// `created_at` is when the row was written, `timestamp` when the service
/// completed; they differ only when a record is written late.
///
/// # Examples
///
/// ```
/// use airpump_core::{ServiceKind, TransactionRecord};
/// use airpump_storage::models::TransactionRow;
///
/// let record = TransactionRecord::new(ServiceKind::DotCheck, 10, Some("DOT 0718".into()));
/// let row = TransactionRow::from(&record);
/// assert_eq!(row.service, "DOT_CHECK");
/// assert_eq!(row.into_record().unwrap(), record);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TransactionRow {
    pub id: String,
    pub service: String,
    pub amount: i64,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<&TransactionRecord> for TransactionRow {
    fn from(record: &TransactionRecord) -> Self {
        Self {
            id: record.id.to_string(),
            service: record.service.as_str().to_string(),
            amount: i64::from(record.amount),
            details: record.details.clone(),
            timestamp: record.timestamp,
        }
    }
}

impl TransactionRow {
    /// Convert back to the domain record.
    ///
    /// # Errors
    /// `StorageError::InvalidRecord` when the id, service or amount stored in
    /// the row is not valid.
    pub fn into_record(self) -> StorageResult<TransactionRecord> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| StorageError::invalid_record(&self.id, e))?;
        let service: ServiceKind = self
            .service
            .parse()
            .map_err(|e| StorageError::invalid_record(&self.id, e))?;
        let amount = u32::try_from(self.amount)
            .map_err(|e| StorageError::invalid_record(&self.id, e))?;

        Ok(TransactionRecord {
            id,
            service,
            amount,
            timestamp: self.timestamp,
            details: self.details,
        })
    }
}
