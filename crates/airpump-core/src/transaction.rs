use crate::ServiceKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::future::Future;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// A completed (paid or free) service, as written to the transaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub service: ServiceKind,
    pub amount: u32,
    pub timestamp: DateTime<Utc>,
    /// Free-form summary such as `205/55R16 (front)` or `DOT 0718`.
    pub details: Option<String>,
}

impl TransactionRecord {
    /// New record stamped with a fresh id and the current time.
    #[must_use]
    pub fn new(service: ServiceKind, amount: u32, details: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            service,
            amount,
            timestamp: Utc::now(),
            details,
        }
    }
}

/// Destination for completed transactions.
///
/// Implemented by the SQLite repository in `airpump-storage` and by
/// [`MemorySink`] for tests and for kiosks running without a database.
pub trait TransactionSink: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn record(
        &self,
        record: &TransactionRecord,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// In-memory sink; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<TransactionRecord>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<TransactionRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TransactionSink for MemorySink {
    type Error = Infallible;

    async fn record(&self, record: &TransactionRecord) -> Result<(), Infallible> {
        let mut records = match self.records.lock() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.push(record.clone());
        Ok(())
    }
}
