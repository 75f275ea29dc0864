#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::TransactionRow;
use airpump_core::{ServiceKind, TransactionRecord, TransactionSink};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Repository trait for the transaction log.
///
/// The log is append-only: there is no update or delete.
pub trait TransactionRepository: Send + Sync {
    /// Append a record. Writing the same id twice is an error.
    async fn create(&self, record: &TransactionRecord) -> StorageResult<()>;

    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<TransactionRecord>>;

    /// Most recent records first.
    async fn find_recent(&self, limit: i64) -> StorageResult<Vec<TransactionRecord>>;

    /// Most recent records of one service first.
    async fn find_by_service(
        &self,
        service: ServiceKind,
        limit: i64,
    ) -> StorageResult<Vec<TransactionRecord>>;

    /// Records with `start <= timestamp < end`, oldest first.
    async fn find_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<TransactionRecord>>;

    async fn count(&self) -> StorageResult<i64>;
}

/// SQLite implementation of [`TransactionRepository`].
///
/// Also a [`TransactionSink`], so session drivers can write to it directly.
#[derive(Debug, Clone)]
pub struct SqliteTransactionRepository {
    pool: SqlitePool,
}

impl SqliteTransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn into_records(rows: Vec<TransactionRow>) -> StorageResult<Vec<TransactionRecord>> {
    rows.into_iter().map(TransactionRow::into_record).collect()
}

impl TransactionRepository for SqliteTransactionRepository {
    async fn create(&self, record: &TransactionRecord) -> StorageResult<()> {
        let row = TransactionRow::from(record);
        sqlx::query(
            r#"
            INSERT INTO transactions (id, service, amount, details, timestamp)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.service)
        .bind(row.amount)
        .bind(&row.details)
        .bind(row.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<TransactionRecord>> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, service, amount, details, timestamp
            FROM transactions
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TransactionRow::into_record).transpose()
    }

    async fn find_recent(&self, limit: i64) -> StorageResult<Vec<TransactionRecord>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, service, amount, details, timestamp
            FROM transactions
            ORDER BY timestamp DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        into_records(rows)
    }

    async fn find_by_service(
        &self,
        service: ServiceKind,
        limit: i64,
    ) -> StorageResult<Vec<TransactionRecord>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, service, amount, details, timestamp
            FROM transactions
            WHERE service = ?
            ORDER BY timestamp DESC
            LIMIT ?
            "#,
        )
        .bind(service.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        into_records(rows)
    }

    async fn find_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<TransactionRecord>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, service, amount, details, timestamp
            FROM transactions
            WHERE timestamp >= ? AND timestamp < ?
            ORDER BY timestamp ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        into_records(rows)
    }

    async fn count(&self) -> StorageResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

impl TransactionSink for SqliteTransactionRepository {
    type Error = StorageError;

    async fn record(&self, record: &TransactionRecord) -> StorageResult<()> {
        self.create(record).await
    }
}
