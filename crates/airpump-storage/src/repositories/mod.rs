pub mod transaction;

pub use transaction::{SqliteTransactionRepository, TransactionRepository};
