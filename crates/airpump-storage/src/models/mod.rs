pub mod transaction;

pub use transaction::TransactionRow;
