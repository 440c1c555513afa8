pub mod catalog_store;
mod rows;
pub mod transaction_ledger;
pub mod user_store;

// パブリックに型を再エクスポート
pub use catalog_store::CatalogStore as PostgresCatalogStore;
pub use transaction_ledger::TransactionLedger as PostgresTransactionLedger;
pub use user_store::UserStore as PostgresUserStore;
