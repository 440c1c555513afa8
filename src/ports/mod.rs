pub mod catalog_store;
pub mod identity_provider;
pub mod transaction_ledger;
pub mod user_store;

pub use catalog_store::{BookPage, BookQuery, CatalogStore, DeleteBookError};
pub use identity_provider::{AccessToken, IdentityError, IdentityProvider};
pub use transaction_ledger::{LedgerError, TransactionLedger, TransactionView};
pub use user_store::{InsertUserError, UserStore};

/// ポート共通のバックエンドエラー
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
