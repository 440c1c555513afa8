use crate::ports::{CatalogStore, IdentityProvider, TransactionLedger, UserStore};
use std::sync::Arc;

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞い（メソッド）は持たず、各ユースケース関数に依存関係を渡す。
///
/// メモリ実装では同じストアを3つのポートに渡し、
/// PostgreSQL実装では同じコネクションプールを共有する。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub catalog_store: Arc<dyn CatalogStore>,
    pub transaction_ledger: Arc<dyn TransactionLedger>,
    pub user_store: Arc<dyn UserStore>,
    pub identity_provider: Arc<dyn IdentityProvider>,
}
