use crate::domain::User;
use async_trait::async_trait;
use thiserror::Error;

use super::BoxError;

pub type Result<T> = std::result::Result<T, BoxError>;

/// 利用者登録のエラー
#[derive(Debug, Error)]
pub enum InsertUserError {
    #[error("Username is already taken")]
    UsernameTaken,

    #[error("User store backend error")]
    Backend(#[source] BoxError),
}

/// 利用者ストアポート
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 利用者を登録する。ユーザー名は一意。
    async fn insert(&self, user: User) -> std::result::Result<(), InsertUserError>;

    /// ユーザー名で検索する（大文字小文字を区別しない）
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
}
