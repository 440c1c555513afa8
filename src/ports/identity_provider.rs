use crate::domain::Identity;
use thiserror::Error;

use super::BoxError;

/// 認証情報のエラー
#[derive(Debug, Error)]
pub enum IdentityError {
    /// トークンが不正・期限切れ・署名不一致
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Failed to issue credential")]
    Issue(#[source] BoxError),
}

/// 発行済みのベアラートークン
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(pub String);

/// 認証プロバイダーポート
///
/// 与えられたベアラートークンから利用者の身元を得る。
/// 貸出サービスはここで得た身元を信頼する。
pub trait IdentityProvider: Send + Sync {
    /// 身元に対するトークンを発行する
    fn issue(&self, identity: &Identity) -> Result<AccessToken, IdentityError>;

    /// トークンを検証し身元を返す
    fn verify(&self, token: &str) -> Result<Identity, IdentityError>;
}
