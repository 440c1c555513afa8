use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{UserId, ValidationError};

/// ユーザー名の最小文字数
pub const MIN_USERNAME_LEN: usize = 3;
/// ユーザー名の最大文字数
pub const MAX_USERNAME_LEN: usize = 50;
/// パスワードの最小文字数
pub const MIN_PASSWORD_LEN: usize = 6;

/// 利用者
///
/// password_hashはArgon2のPHC文字列。外部へは出さない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// 取引表示用の利用者スナップショット
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
}

/// 認証済みの呼び出し元
///
/// ベアラートークンから得られ、各操作に明示的に渡される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
}

/// 検証済みユーザー名（前後の空白を除去）
pub fn validate_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();
    let len = trimmed.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(ValidationError::new(
            "username",
            format!(
                "Username must be between {} and {} characters",
                MIN_USERNAME_LEN, MAX_USERNAME_LEN
            ),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::new(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}
