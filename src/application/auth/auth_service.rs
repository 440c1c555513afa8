use crate::domain::{
    Identity, User, UserId, UserSummary,
    user::{validate_password, validate_username},
};
use crate::ports::{AccessToken, BoxError};
use chrono::Utc;

use super::super::{LibraryError, Result, ServiceDependencies};
use super::password;

/// ログイン不能時のメッセージ（利用者の有無を区別しない）
const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// 発行済みトークンと利用者
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: AccessToken,
    pub user: UserSummary,
}

/// Argon2はCPUを占有するためブロッキングスレッドで実行する
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> std::result::Result<T, BoxError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| LibraryError::CredentialError(Box::new(e)))?
        .map_err(LibraryError::CredentialError)
}

fn issue_session(deps: &ServiceDependencies, user: &User) -> Result<AuthSession> {
    let identity = Identity {
        user_id: user.id,
        username: user.username.clone(),
    };
    let access_token = deps.identity_provider.issue(&identity)?;

    Ok(AuthSession {
        access_token,
        user: user.summary(),
    })
}

/// 利用者を登録し、トークンを発行する
///
/// # エラー
/// - Validation: ユーザー名が3〜50文字でない、パスワードが6文字未満
/// - UsernameTaken: 同じユーザー名（大文字小文字を区別しない）が既に存在する
#[tracing::instrument(skip(deps, password))]
pub async fn register(
    deps: &ServiceDependencies,
    username: &str,
    password: &str,
) -> Result<AuthSession> {
    let username = validate_username(username)?;
    validate_password(password)?;

    let plain = password.to_string();
    let password_hash = run_blocking(move || password::hash_password(&plain)).await?;

    let now = Utc::now();
    let user = User {
        id: UserId::new(),
        username,
        password_hash,
        created_at: now,
        updated_at: now,
    };

    deps.user_store.insert(user.clone()).await?;

    tracing::info!(user_id = %user.id, "User registered");

    issue_session(deps, &user)
}

/// ユーザー名とパスワードでログインする
///
/// 利用者が存在しない場合とパスワード不一致は同じエラーを返す。
#[tracing::instrument(skip(deps, password))]
pub async fn login(deps: &ServiceDependencies, username: &str, password: &str) -> Result<AuthSession> {
    let user = deps
        .user_store
        .find_by_username(username.trim())
        .await
        .map_err(LibraryError::UserStoreError)?
        .ok_or_else(|| LibraryError::Unauthenticated(INVALID_CREDENTIALS.to_string()))?;

    let plain = password.to_string();
    let hash = user.password_hash.clone();
    let matches = run_blocking(move || password::verify_password(&plain, &hash)).await?;

    if !matches {
        tracing::warn!(user_id = %user.id, "Login failed");
        return Err(LibraryError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
    }

    issue_session(deps, &user)
}

/// ベアラートークンを検証し、呼び出し元の身元を返す
pub fn authenticate(deps: &ServiceDependencies, token: &str) -> Result<Identity> {
    let token = token.trim();
    if token.is_empty() {
        return Err(LibraryError::Unauthenticated("Missing token".to_string()));
    }
    Ok(deps.identity_provider.verify(token)?)
}
