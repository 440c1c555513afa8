use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::ports::BoxError;

/// Argon2でパスワードをハッシュ化する（PHC文字列）
pub(super) fn hash_password(password: &str) -> Result<String, BoxError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| format!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// 保存済みハッシュとパスワードを照合する
pub(super) fn verify_password(password: &str, password_hash: &str) -> Result<bool, BoxError> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| format!("Invalid password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
