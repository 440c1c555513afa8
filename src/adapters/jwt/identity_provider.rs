use crate::domain::{Identity, UserId};
use crate::ports::identity_provider::{
    AccessToken, IdentityError, IdentityProvider as IdentityProviderTrait,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// アクセストークンのクレーム
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    /// 利用者ID
    sub: Uuid,
    username: String,
    iat: i64,
    exp: i64,
}

/// HS256署名のJWTによるIdentityProvider実装
pub struct IdentityProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl IdentityProvider {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::default();
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }
}

impl IdentityProviderTrait for IdentityProvider {
    fn issue(&self, identity: &Identity) -> Result<AccessToken, IdentityError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| IdentityError::Issue("token expiry out of range".into()))?;
        let claims = Claims {
            sub: identity.user_id.value(),
            username: identity.username.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map(AccessToken)
            .map_err(|e| IdentityError::Issue(Box::new(e)))
    }

    fn verify(&self, token: &str) -> Result<Identity, IdentityError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| IdentityError::InvalidCredential(e.to_string()))?;

        Ok(Identity {
            user_id: UserId::from_uuid(data.claims.sub),
            username: data.claims.username,
        })
    }
}
