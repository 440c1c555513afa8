use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;

use crate::application::{LibraryError, auth};
use crate::domain::Identity;

use super::{error::ApiError, handlers::AppState};

/// Authorizationヘッダーのベアラートークンから得た呼び出し元
///
/// ハンドラーの引数に置くと認証必須になる。
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

fn unauthenticated(message: &str) -> ApiError {
    LibraryError::Unauthenticated(message.to_string()).into()
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| unauthenticated("Missing authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| unauthenticated("Invalid authorization header format"))?;

        let identity = auth::authenticate(&state.service_deps, token)?;

        Ok(AuthenticatedUser(identity))
    }
}
