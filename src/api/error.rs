use crate::application::{ErrorKind, LibraryError};
use crate::domain::ValidationError;
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub struct ApiError(LibraryError);

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        self.0.kind()
    }
}

impl From<LibraryError> for ApiError {
    fn from(err: LibraryError) -> Self {
        ApiError(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError(LibraryError::Validation(err))
    }
}

// 不正なJSON・クエリ・パスはすべて400 ValidationErrorとして返す
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ValidationError::new("body", rejection.body_text()).into()
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ValidationError::new("query", rejection.body_text()).into()
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ValidationError::new("id", rejection.body_text()).into()
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::NotFound | ErrorKind::NoActiveBorrow => StatusCode::NOT_FOUND,
        ErrorKind::OutOfStock | ErrorKind::AlreadyBorrowed | ErrorKind::Conflict => {
            StatusCode::CONFLICT
        }
        ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();

        let message = match kind {
            // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
            ErrorKind::Internal => {
                match std::error::Error::source(&self.0) {
                    Some(source) => tracing::error!("{}: {}", self.0, source),
                    None => tracing::error!("{}", self.0),
                }
                "An unexpected error occurred".to_string()
            }
            _ => self.0.to_string(),
        };

        let body = Json(ErrorResponse::new(kind, message));
        (status_for(kind), body).into_response()
    }
}
