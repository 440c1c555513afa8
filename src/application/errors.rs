use crate::domain::{BorrowError, ReturnError, ValidationError};
use crate::ports::{BoxError, DeleteBookError, IdentityError, InsertUserError, LedgerError};
use serde::Serialize;
use thiserror::Error;

/// 呼び出し元に返すエラーの分類
///
/// すべての操作はこの分類を持つ`LibraryError`を返す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    Unauthenticated,
    NotFound,
    OutOfStock,
    AlreadyBorrowed,
    NoActiveBorrow,
    ValidationError,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "Unauthenticated",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::OutOfStock => "OutOfStock",
            ErrorKind::AlreadyBorrowed => "AlreadyBorrowed",
            ErrorKind::NoActiveBorrow => "NoActiveBorrow",
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Internal => "Internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum LibraryError {
    /// 認証情報がない・不正
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// 書籍が存在しない
    #[error("Book not found")]
    BookNotFound,

    /// 貸出可能冊数が0
    #[error("Book is out of stock")]
    OutOfStock,

    /// 返却前に同じ書籍を再度借りようとした
    #[error("You have already borrowed this book")]
    AlreadyBorrowed,

    /// 返却対象の貸出中取引がない
    #[error("You have no active borrow for this book")]
    NoActiveBorrow,

    /// 入力値が不正
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// ユーザー名が既に使われている
    #[error("Username is already taken")]
    UsernameTaken,

    /// 貸出中の取引が残っている書籍は削除できない
    #[error("Book has {0} active borrow(s) and cannot be deleted")]
    BookHasActiveBorrows(u64),

    /// CatalogStoreのエラー
    #[error("Catalog store error")]
    CatalogStoreError(#[source] BoxError),

    /// TransactionLedgerのエラー
    #[error("Transaction ledger error")]
    LedgerError(#[source] BoxError),

    /// UserStoreのエラー
    #[error("User store error")]
    UserStoreError(#[source] BoxError),

    /// パスワードハッシュ・トークン発行などの内部エラー
    #[error("Credential processing error")]
    CredentialError(#[source] BoxError),
}

impl LibraryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LibraryError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            LibraryError::BookNotFound => ErrorKind::NotFound,
            LibraryError::OutOfStock => ErrorKind::OutOfStock,
            LibraryError::AlreadyBorrowed => ErrorKind::AlreadyBorrowed,
            LibraryError::NoActiveBorrow => ErrorKind::NoActiveBorrow,
            LibraryError::Validation(_) => ErrorKind::ValidationError,
            LibraryError::UsernameTaken | LibraryError::BookHasActiveBorrows(_) => {
                ErrorKind::Conflict
            }
            LibraryError::CatalogStoreError(_)
            | LibraryError::LedgerError(_)
            | LibraryError::UserStoreError(_)
            | LibraryError::CredentialError(_) => ErrorKind::Internal,
        }
    }
}

impl From<BorrowError> for LibraryError {
    fn from(err: BorrowError) -> Self {
        match err {
            BorrowError::OutOfStock => LibraryError::OutOfStock,
            BorrowError::AlreadyBorrowed => LibraryError::AlreadyBorrowed,
        }
    }
}

impl From<ReturnError> for LibraryError {
    fn from(err: ReturnError) -> Self {
        match err {
            ReturnError::NoActiveBorrow => LibraryError::NoActiveBorrow,
        }
    }
}

impl From<LedgerError> for LibraryError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::BookNotFound => LibraryError::BookNotFound,
            // トークンは有効だが利用者が存在しない
            LedgerError::UserNotFound => {
                LibraryError::Unauthenticated("Unknown user".to_string())
            }
            LedgerError::Borrow(e) => e.into(),
            LedgerError::Return(e) => e.into(),
            LedgerError::Backend(e) => LibraryError::LedgerError(e),
        }
    }
}

impl From<DeleteBookError> for LibraryError {
    fn from(err: DeleteBookError) -> Self {
        match err {
            DeleteBookError::NotFound => LibraryError::BookNotFound,
            DeleteBookError::HasActiveBorrows(n) => LibraryError::BookHasActiveBorrows(n),
            DeleteBookError::Backend(e) => LibraryError::CatalogStoreError(e),
        }
    }
}

impl From<InsertUserError> for LibraryError {
    fn from(err: InsertUserError) -> Self {
        match err {
            InsertUserError::UsernameTaken => LibraryError::UsernameTaken,
            InsertUserError::Backend(e) => LibraryError::UserStoreError(e),
        }
    }
}

impl From<IdentityError> for LibraryError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredential(msg) => LibraryError::Unauthenticated(msg),
            IdentityError::Issue(e) => LibraryError::CredentialError(e),
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LibraryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_errors_map_to_kinds() {
        let cases = [
            (LedgerError::BookNotFound, ErrorKind::NotFound),
            (LedgerError::UserNotFound, ErrorKind::Unauthenticated),
            (LedgerError::Borrow(BorrowError::OutOfStock), ErrorKind::OutOfStock),
            (LedgerError::Borrow(BorrowError::AlreadyBorrowed), ErrorKind::AlreadyBorrowed),
            (LedgerError::Return(ReturnError::NoActiveBorrow), ErrorKind::NoActiveBorrow),
        ];

        for (err, kind) in cases {
            assert_eq!(LibraryError::from(err).kind(), kind);
        }
    }

    #[test]
    fn test_backend_errors_are_internal() {
        let err = LibraryError::from(LedgerError::Backend("boom".into()));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_delete_conflict_kind() {
        let err = LibraryError::from(DeleteBookError::HasActiveBorrows(2));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "Book has 2 active borrow(s) and cannot be deleted");
    }

    #[test]
    fn test_validation_error_kind_and_message() {
        let err = LibraryError::from(ValidationError::new("title", "title is required"));
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(err.to_string(), "title: title is required");
    }
}
