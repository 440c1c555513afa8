use thiserror::Error;

/// 入力値の検証エラー
///
/// どのフィールドが不正かをメッセージと共に保持する。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// 貸出のエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BorrowError {
    /// 貸出可能冊数が0
    #[error("Book is out of stock")]
    OutOfStock,
    /// 同じ利用者が同じ書籍を返却前に再度借りようとした
    #[error("Book is already borrowed by this user")]
    AlreadyBorrowed,
}

/// 返却のエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReturnError {
    /// 利用者とこの書籍の組み合わせに貸出中の取引がない
    #[error("No active borrow for this book")]
    NoActiveBorrow,
}
