use crate::domain::{
    Book, BookId, BorrowError, ReturnError, Transaction, UserId, UserSummary,
    commands::{BorrowBook, ReturnBook},
};
use async_trait::async_trait;
use thiserror::Error;

use super::BoxError;

pub type Result<T> = std::result::Result<T, BoxError>;

/// 取引ビュー
///
/// 表示用に書籍と利用者のスナップショットを非正規化して持つ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionView {
    pub transaction: Transaction,
    pub book: Book,
    pub user: UserSummary,
}

/// 貸出・返却の記録エラー
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Book not found")]
    BookNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Borrow(#[from] BorrowError),

    #[error(transparent)]
    Return(#[from] ReturnError),

    #[error("Ledger backend error")]
    Backend(#[source] BoxError),
}

/// 取引台帳ポート
///
/// 冊数と取引行の唯一の書き手。貸出・返却は書籍の冊数更新と
/// 取引行の挿入/更新を1つの原子的な単位として実行しなければならない。
/// 同じ書籍への並行した貸出が冊数を0未満にしたり、
/// 同じ利用者×書籍の貸出中取引を2件作ったりしてはならない。
#[async_trait]
pub trait TransactionLedger: Send + Sync {
    /// 貸出を記録する（冊数 -1、貸出中取引を作成）
    async fn record_borrow(&self, cmd: BorrowBook) -> std::result::Result<TransactionView, LedgerError>;

    /// 返却を記録する（冊数 +1、取引にreturn_dateを設定）
    async fn record_return(&self, cmd: ReturnBook) -> std::result::Result<TransactionView, LedgerError>;

    /// 利用者の全取引を取得する
    ///
    /// 貸出中を先に、各グループ内は borrow_date の新しい順。
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<TransactionView>>;

    /// 書籍の全取引履歴を取得する（borrow_date の新しい順）
    async fn list_for_book(&self, book_id: BookId) -> Result<Vec<TransactionView>>;
}
