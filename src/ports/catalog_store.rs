use crate::domain::{Book, BookId};
use async_trait::async_trait;
use thiserror::Error;

use super::BoxError;

pub type Result<T> = std::result::Result<T, BoxError>;

/// 書籍一覧の検索条件
///
/// pageは1始まり。searchはタイトル・著者名への部分一致（大文字小文字を区別しない）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookQuery {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
}

impl BookQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// 書籍一覧の1ページ分と総件数
#[derive(Debug, Clone)]
pub struct BookPage {
    pub books: Vec<Book>,
    pub total: u64,
}

/// 書籍削除のエラー
#[derive(Debug, Error)]
pub enum DeleteBookError {
    #[error("Book not found")]
    NotFound,

    /// 返却されていない取引が残っている
    #[error("Book has {0} active borrow(s)")]
    HasActiveBorrows(u64),

    #[error("Catalog backend error")]
    Backend(#[source] BoxError),
}

/// カタログストアポート
///
/// 書籍の書誌情報を保持する。冊数（quantity）の変更は
/// TransactionLedgerの貸出・返却のみが行う。
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// 書籍を追加する
    async fn insert(&self, book: Book) -> Result<()>;

    /// IDで書籍を取得する
    async fn get(&self, book_id: BookId) -> Result<Option<Book>>;

    /// 書誌情報（タイトル・著者・ISBN・出版年・表紙・updated_at）を書き換える
    ///
    /// quantityは書き換えない。更新後の最新状態を返し、存在しなければNone。
    async fn update_details(&self, book: &Book) -> Result<Option<Book>>;

    /// 書籍を削除する
    ///
    /// 貸出中の取引があれば拒否する。返却済みの履歴は書籍と共に削除される。
    async fn delete(&self, book_id: BookId) -> std::result::Result<Book, DeleteBookError>;

    /// 書籍一覧を取得する
    ///
    /// 並び順は created_at DESC, id DESC で固定（ページ間で重複・欠落しない）。
    async fn list(&self, query: &BookQuery) -> Result<BookPage>;
}
