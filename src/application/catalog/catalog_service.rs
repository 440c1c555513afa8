use crate::domain::{
    self, Book, BookDetails, BookId, DEFAULT_QUANTITY, Identity, Quantity, ValidationError,
    commands::{CreateBook, UpdateBook},
};
use crate::ports::BookQuery;
use chrono::Utc;

use super::super::{LibraryError, Result, ServiceDependencies};

/// 既定のページ番号
pub const DEFAULT_PAGE: u32 = 1;
/// 既定の1ページあたり件数
pub const DEFAULT_LIMIT: u32 = 10;
/// 1ページあたり件数の上限
pub const MAX_LIMIT: u32 = 100;

/// 書籍一覧の問い合わせ（未検証）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListBooks {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

/// ページ情報
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        Self {
            page,
            limit,
            total,
            pages: total.div_ceil(u64::from(limit.max(1))),
        }
    }
}

/// 書籍一覧の1ページ分
#[derive(Debug, Clone)]
pub struct BooksPage {
    pub books: Vec<Book>,
    pub pagination: Pagination,
}

fn validate_query(query: ListBooks) -> std::result::Result<BookQuery, ValidationError> {
    let page = query.page.unwrap_or(DEFAULT_PAGE);
    if page < 1 {
        return Err(ValidationError::new("page", "Page must be at least 1"));
    }

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(ValidationError::new(
            "limit",
            format!("Limit must be between 1 and {}", MAX_LIMIT),
        ));
    }

    let search = query
        .search
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(BookQuery {
        page,
        limit,
        search,
    })
}

/// 書籍一覧を取得する
///
/// 並び順は登録日時の新しい順で固定。
/// `search`はタイトル・著者名への部分一致（大文字小文字を区別しない）。
///
/// # エラー
/// - Validation: page < 1、または limit が 1..=100 の範囲外
pub async fn list_books(deps: &ServiceDependencies, query: ListBooks) -> Result<BooksPage> {
    let query = validate_query(query)?;

    let page = deps
        .catalog_store
        .list(&query)
        .await
        .map_err(LibraryError::CatalogStoreError)?;

    Ok(BooksPage {
        books: page.books,
        pagination: Pagination::new(query.page, query.limit, page.total),
    })
}

/// 書籍を1件取得する
pub async fn get_book(deps: &ServiceDependencies, book_id: BookId) -> Result<Book> {
    deps.catalog_store
        .get(book_id)
        .await
        .map_err(LibraryError::CatalogStoreError)?
        .ok_or(LibraryError::BookNotFound)
}

/// 書籍を登録する
///
/// quantity省略時は1冊。冊数は登録時にのみ指定できる。
#[tracing::instrument(skip(deps, identity, cmd), fields(user_id = %identity.user_id))]
pub async fn create_book(
    deps: &ServiceDependencies,
    identity: &Identity,
    cmd: CreateBook,
) -> Result<Book> {
    let details = BookDetails::new(
        &cmd.title,
        &cmd.author,
        &cmd.isbn,
        cmd.publication_year,
        cmd.cover_image.as_deref(),
    )?;
    let quantity = match cmd.quantity {
        Some(quantity) => Quantity::try_from(quantity)?,
        None => Quantity::new(DEFAULT_QUANTITY),
    };

    let book = domain::create_book(details, quantity, Utc::now());

    deps.catalog_store
        .insert(book.clone())
        .await
        .map_err(LibraryError::CatalogStoreError)?;

    tracing::info!(book_id = %book.id, quantity = book.quantity.value(), "Book created");

    Ok(book)
}

/// 書誌情報を更新する
///
/// 指定されたフィールドのみ変更する。冊数は変更できない。
/// 空の更新は何も書き込まず現在の状態を返す。
#[tracing::instrument(skip(deps, identity, cmd), fields(user_id = %identity.user_id, book_id = %cmd.book_id))]
pub async fn update_book(
    deps: &ServiceDependencies,
    identity: &Identity,
    cmd: UpdateBook,
) -> Result<Book> {
    let current = get_book(deps, cmd.book_id).await?;
    if cmd.patch.is_empty() {
        return Ok(current);
    }

    let updated = domain::update_book(&current, cmd.patch, Utc::now())?;

    // 読み取り後に削除された場合はNone
    let saved = deps
        .catalog_store
        .update_details(&updated)
        .await
        .map_err(LibraryError::CatalogStoreError)?
        .ok_or(LibraryError::BookNotFound)?;

    tracing::info!("Book updated");

    Ok(saved)
}

/// 書籍を削除する
///
/// # エラー
/// - BookNotFound: 書籍が存在しない
/// - BookHasActiveBorrows: 返却されていない取引が残っている
#[tracing::instrument(skip(deps, identity), fields(user_id = %identity.user_id))]
pub async fn delete_book(
    deps: &ServiceDependencies,
    identity: &Identity,
    book_id: BookId,
) -> Result<Book> {
    let book = deps
        .catalog_store
        .delete(book_id)
        .await
        .map_err(LibraryError::from)
        .inspect_err(|e| tracing::warn!(error = %e, "Delete rejected"))?;

    tracing::info!("Book deleted");

    Ok(book)
}
