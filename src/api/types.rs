use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::application::ErrorKind;
use crate::application::auth::AuthSession;
use crate::application::catalog::{BooksPage, Pagination};
use crate::domain::{Book, BookPatch, UserSummary, commands::CreateBook};
use crate::ports::TransactionView;

// ============================================================================
// Requests
// ============================================================================

/// POST /auth/register, POST /auth/login
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// POST /books
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_year: i32,
    pub quantity: Option<i64>,
    pub cover_image: Option<String>,
}

impl CreateBookRequest {
    pub fn into_command(self) -> CreateBook {
        CreateBook {
            title: self.title,
            author: self.author,
            isbn: self.isbn,
            publication_year: self.publication_year,
            quantity: self.quantity,
            cover_image: self.cover_image,
        }
    }
}

/// PATCH /books/:id
///
/// 省略したフィールドは変更しない。`coverImage: null`は表紙を外す。
/// quantityは受け付けない（未知のフィールドとして無視される）。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publication_year: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub cover_image: Option<Option<String>>,
}

impl UpdateBookRequest {
    pub fn into_patch(self) -> BookPatch {
        BookPatch {
            title: self.title,
            author: self.author,
            isbn: self.isbn,
            publication_year: self.publication_year,
            cover_image: self.cover_image,
        }
    }
}

/// フィールドの省略（None）と明示的なnull（Some(None)）を区別する
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// GET /books のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct ListBooksQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

/// GET /user/borrowed-books のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct BorrowedBooksQuery {
    /// active または returned
    pub status: Option<String>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_year: i32,
    pub quantity: u32,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id.value(),
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            publication_year: book.publication_year.value(),
            quantity: book.quantity.value(),
            cover_image: book.cover_image,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
}

impl From<UserSummary> for UserResponse {
    fn from(user: UserSummary) -> Self {
        Self {
            id: user.id.value(),
            username: user.username,
        }
    }
}

/// 取引レスポンス（書籍・利用者のスナップショット付き）
///
/// returnDateがnullなら貸出中。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub borrow_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub book: BookResponse,
    pub user: UserResponse,
}

impl From<TransactionView> for TransactionResponse {
    fn from(view: TransactionView) -> Self {
        let return_date = view.transaction.return_date();
        let core = view.transaction.core();

        Self {
            id: core.id.value(),
            book_id: core.book_id.value(),
            user_id: core.user_id.value(),
            borrow_date: core.borrow_date,
            return_date,
            created_at: core.created_at,
            updated_at: core.updated_at,
            book: view.book.into(),
            user: view.user.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginationResponse {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl From<Pagination> for PaginationResponse {
    fn from(p: Pagination) -> Self {
        Self {
            page: p.page,
            limit: p.limit,
            total: p.total,
            pages: p.pages,
        }
    }
}

/// GET /books
#[derive(Debug, Serialize)]
pub struct BooksResponse {
    pub data: Vec<BookResponse>,
    pub pagination: PaginationResponse,
}

impl From<BooksPage> for BooksResponse {
    fn from(page: BooksPage) -> Self {
        Self {
            data: page.books.into_iter().map(BookResponse::from).collect(),
            pagination: page.pagination.into(),
        }
    }
}

/// POST /auth/register, POST /auth/login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: UserResponse,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            access_token: session.access_token.0,
            user: session.user.into(),
        }
    }
}

/// エラーレスポンス
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
