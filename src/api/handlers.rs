use crate::application::{
    LibraryError, ServiceDependencies,
    auth::{login as execute_login, register as execute_register},
    catalog::{
        ListBooks, create_book as execute_create_book, delete_book as execute_delete_book,
        get_book as execute_get_book, list_books as execute_list_books,
        update_book as execute_update_book,
    },
    lending::{
        borrow_book as execute_borrow_book, list_book_transactions as execute_list_book_transactions,
        list_borrowed_books as execute_list_borrowed_books, return_book as execute_return_book,
    },
};
use crate::domain::{BookId, TransactionStatus, ValidationError, commands::UpdateBook};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    auth::AuthenticatedUser,
    error::ApiError,
    types::{
        AuthResponse, BookResponse, BooksResponse, BorrowedBooksQuery, CreateBookRequest,
        CredentialsRequest, ListBooksQuery, TransactionResponse, UpdateBookRequest,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

fn book_id(path: Result<Path<Uuid>, PathRejection>) -> Result<BookId, ApiError> {
    let Path(id) = path?;
    Ok(BookId::from_uuid(id))
}

fn transactions(views: Vec<crate::ports::TransactionView>) -> Json<Vec<TransactionResponse>> {
    Json(views.into_iter().map(TransactionResponse::from).collect())
}

// ============================================================================
// Auth
// ============================================================================

/// POST /auth/register - 利用者を登録してトークンを発行
pub async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(req) = body?;
    let session = execute_register(&state.service_deps, &req.username, &req.password).await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// POST /auth/login - ログインしてトークンを発行
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(req) = body?;
    let session = execute_login(&state.service_deps, &req.username, &req.password).await?;
    Ok(Json(session.into()))
}

// ============================================================================
// Catalog
// ============================================================================

/// GET /books - 書籍一覧（ページング・検索）
pub async fn list_books(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListBooksQuery>, QueryRejection>,
) -> Result<Json<BooksResponse>, ApiError> {
    let Query(query) = query?;

    let page = execute_list_books(
        &state.service_deps,
        ListBooks {
            page: query.page,
            limit: query.limit,
            search: query.search,
        },
    )
    .await?;

    Ok(Json(page.into()))
}

/// GET /books/:id - 書籍詳細
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = execute_get_book(&state.service_deps, book_id(path)?).await?;
    Ok(Json(book.into()))
}

/// POST /books - 書籍を登録
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(identity): AuthenticatedUser,
    body: Result<Json<CreateBookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    let Json(req) = body?;
    let book = execute_create_book(&state.service_deps, &identity, req.into_command()).await?;
    Ok((StatusCode::CREATED, Json(book.into())))
}

/// PATCH /books/:id - 書誌情報を部分更新
///
/// quantityは変更できない（貸出・返却のみが冊数を変える）。
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(identity): AuthenticatedUser,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateBookRequest>, JsonRejection>,
) -> Result<Json<BookResponse>, ApiError> {
    let book_id = book_id(path)?;
    let Json(req) = body?;

    let cmd = UpdateBook {
        book_id,
        patch: req.into_patch(),
    };
    let book = execute_update_book(&state.service_deps, &identity, cmd).await?;

    Ok(Json(book.into()))
}

/// DELETE /books/:id - 書籍を削除
///
/// 貸出中の取引が残っている場合は409。
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(identity): AuthenticatedUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = execute_delete_book(&state.service_deps, &identity, book_id(path)?).await?;
    Ok(Json(book.into()))
}

// ============================================================================
// Lending
// ============================================================================

/// POST /books/:id/borrow - 書籍を借りる
///
/// 強制されるビジネスルール:
/// - 書籍が存在すること
/// - 貸出可能冊数が1以上であること
/// - 同じ書籍を返却前に再度借りないこと
pub async fn borrow_book(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(identity): AuthenticatedUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<(StatusCode, Json<TransactionResponse>), ApiError> {
    let view = execute_borrow_book(&state.service_deps, &identity, book_id(path)?).await?;
    Ok((StatusCode::CREATED, Json(view.into())))
}

/// POST /books/:id/return - 書籍を返却する
///
/// 呼び出し元自身の貸出中取引のみ返却できる。
pub async fn return_book(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(identity): AuthenticatedUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let view = execute_return_book(&state.service_deps, &identity, book_id(path)?).await?;
    Ok(Json(view.into()))
}

/// GET /books/:id/transactions - 書籍の取引履歴（新しい順）
pub async fn list_book_transactions(
    State(state): State<Arc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<TransactionResponse>>, ApiError> {
    let views = execute_list_book_transactions(&state.service_deps, book_id(path)?).await?;
    Ok(transactions(views))
}

/// GET /user/borrowed-books - 呼び出し元の取引一覧
///
/// クエリパラメータ:
/// - status: active または returned（オプション）
pub async fn list_borrowed_books(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(identity): AuthenticatedUser,
    query: Result<Query<BorrowedBooksQuery>, QueryRejection>,
) -> Result<Json<Vec<TransactionResponse>>, ApiError> {
    let Query(query) = query?;

    let status = query
        .status
        .as_deref()
        .map(str::parse::<TransactionStatus>)
        .transpose()
        .map_err(|msg| LibraryError::Validation(ValidationError::new("status", msg)))?;

    let views = execute_list_borrowed_books(&state.service_deps, &identity, status).await?;
    Ok(transactions(views))
}
