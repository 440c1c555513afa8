use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, borrow_book, create_book, delete_book, get_book, list_book_transactions,
    list_books, list_borrowed_books, login, register, return_book, update_book,
};

/// Creates the API router with all catalog, lending and auth endpoints
///
/// Auth:
/// - POST /auth/register
/// - POST /auth/login
///
/// Catalog:
/// - GET /books, POST /books (auth)
/// - GET /books/:id, PATCH /books/:id (auth), DELETE /books/:id (auth)
///
/// Lending:
/// - POST /books/:id/borrow (auth)
/// - POST /books/:id/return (auth)
/// - GET /books/:id/transactions
/// - GET /user/borrowed-books (auth)
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/:id",
            get(get_book).patch(update_book).delete(delete_book),
        )
        .route("/books/:id/borrow", post(borrow_book))
        .route("/books/:id/return", post(return_book))
        .route("/books/:id/transactions", get(list_book_transactions))
        .route("/user/borrowed-books", get(list_borrowed_books))
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
