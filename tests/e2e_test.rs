use axum::body::Body;
use axum::http::{Request, StatusCode};
use library_lending::api::handlers::AppState;
use library_lending::api::router::create_router;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

mod common;

// ============================================================================
// E2Eテスト用のヘルパー関数
// ============================================================================

/// メモリストアと実際のAPIルーターでアプリケーションを作成
fn setup_e2e_app() -> axum::Router {
    let (service_deps, _) = common::memory_deps();
    create_router(Arc::new(AppState { service_deps }))
}

/// リクエストを送り、ステータスとJSONボディを返す
async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, json)
}

/// 利用者を登録してアクセストークンを返す
async fn register(app: &axum::Router, username: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": username, "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    body["access_token"].as_str().unwrap().to_string()
}

async fn create_book(app: &axum::Router, token: &str, title: &str, quantity: i64) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/books",
        Some(token),
        Some(json!({
            "title": title,
            "author": "Frank Herbert",
            "isbn": "9780441013593",
            "publicationYear": 1965,
            "quantity": quantity,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    body
}

// ============================================================================
// 正常系フロー
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = setup_e2e_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn test_e2e_full_lending_flow() {
    let app = setup_e2e_app();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    let book = create_book(&app, &alice, "Dune", 1).await;
    let book_id = book["id"].as_str().unwrap();
    assert_eq!(book["quantity"], 1);
    assert_eq!(book["publicationYear"], 1965);
    assert!(book["coverImage"].is_null());

    // alice が借りる
    let (status, borrowed) =
        send(&app, "POST", &format!("/books/{}/borrow", book_id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(borrowed["returnDate"].is_null());
    assert_eq!(borrowed["bookId"], book_id);
    assert_eq!(borrowed["book"]["quantity"], 0);
    assert_eq!(borrowed["user"]["username"], "alice");

    // bob は在庫切れ
    let (status, err) =
        send(&app, "POST", &format!("/books/{}/borrow", book_id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["kind"], "OutOfStock");

    // alice が返却
    let (status, returned) =
        send(&app, "POST", &format!("/books/{}/return", book_id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(returned["id"], borrowed["id"]);
    assert!(returned["returnDate"].is_string());
    assert_eq!(returned["book"]["quantity"], 1);

    // 2回目の返却は失敗
    let (status, err) =
        send(&app, "POST", &format!("/books/{}/return", book_id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["kind"], "NoActiveBorrow");

    // bob が借りられる
    let (status, second) =
        send(&app, "POST", &format!("/books/{}/borrow", book_id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(second["id"], borrowed["id"]);

    // 書籍の取引履歴（新しい順）
    let (status, history) =
        send(&app, "GET", &format!("/books/{}/transactions", book_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["id"], second["id"]);

    // 利用者ごとの一覧
    let (_, mine) = send(&app, "GET", "/user/borrowed-books", Some(&alice), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (_, active) =
        send(&app, "GET", "/user/borrowed-books?status=active", Some(&alice), None).await;
    assert!(active.as_array().unwrap().is_empty());

    let (_, active) =
        send(&app, "GET", "/user/borrowed-books?status=active", Some(&bob), None).await;
    assert_eq!(active.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_e2e_already_borrowed() {
    let app = setup_e2e_app();
    let alice = register(&app, "alice").await;
    let book = create_book(&app, &alice, "Dune", 3).await;
    let uri = format!("/books/{}/borrow", book["id"].as_str().unwrap());

    let (status, _) = send(&app, "POST", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, err) = send(&app, "POST", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["kind"], "AlreadyBorrowed");
}

// ============================================================================
// 認証
// ============================================================================

#[tokio::test]
async fn test_e2e_login() {
    let app = setup_e2e_app();
    register(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());
    assert_eq!(body["user"]["username"], "alice");

    let (status, wrong_password) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown_user) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "nobody", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password["message"], unknown_user["message"]);
}

#[tokio::test]
async fn test_e2e_register_validation_and_conflict() {
    let app = setup_e2e_app();
    register(&app, "alice").await;

    let (status, err) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": "ALICE", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["kind"], "Conflict");

    let (status, err) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": "carol", "password": "123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["kind"], "ValidationError");
}

#[tokio::test]
async fn test_e2e_requires_bearer_token() {
    let app = setup_e2e_app();
    let alice = register(&app, "alice").await;
    let book = create_book(&app, &alice, "Dune", 1).await;
    let uri = format!("/books/{}/borrow", book["id"].as_str().unwrap());

    let (status, err) = send(&app, "POST", &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["kind"], "Unauthenticated");

    let (status, _) = send(&app, "POST", &uri, Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/books",
        None,
        Some(json!({ "title": "x", "author": "y", "isbn": "z", "publicationYear": 2000 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// カタログ
// ============================================================================

#[tokio::test]
async fn test_e2e_list_books_pagination() {
    let app = setup_e2e_app();
    let alice = register(&app, "alice").await;
    for i in 0..15 {
        create_book(&app, &alice, &format!("Book {:02}", i), 1).await;
    }

    let (status, page1) = send(&app, "GET", "/books?page=1&limit=10", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, page2) = send(&app, "GET", "/books?page=2&limit=10", None, None).await;

    assert_eq!(page1["data"].as_array().unwrap().len(), 10);
    assert_eq!(page2["data"].as_array().unwrap().len(), 5);
    assert_eq!(page1["pagination"]["total"], 15);
    assert_eq!(page1["pagination"]["pages"], 2);
    assert_eq!(page2["pagination"]["page"], 2);

    let (status, err) = send(&app, "GET", "/books?limit=0", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["kind"], "ValidationError");

    let (status, _) = send(&app, "GET", "/books?page=abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, found) = send(&app, "GET", "/books?search=BOOK%2007", None, None).await;
    assert_eq!(found["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_e2e_create_book_validation() {
    let app = setup_e2e_app();
    let alice = register(&app, "alice").await;

    let (status, err) = send(
        &app,
        "POST",
        "/books",
        Some(&alice),
        Some(json!({ "title": "Old", "author": "A", "isbn": "1", "publicationYear": 999 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["kind"], "ValidationError");

    let (status, _) = send(
        &app,
        "POST",
        "/books",
        Some(&alice),
        Some(json!({ "title": "Neg", "author": "A", "isbn": "1", "publicationYear": 2000, "quantity": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 必須フィールドの欠落（JSONの形が不正）
    let (status, err) = send(&app, "POST", "/books", Some(&alice), Some(json!({ "title": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["kind"], "ValidationError");

    // quantity省略時は1冊
    let (status, book) = send(
        &app,
        "POST",
        "/books",
        Some(&alice),
        Some(json!({ "title": "Emma", "author": "Jane Austen", "isbn": "1", "publicationYear": 1815 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(book["quantity"], 1);
}

#[tokio::test]
async fn test_e2e_create_book_rejects_multipart_form() {
    let app = setup_e2e_app();
    let alice = register(&app, "alice").await;

    let boundary = "----library-lending";
    let form = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nDune\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri("/books")
        .header("authorization", format!("Bearer {}", alice))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(form))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let err: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(err["kind"], "ValidationError");

    let (_, page) = send(&app, "GET", "/books", None, None).await;
    assert_eq!(page["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_e2e_get_update_delete_book() {
    let app = setup_e2e_app();
    let alice = register(&app, "alice").await;
    let (_, book) = send(
        &app,
        "POST",
        "/books",
        Some(&alice),
        Some(json!({
            "title": "Dune",
            "author": "Frank Herbert",
            "isbn": "9780441013593",
            "publicationYear": 1965,
            "quantity": 2,
            "coverImage": "covers/dune.png",
        })),
    )
    .await;
    let uri = format!("/books/{}", book["id"].as_str().unwrap());

    let (status, fetched) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["coverImage"], "covers/dune.png");

    // coverImage: null で表紙を外す。quantityは変更されない
    let (status, updated) = send(
        &app,
        "PATCH",
        &uri,
        Some(&alice),
        Some(json!({ "title": "Dune Messiah", "coverImage": null, "quantity": 99 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Dune Messiah");
    assert_eq!(updated["author"], "Frank Herbert");
    assert!(updated["coverImage"].is_null());
    assert_eq!(updated["quantity"], 2);

    // 貸出中は削除できない
    let (status, _) = send(&app, "POST", &format!("{}/borrow", uri), Some(&alice), None).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, err) = send(&app, "DELETE", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["kind"], "Conflict");

    let (status, _) = send(&app, "POST", &format!("{}/return", uri), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, deleted) = send(&app, "DELETE", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["id"], book["id"]);

    let (status, err) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["kind"], "NotFound");
}

#[tokio::test]
async fn test_e2e_invalid_book_id() {
    let app = setup_e2e_app();

    let (status, err) = send(&app, "GET", "/books/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["kind"], "ValidationError");

    let (status, _) = send(
        &app,
        "GET",
        &format!("/books/{}/transactions", uuid::Uuid::new_v4()),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_e2e_invalid_status_filter() {
    let app = setup_e2e_app();
    let alice = register(&app, "alice").await;

    let (status, err) =
        send(&app, "GET", "/user/borrowed-books?status=overdue", Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["kind"], "ValidationError");
}
