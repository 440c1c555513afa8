//! PostgreSQLアダプターのテスト
//!
//! DATABASE_URL のデータベースが必要なため `#[ignore]` を付けている。
//! `cargo test -- --ignored` で実行する。

use futures::future::join_all;
use library_lending::adapters::postgres::{
    PostgresCatalogStore, PostgresTransactionLedger, PostgresUserStore,
};
use library_lending::application::catalog::{self, ListBooks};
use library_lending::application::lending::{borrow_book, list_borrowed_books, return_book};
use library_lending::application::{ErrorKind, ServiceDependencies, auth};
use library_lending::domain::BookId;
use serial_test::serial;
use sqlx::PgPool;
use std::sync::Arc;

mod common;

async fn setup(pool: &PgPool) -> ServiceDependencies {
    common::cleanup_database(pool).await;

    ServiceDependencies {
        catalog_store: Arc::new(PostgresCatalogStore::new(pool.clone())),
        transaction_ledger: Arc::new(PostgresTransactionLedger::new(pool.clone())),
        user_store: Arc::new(PostgresUserStore::new(pool.clone())),
        identity_provider: common::identity_provider(),
    }
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_borrow_and_return_round_trip() {
    let pool = common::create_test_pool().await;
    let deps = setup(&pool).await;
    let alice = common::add_user(&deps, "alice").await;
    let book = common::add_book(&deps, &alice, "Dune", 1).await;

    let borrowed = borrow_book(&deps, &alice, book.id).await.unwrap();
    assert_eq!(borrowed.book.quantity.value(), 0);
    assert_eq!(borrowed.user.username, "alice");

    let err = borrow_book(&deps, &alice, book.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyBorrowed);

    let returned = return_book(&deps, &alice, book.id).await.unwrap();
    assert_eq!(returned.transaction.core().id, borrowed.transaction.core().id);
    assert!(returned.transaction.return_date().is_some());
    assert_eq!(returned.book.quantity.value(), 1);

    let err = return_book(&deps, &alice, book.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoActiveBorrow);

    let current = catalog::get_book(&deps, book.id).await.unwrap();
    assert_eq!(current.quantity.value(), 1);

    let history = list_borrowed_books(&deps, &alice, None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].book.id, book.id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
#[ignore]
async fn test_concurrent_borrows_never_overbook() {
    let pool = common::create_test_pool().await;
    let deps = setup(&pool).await;
    let owner = common::add_user(&deps, "owner").await;
    let book = common::add_book(&deps, &owner, "Popular", 2).await;

    let mut users = Vec::new();
    for i in 0..10 {
        users.push(common::add_user(&deps, &format!("reader-{}", i)).await);
    }

    let book_id = book.id;
    let handles = users.into_iter().map(|user| {
        let deps = deps.clone();
        tokio::spawn(async move { borrow_book(&deps, &user, book_id).await })
    });

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.kind() == ErrorKind::OutOfStock)
    );

    let current = catalog::get_book(&deps, book.id).await.unwrap();
    assert_eq!(current.quantity.value(), 0);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_borrow_unknown_book() {
    let pool = common::create_test_pool().await;
    let deps = setup(&pool).await;
    let alice = common::add_user(&deps, "alice").await;

    let err = borrow_book(&deps, &alice, BookId::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_list_books_pagination_and_search() {
    let pool = common::create_test_pool().await;
    let deps = setup(&pool).await;
    let alice = common::add_user(&deps, "alice").await;
    for i in 0..15 {
        common::add_book(&deps, &alice, &format!("Book {:02}", i), 1).await;
    }
    common::add_book(&deps, &alice, "100% Pure", 1).await;

    let page1 = catalog::list_books(
        &deps,
        ListBooks {
            page: Some(1),
            limit: Some(10),
            search: Some("book".to_string()),
        },
    )
    .await
    .unwrap();
    let page2 = catalog::list_books(
        &deps,
        ListBooks {
            page: Some(2),
            limit: Some(10),
            search: Some("book".to_string()),
        },
    )
    .await
    .unwrap();

    assert_eq!(page1.books.len(), 10);
    assert_eq!(page2.books.len(), 5);
    assert_eq!(page1.pagination.total, 15);
    assert_eq!(page1.pagination.pages, 2);
    assert!(page1.books.iter().all(|b| !page2.books.iter().any(|o| o.id == b.id)));

    // % はワイルドカードではなく文字として扱う
    let percent = catalog::list_books(
        &deps,
        ListBooks {
            search: Some("%".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(percent.pagination.total, 1);
    assert_eq!(percent.books[0].title, "100% Pure");
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_delete_book_blocked_while_borrowed() {
    let pool = common::create_test_pool().await;
    let deps = setup(&pool).await;
    let alice = common::add_user(&deps, "alice").await;
    let book = common::add_book(&deps, &alice, "Dune", 1).await;

    borrow_book(&deps, &alice, book.id).await.unwrap();
    let err = catalog::delete_book(&deps, &alice, book.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    return_book(&deps, &alice, book.id).await.unwrap();
    catalog::delete_book(&deps, &alice, book.id).await.unwrap();

    let err = catalog::get_book(&deps, book.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(list_borrowed_books(&deps, &alice, None).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_register_and_login_with_postgres() {
    let pool = common::create_test_pool().await;
    let deps = setup(&pool).await;

    let session = auth::register(&deps, "Alice", "password123").await.unwrap();
    assert_eq!(session.user.username, "Alice");

    let err = auth::register(&deps, "alice", "password123").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let login = auth::login(&deps, "alice", "password123").await.unwrap();
    assert_eq!(login.user.id, session.user.id);

    let identity = auth::authenticate(&deps, &login.access_token.0).unwrap();
    assert_eq!(identity.user_id, session.user.id);
}
