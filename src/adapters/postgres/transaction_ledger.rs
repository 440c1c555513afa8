use crate::domain::{
    BookId, BorrowError, Transaction, UserId, UserSummary,
    commands::{BorrowBook, ReturnBook},
    transaction,
};
use crate::ports::BoxError;
use crate::ports::transaction_ledger::{
    LedgerError, Result, TransactionLedger as TransactionLedgerTrait, TransactionView,
};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use sqlx::{PgConnection, PgPool, Row};

use super::rows::{
    BOOK_COLUMNS, TRANSACTION_VIEW_SELECT, map_row_to_book, map_row_to_transaction,
    map_row_to_transaction_view, quantity_to_db,
};

fn backend(e: sqlx::Error) -> LedgerError {
    LedgerError::Backend(Box::new(e))
}

/// 貸出中取引の部分一意インデックス違反か
fn is_active_borrow_conflict(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            db.is_unique_violation() && db.constraint() == Some("idx_transactions_active_borrow")
        }
        _ => false,
    }
}

/// TransactionLedgerのPostgreSQL実装
///
/// 貸出・返却は1つのDBトランザクション内で実行する。
/// 書籍行を SELECT ... FOR UPDATE でロックするため、同じ書籍への
/// 並行した貸出・返却は直列化される。利用者×書籍の貸出中取引の一意性は
/// 部分一意インデックスでも保証する。
pub struct TransactionLedger {
    pool: PgPool,
}

impl TransactionLedger {
    /// PostgreSQLコネクションプールから新しいTransactionLedgerを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 書籍行をロックして取得し、利用者と貸出中取引も読み込む
    async fn load_for_update(
        conn: &mut PgConnection,
        book_id: BookId,
        user_id: UserId,
    ) -> std::result::Result<(crate::domain::Book, UserSummary, Option<Transaction>), LedgerError>
    {
        let row = sqlx::query(&format!(
            "SELECT {} FROM books WHERE id = $1 FOR UPDATE",
            BOOK_COLUMNS
        ))
        .bind(book_id.value())
        .fetch_optional(&mut *conn)
        .await
        .map_err(backend)?
        .ok_or(LedgerError::BookNotFound)?;
        let book = map_row_to_book(&row).map_err(LedgerError::Backend)?;

        let username: String = sqlx::query("SELECT username FROM users WHERE id = $1")
            .bind(user_id.value())
            .fetch_optional(&mut *conn)
            .await
            .map_err(backend)?
            .ok_or(LedgerError::UserNotFound)?
            .try_get("username")
            .map_err(backend)?;

        let active = sqlx::query(
            r#"
            SELECT id, book_id, user_id, borrow_date, return_date, created_at, updated_at
            FROM transactions
            WHERE book_id = $1 AND user_id = $2 AND return_date IS NULL
            "#,
        )
        .bind(book_id.value())
        .bind(user_id.value())
        .fetch_optional(&mut *conn)
        .await
        .map_err(backend)?
        .as_ref()
        .map(map_row_to_transaction)
        .transpose()
        .map_err(LedgerError::Backend)?;

        let user = UserSummary {
            id: user_id,
            username,
        };

        Ok((book, user, active))
    }

    async fn update_quantity(
        conn: &mut PgConnection,
        book: &crate::domain::Book,
    ) -> std::result::Result<(), LedgerError> {
        sqlx::query("UPDATE books SET quantity = $2, updated_at = $3 WHERE id = $1")
            .bind(book.id.value())
            .bind(quantity_to_db(book.quantity).map_err(LedgerError::Backend)?)
            .bind(book.updated_at)
            .execute(&mut *conn)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn fetch_views(&self, filter: &str, id: uuid::Uuid, order: &str) -> Result<Vec<TransactionView>> {
        let sql = format!("{} WHERE {} ORDER BY {}", TRANSACTION_VIEW_SELECT, filter, order);

        sqlx::query(&sql)
            .bind(id)
            .fetch(&self.pool)
            .map(|row| {
                row.map_err(|e| Box::new(e) as BoxError)
                    .and_then(|row| map_row_to_transaction_view(&row))
            })
            .try_collect()
            .await
    }
}

#[async_trait]
impl TransactionLedgerTrait for TransactionLedger {
    async fn record_borrow(&self, cmd: BorrowBook) -> std::result::Result<TransactionView, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let (book, user, existing) =
            Self::load_for_update(&mut tx, cmd.book_id, cmd.user_id).await?;

        let (book, active) = transaction::borrow_book(
            &book,
            existing.as_ref().and_then(Transaction::as_active),
            cmd.user_id,
            cmd.borrowed_at,
        )?;

        Self::update_quantity(&mut tx, &book).await?;

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id,
                book_id,
                user_id,
                borrow_date,
                return_date,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, NULL, $5, $6)
            "#,
        )
        .bind(active.id.value())
        .bind(active.book_id.value())
        .bind(active.user_id.value())
        .bind(active.borrow_date)
        .bind(active.created_at)
        .bind(active.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_active_borrow_conflict(&e) {
                LedgerError::Borrow(BorrowError::AlreadyBorrowed)
            } else {
                backend(e)
            }
        })?;

        tx.commit().await.map_err(backend)?;

        Ok(TransactionView {
            transaction: Transaction::Active(active),
            book,
            user,
        })
    }

    async fn record_return(&self, cmd: ReturnBook) -> std::result::Result<TransactionView, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let (book, user, existing) =
            Self::load_for_update(&mut tx, cmd.book_id, cmd.user_id).await?;

        let active = existing.as_ref().and_then(Transaction::as_active).cloned();
        let (book, closed) =
            transaction::return_book(&book, active, cmd.user_id, cmd.returned_at)?;

        Self::update_quantity(&mut tx, &book).await?;

        sqlx::query(
            r#"
            UPDATE transactions
            SET return_date = $2, updated_at = $3
            WHERE id = $1 AND return_date IS NULL
            "#,
        )
        .bind(closed.id.value())
        .bind(closed.return_date)
        .bind(closed.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;

        Ok(TransactionView {
            transaction: Transaction::Closed(closed),
            book,
            user,
        })
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<TransactionView>> {
        self.fetch_views(
            "t.user_id = $1",
            user_id.value(),
            "(t.return_date IS NULL) DESC, t.borrow_date DESC, t.id DESC",
        )
        .await
    }

    async fn list_for_book(&self, book_id: BookId) -> Result<Vec<TransactionView>> {
        self.fetch_views("t.book_id = $1", book_id.value(), "t.borrow_date DESC, t.id DESC")
            .await
    }
}
