use crate::domain::{Book, BookId};
use crate::ports::BoxError;
use crate::ports::catalog_store::{
    BookPage, BookQuery, CatalogStore as CatalogStoreTrait, DeleteBookError, Result,
};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use sqlx::PgPool;

use super::rows::{BOOK_COLUMNS, map_row_to_book, quantity_to_db};

/// ILIKE用に検索語のワイルドカードをエスケープし、部分一致パターンにする
fn search_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// CatalogStoreのPostgreSQL実装
pub struct CatalogStore {
    pool: PgPool,
}

impl CatalogStore {
    /// PostgreSQLコネクションプールから新しいCatalogStoreを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStoreTrait for CatalogStore {
    async fn insert(&self, book: Book) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (
                id,
                title,
                author,
                isbn,
                publication_year,
                quantity,
                cover_image,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(book.id.value())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.publication_year.value())
        .bind(quantity_to_db(book.quantity)?)
        .bind(&book.cover_image)
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, book_id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(book_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    /// 書誌情報のみ更新（quantityは貸出・返却側の列なので触らない）
    async fn update_details(&self, book: &Book) -> Result<Option<Book>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE books SET
                title = $2,
                author = $3,
                isbn = $4,
                publication_year = $5,
                cover_image = $6,
                updated_at = $7
            WHERE id = $1
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(book.id.value())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.publication_year.value())
        .bind(&book.cover_image)
        .bind(book.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    /// 書籍行をロックしてから貸出中の取引を数え、なければ削除する
    ///
    /// 返却済みの取引は外部キーの ON DELETE CASCADE で消える。
    async fn delete(&self, book_id: BookId) -> std::result::Result<Book, DeleteBookError> {
        let backend = |e: sqlx::Error| DeleteBookError::Backend(Box::new(e));

        let mut tx = self.pool.begin().await.map_err(backend)?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM books WHERE id = $1 FOR UPDATE",
            BOOK_COLUMNS
        ))
        .bind(book_id.value())
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?
        .ok_or(DeleteBookError::NotFound)?;
        let book = map_row_to_book(&row).map_err(DeleteBookError::Backend)?;

        let active: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM transactions
            WHERE book_id = $1 AND return_date IS NULL
            "#,
        )
        .bind(book_id.value())
        .fetch_one(&mut *tx)
        .await
        .map_err(backend)?;

        if active > 0 {
            return Err(DeleteBookError::HasActiveBorrows(active as u64));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(book_id.value())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(book)
    }

    async fn list(&self, query: &BookQuery) -> Result<BookPage> {
        let pattern = query.search.as_deref().map(search_pattern);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM books
            WHERE $1::text IS NULL OR title ILIKE $1 OR author ILIKE $1
            "#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            r#"
            SELECT {}
            FROM books
            WHERE $1::text IS NULL OR title ILIKE $1 OR author ILIKE $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            BOOK_COLUMNS
        );

        let books = sqlx::query(&sql)
            .bind(&pattern)
            .bind(i64::from(query.limit))
            .bind(query.offset() as i64)
            .fetch(&self.pool)
            .map(|row| {
                row.map_err(|e| Box::new(e) as BoxError)
                    .and_then(|row| map_row_to_book(&row))
            })
            .try_collect::<Vec<_>>()
            .await?;

        Ok(BookPage {
            books,
            total: total as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_pattern_wraps_and_escapes() {
        assert_eq!(search_pattern("dune"), "%dune%");
        assert_eq!(search_pattern("100%"), "%100\\%%");
        assert_eq!(search_pattern("a_b"), "%a\\_b%");
    }
}
