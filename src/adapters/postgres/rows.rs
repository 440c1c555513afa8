use crate::domain::{
    Book, BookId, PublicationYear, Quantity, Transaction, TransactionCore, TransactionId, UserId,
    UserSummary,
};
use crate::ports::{BoxError, TransactionView};
use sqlx::{Row, postgres::PgRow};

/// booksテーブルの列
pub(super) const BOOK_COLUMNS: &str = r#"
    id,
    title,
    author,
    isbn,
    publication_year,
    quantity,
    cover_image,
    created_at,
    updated_at
"#;

/// 取引ビュー取得用のSELECT句（transactions t, books b, users u の結合）
pub(super) const TRANSACTION_VIEW_SELECT: &str = r#"
    SELECT
        t.id,
        t.book_id,
        t.user_id,
        t.borrow_date,
        t.return_date,
        t.created_at,
        t.updated_at,
        b.title AS book_title,
        b.author AS book_author,
        b.isbn AS book_isbn,
        b.publication_year AS book_publication_year,
        b.quantity AS book_quantity,
        b.cover_image AS book_cover_image,
        b.created_at AS book_created_at,
        b.updated_at AS book_updated_at,
        u.username
    FROM transactions t
    JOIN books b ON b.id = t.book_id
    JOIN users u ON u.id = t.user_id
"#;

fn invalid_data(message: String) -> BoxError {
    Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message))
}

/// quantity (INTEGER) と publication_year をドメインの値オブジェクトに変換する
fn book_values(year: i32, quantity: i32) -> Result<(PublicationYear, Quantity), BoxError> {
    let publication_year = PublicationYear::try_from(year)
        .map_err(|e| invalid_data(format!("publication_year out of range: {}", e)))?;
    let quantity = Quantity::try_from(quantity)
        .map_err(|e| invalid_data(format!("quantity out of range: {}", e)))?;
    Ok((publication_year, quantity))
}

/// PostgreSQLの行データをBookに変換する
pub(super) fn map_row_to_book(row: &PgRow) -> Result<Book, BoxError> {
    let (publication_year, quantity) =
        book_values(row.try_get("publication_year")?, row.try_get("quantity")?)?;

    Ok(Book {
        id: BookId::from_uuid(row.try_get("id")?),
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        isbn: row.try_get("isbn")?,
        publication_year,
        quantity,
        cover_image: row.try_get("cover_image")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// transactions の行（t.* の列）を取引に変換する
pub(super) fn map_row_to_transaction(row: &PgRow) -> Result<Transaction, BoxError> {
    let core = TransactionCore {
        id: TransactionId::from_uuid(row.try_get("id")?),
        book_id: BookId::from_uuid(row.try_get("book_id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        borrow_date: row.try_get("borrow_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    };

    Ok(Transaction::from_parts(core, row.try_get("return_date")?))
}

/// TRANSACTION_VIEW_SELECT の行を取引ビューに変換する
pub(super) fn map_row_to_transaction_view(row: &PgRow) -> Result<TransactionView, BoxError> {
    let transaction = map_row_to_transaction(row)?;
    let (publication_year, quantity) = book_values(
        row.try_get("book_publication_year")?,
        row.try_get("book_quantity")?,
    )?;

    let book = Book {
        id: transaction.core().book_id,
        title: row.try_get("book_title")?,
        author: row.try_get("book_author")?,
        isbn: row.try_get("book_isbn")?,
        publication_year,
        quantity,
        cover_image: row.try_get("book_cover_image")?,
        created_at: row.try_get("book_created_at")?,
        updated_at: row.try_get("book_updated_at")?,
    };

    let user = UserSummary {
        id: transaction.core().user_id,
        username: row.try_get("username")?,
    };

    Ok(TransactionView {
        transaction,
        book,
        user,
    })
}

/// Quantity を INTEGER 列の値に変換する
pub(super) fn quantity_to_db(quantity: Quantity) -> Result<i32, BoxError> {
    i32::try_from(quantity.value())
        .map_err(|_| invalid_data(format!("quantity too large: {}", quantity.value())))
}
