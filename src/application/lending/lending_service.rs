use crate::domain::{
    BookId, Identity, TransactionStatus,
    commands::{BorrowBook, ReturnBook},
};
use crate::ports::TransactionView;
use chrono::Utc;

use super::super::{LibraryError, Result, ServiceDependencies};

/// 書籍を借りる
///
/// ビジネスルール：
/// - 書籍が存在すること
/// - 貸出可能冊数が1以上であること
/// - 呼び出し元が同じ書籍を返却前に借りていないこと
///
/// 判定と書き込み（冊数 -1、貸出中取引の作成）は
/// TransactionLedgerの1つの原子的な単位で行われる。
/// 失敗時は冊数も取引も変化しない。
///
/// # 引数
/// * `deps` - サービスの依存関係
/// * `identity` - 認証済みの呼び出し元
/// * `book_id` - 借りる書籍
///
/// # 戻り値
/// 作成された貸出中取引（書籍・利用者のスナップショット付き）
#[tracing::instrument(skip(deps, identity), fields(user_id = %identity.user_id))]
pub async fn borrow_book(
    deps: &ServiceDependencies,
    identity: &Identity,
    book_id: BookId,
) -> Result<TransactionView> {
    let cmd = BorrowBook {
        book_id,
        user_id: identity.user_id,
        borrowed_at: Utc::now(),
    };

    let view = deps
        .transaction_ledger
        .record_borrow(cmd)
        .await
        .map_err(LibraryError::from)
        .inspect_err(|e| tracing::warn!(error = %e, "Borrow rejected"))?;

    tracing::info!(
        transaction_id = %view.transaction.core().id,
        remaining = view.book.quantity.value(),
        "Book borrowed"
    );

    Ok(view)
}

/// 書籍を返却する
///
/// ビジネスルール：
/// - 書籍が存在すること
/// - 呼び出し元がこの書籍の貸出中取引を持っていること
///
/// 他人の貸出は返却できない（NoActiveBorrowとして扱う）。
/// 冊数 +1 と return_date の設定は1つの原子的な単位で行われる。
#[tracing::instrument(skip(deps, identity), fields(user_id = %identity.user_id))]
pub async fn return_book(
    deps: &ServiceDependencies,
    identity: &Identity,
    book_id: BookId,
) -> Result<TransactionView> {
    let cmd = ReturnBook {
        book_id,
        user_id: identity.user_id,
        returned_at: Utc::now(),
    };

    let view = deps
        .transaction_ledger
        .record_return(cmd)
        .await
        .map_err(LibraryError::from)
        .inspect_err(|e| tracing::warn!(error = %e, "Return rejected"))?;

    tracing::info!(
        transaction_id = %view.transaction.core().id,
        remaining = view.book.quantity.value(),
        "Book returned"
    );

    Ok(view)
}

/// 呼び出し元の取引一覧を取得する
///
/// 貸出中を先に、各グループ内は貸出日の新しい順。
/// `status`を指定した場合はその状態の取引のみ返す。
pub async fn list_borrowed_books(
    deps: &ServiceDependencies,
    identity: &Identity,
    status: Option<TransactionStatus>,
) -> Result<Vec<TransactionView>> {
    let views = deps
        .transaction_ledger
        .list_for_user(identity.user_id)
        .await
        .map_err(LibraryError::LedgerError)?;

    Ok(match status {
        Some(status) => views
            .into_iter()
            .filter(|view| view.transaction.status() == status)
            .collect(),
        None => views,
    })
}

/// 書籍の取引履歴を取得する（貸出日の新しい順）
///
/// # エラー
/// - BookNotFound: 書籍が存在しない
pub async fn list_book_transactions(
    deps: &ServiceDependencies,
    book_id: BookId,
) -> Result<Vec<TransactionView>> {
    deps.catalog_store
        .get(book_id)
        .await
        .map_err(LibraryError::CatalogStoreError)?
        .ok_or(LibraryError::BookNotFound)?;

    deps.transaction_ledger
        .list_for_book(book_id)
        .await
        .map_err(LibraryError::LedgerError)
}
