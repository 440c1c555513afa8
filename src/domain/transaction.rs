use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Book, BookId, BorrowError, ReturnError, TransactionId, UserId};

// ============================================================================
// 型安全な状態パターン
// ============================================================================

/// 貸出取引の共通フィールド
///
/// すべての状態（Active, Closed）で共有されるコアデータ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCore {
    // 識別子
    pub id: TransactionId,

    // 他の集約への参照（IDのみ）
    pub book_id: BookId,
    pub user_id: UserId,

    // 貸出日は作成後に変更しない
    pub borrow_date: DateTime<Utc>,

    // 監査情報
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 貸出中状態（returnDate = null）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveTransaction {
    #[serde(flatten)]
    pub core: TransactionCore,
}

impl std::ops::Deref for ActiveTransaction {
    type Target = TransactionCore;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

/// 返却済み状態（終端）
///
/// return_dateが必須（型で保証）。以後の遷移はない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedTransaction {
    #[serde(flatten)]
    pub core: TransactionCore,
    pub return_date: DateTime<Utc>,
}

impl std::ops::Deref for ClosedTransaction {
    type Target = TransactionCore;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

/// 貸出取引の統合型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Transaction {
    Active(ActiveTransaction),
    Closed(ClosedTransaction),
}

impl Transaction {
    /// 永続化された行から状態を復元する
    pub fn from_parts(core: TransactionCore, return_date: Option<DateTime<Utc>>) -> Self {
        match return_date {
            None => Transaction::Active(ActiveTransaction { core }),
            Some(return_date) => Transaction::Closed(ClosedTransaction { core, return_date }),
        }
    }

    pub fn core(&self) -> &TransactionCore {
        match self {
            Transaction::Active(active) => &active.core,
            Transaction::Closed(closed) => &closed.core,
        }
    }

    pub fn return_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Transaction::Active(_) => None,
            Transaction::Closed(closed) => Some(closed.return_date),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Transaction::Active(_))
    }

    pub fn status(&self) -> TransactionStatus {
        match self {
            Transaction::Active(_) => TransactionStatus::Active,
            Transaction::Closed(_) => TransactionStatus::Returned,
        }
    }

    pub fn as_active(&self) -> Option<&ActiveTransaction> {
        match self {
            Transaction::Active(active) => Some(active),
            Transaction::Closed(_) => None,
        }
    }
}

/// 取引の状態（一覧の絞り込みに使う）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// 貸出中
    Active,
    /// 返却済み
    Returned,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Active => "active",
            TransactionStatus::Returned => "returned",
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TransactionStatus::Active),
            "returned" => Ok(TransactionStatus::Returned),
            _ => Err(format!("Invalid transaction status: {}", s)),
        }
    }
}

impl From<ActiveTransaction> for Transaction {
    fn from(active: ActiveTransaction) -> Self {
        Transaction::Active(active)
    }
}

impl From<ClosedTransaction> for Transaction {
    fn from(closed: ClosedTransaction) -> Self {
        Transaction::Closed(closed)
    }
}

/// 利用者×書籍の組に対する貸出中取引を探す
pub fn find_active<'a, I>(transactions: I, book_id: BookId, user_id: UserId) -> Option<&'a ActiveTransaction>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    transactions
        .into_iter()
        .filter_map(Transaction::as_active)
        .find(|t| t.book_id == book_id && t.user_id == user_id)
}

/// 純粋関数：書籍を貸し出す
///
/// ビジネスルール：
/// - 同じ利用者×書籍の貸出中取引がないこと
/// - 貸出可能冊数が1以上であること
/// - 成功時は冊数を1減らし、貸出中の取引を1件作る
///
/// `existing`には呼び出し側が同じロック/トランザクション内で
/// 読み取った貸出中取引を渡す。
///
/// 副作用なし。更新後のBookと新しい取引を返す。
pub fn borrow_book(
    book: &Book,
    existing: Option<&ActiveTransaction>,
    user_id: UserId,
    borrowed_at: DateTime<Utc>,
) -> Result<(Book, ActiveTransaction), BorrowError> {
    if existing.is_some_and(|t| t.book_id == book.id && t.user_id == user_id) {
        return Err(BorrowError::AlreadyBorrowed);
    }

    let quantity = book.quantity.decrement()?;

    let updated_book = Book {
        quantity,
        updated_at: borrowed_at,
        ..book.clone()
    };

    let transaction = ActiveTransaction {
        core: TransactionCore {
            id: TransactionId::new(),
            book_id: book.id,
            user_id,
            borrow_date: borrowed_at,
            created_at: borrowed_at,
            updated_at: borrowed_at,
        },
    };

    Ok((updated_book, transaction))
}

/// 純粋関数：書籍を返却する
///
/// ビジネスルール：
/// - 呼び出し元自身の、この書籍に対する貸出中取引が必要
/// - 成功時は冊数を1増やし、取引にreturn_dateを設定する
/// - 返却済み取引への再返却は`NoActiveBorrow`（冊数は変えない）
///
/// 副作用なし。更新後のBookと返却済み取引を返す。
pub fn return_book(
    book: &Book,
    active: Option<ActiveTransaction>,
    user_id: UserId,
    returned_at: DateTime<Utc>,
) -> Result<(Book, ClosedTransaction), ReturnError> {
    let active = match active {
        Some(t) if t.book_id == book.id && t.user_id == user_id => t,
        _ => return Err(ReturnError::NoActiveBorrow),
    };

    let updated_book = Book {
        quantity: book.quantity.increment(),
        updated_at: returned_at,
        ..book.clone()
    };

    let closed = ClosedTransaction {
        core: TransactionCore {
            updated_at: returned_at,
            ..active.core
        },
        return_date: returned_at,
    };

    Ok((updated_book, closed))
}

/// 一覧表示用の並び順：貸出中を先に、各グループ内は新しい順
pub fn borrowed_books_order(a: &Transaction, b: &Transaction) -> std::cmp::Ordering {
    b.is_active()
        .cmp(&a.is_active())
        .then_with(|| b.core().borrow_date.cmp(&a.core().borrow_date))
        .then_with(|| b.core().id.value().cmp(&a.core().id.value()))
}

/// 書籍の取引履歴の並び順：新しい順
pub fn history_order(a: &Transaction, b: &Transaction) -> std::cmp::Ordering {
    b.core()
        .borrow_date
        .cmp(&a.core().borrow_date)
        .then_with(|| b.core().id.value().cmp(&a.core().id.value()))
}
