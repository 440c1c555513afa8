use crate::domain::{
    Book, BookId, Transaction, User, UserId, UserSummary,
    commands::{BorrowBook, ReturnBook},
    matches_search, transaction,
};
use crate::ports::{
    BookPage, BookQuery, DeleteBookError, InsertUserError, LedgerError, TransactionView,
    catalog_store::{self, CatalogStore},
    transaction_ledger::{self, TransactionLedger},
    user_store::{self, UserStore},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct LibraryState {
    books: HashMap<BookId, Book>,
    transactions: Vec<Transaction>,
    users: HashMap<UserId, User>,
}

impl LibraryState {
    fn user_summary(&self, user_id: UserId) -> Option<UserSummary> {
        self.users.get(&user_id).map(User::summary)
    }

    fn view(&self, transaction: &Transaction) -> Option<TransactionView> {
        let core = transaction.core();
        Some(TransactionView {
            transaction: transaction.clone(),
            book: self.books.get(&core.book_id)?.clone(),
            user: self.user_summary(core.user_id)?,
        })
    }
}

/// プロセス内ストア
///
/// カタログ・取引台帳・利用者を1つのMutexの下に置く。
/// 貸出・返却はロックを保持したまま読み取り・検証・書き込みを行うため、
/// 同じ書籍への並行貸出で冊数が0未満になることはない。
/// 開発用サーバーとテストで使用する。
pub struct LibraryStore {
    state: Mutex<LibraryState>,
}

impl LibraryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LibraryState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, LibraryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 現在の貸出中取引の件数（テスト・診断用）
    pub fn active_transaction_count(&self, book_id: BookId) -> usize {
        self.state()
            .transactions
            .iter()
            .filter(|t| t.is_active() && t.core().book_id == book_id)
            .count()
    }
}

impl Default for LibraryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogStore for LibraryStore {
    async fn insert(&self, book: Book) -> catalog_store::Result<()> {
        self.state().books.insert(book.id, book);
        Ok(())
    }

    async fn get(&self, book_id: BookId) -> catalog_store::Result<Option<Book>> {
        Ok(self.state().books.get(&book_id).cloned())
    }

    async fn update_details(&self, book: &Book) -> catalog_store::Result<Option<Book>> {
        let mut state = self.state();
        let Some(current) = state.books.get_mut(&book.id) else {
            return Ok(None);
        };

        *current = Book {
            quantity: current.quantity,
            created_at: current.created_at,
            ..book.clone()
        };

        Ok(Some(current.clone()))
    }

    async fn delete(&self, book_id: BookId) -> Result<Book, DeleteBookError> {
        let mut state = self.state();
        if !state.books.contains_key(&book_id) {
            return Err(DeleteBookError::NotFound);
        }

        let active = state
            .transactions
            .iter()
            .filter(|t| t.is_active() && t.core().book_id == book_id)
            .count() as u64;
        if active > 0 {
            return Err(DeleteBookError::HasActiveBorrows(active));
        }

        state.transactions.retain(|t| t.core().book_id != book_id);
        state.books.remove(&book_id).ok_or(DeleteBookError::NotFound)
    }

    async fn list(&self, query: &BookQuery) -> catalog_store::Result<BookPage> {
        let state = self.state();
        let mut books: Vec<&Book> = state
            .books
            .values()
            .filter(|book| match query.search.as_deref() {
                Some(search) => matches_search(book, search),
                None => true,
            })
            .collect();

        books.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.value().cmp(&a.id.value()))
        });

        let total = books.len() as u64;
        let books = books
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();

        Ok(BookPage { books, total })
    }
}

#[async_trait]
impl TransactionLedger for LibraryStore {
    async fn record_borrow(&self, cmd: BorrowBook) -> Result<TransactionView, LedgerError> {
        let mut state = self.state();

        let book = state
            .books
            .get(&cmd.book_id)
            .cloned()
            .ok_or(LedgerError::BookNotFound)?;
        let user = state
            .user_summary(cmd.user_id)
            .ok_or(LedgerError::UserNotFound)?;

        let existing = transaction::find_active(&state.transactions, cmd.book_id, cmd.user_id);
        let (book, active) =
            transaction::borrow_book(&book, existing, cmd.user_id, cmd.borrowed_at)?;

        let record = Transaction::Active(active);
        state.books.insert(book.id, book.clone());
        state.transactions.push(record.clone());

        Ok(TransactionView {
            transaction: record,
            book,
            user,
        })
    }

    async fn record_return(&self, cmd: ReturnBook) -> Result<TransactionView, LedgerError> {
        let mut state = self.state();

        let book = state
            .books
            .get(&cmd.book_id)
            .cloned()
            .ok_or(LedgerError::BookNotFound)?;
        let user = state
            .user_summary(cmd.user_id)
            .ok_or(LedgerError::UserNotFound)?;

        let position = state.transactions.iter().position(|t| {
            t.is_active() && t.core().book_id == cmd.book_id && t.core().user_id == cmd.user_id
        });
        let active = position
            .and_then(|i| state.transactions[i].as_active())
            .cloned();

        let (book, closed) = transaction::return_book(&book, active, cmd.user_id, cmd.returned_at)?;

        let record = Transaction::Closed(closed);
        if let Some(i) = position {
            state.transactions[i] = record.clone();
        }
        state.books.insert(book.id, book.clone());

        Ok(TransactionView {
            transaction: record,
            book,
            user,
        })
    }

    async fn list_for_user(&self, user_id: UserId) -> transaction_ledger::Result<Vec<TransactionView>> {
        let state = self.state();
        let mut transactions: Vec<&Transaction> = state
            .transactions
            .iter()
            .filter(|t| t.core().user_id == user_id)
            .collect();
        transactions.sort_by(|a, b| transaction::borrowed_books_order(a, b));

        Ok(transactions
            .into_iter()
            .filter_map(|t| state.view(t))
            .collect())
    }

    async fn list_for_book(&self, book_id: BookId) -> transaction_ledger::Result<Vec<TransactionView>> {
        let state = self.state();
        let mut transactions: Vec<&Transaction> = state
            .transactions
            .iter()
            .filter(|t| t.core().book_id == book_id)
            .collect();
        transactions.sort_by(|a, b| transaction::history_order(a, b));

        Ok(transactions
            .into_iter()
            .filter_map(|t| state.view(t))
            .collect())
    }
}

#[async_trait]
impl UserStore for LibraryStore {
    async fn insert(&self, user: User) -> Result<(), InsertUserError> {
        let mut state = self.state();
        let wanted = user.username.to_lowercase();
        let taken = state
            .users
            .values()
            .any(|u| u.username.to_lowercase() == wanted);
        if taken {
            return Err(InsertUserError::UsernameTaken);
        }
        state.users.insert(user.id, user);
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> user_store::Result<Option<User>> {
        let wanted = username.to_lowercase();
        Ok(self
            .state()
            .users
            .values()
            .find(|u| u.username.to_lowercase() == wanted)
            .cloned())
    }
}
