mod lending_service;

pub use lending_service::{
    borrow_book, list_book_transactions, list_borrowed_books, return_book,
};
