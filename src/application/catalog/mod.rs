mod catalog_service;

pub use catalog_service::{
    BooksPage, DEFAULT_LIMIT, DEFAULT_PAGE, ListBooks, MAX_LIMIT, Pagination, create_book,
    delete_book, get_book, list_books, update_book,
};
