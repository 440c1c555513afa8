pub mod library_store;

pub use library_store::LibraryStore;
