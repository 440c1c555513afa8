pub mod auth;
pub mod catalog;
mod dependencies;
mod errors;
pub mod lending;

pub use dependencies::ServiceDependencies;
pub use errors::{ErrorKind, LibraryError, Result};
