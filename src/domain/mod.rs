pub mod book;
pub mod commands;
pub mod errors;
pub mod transaction;
pub mod user;
pub mod value_objects;

pub use book::*;
pub use errors::*;
pub use transaction::{
    ActiveTransaction, ClosedTransaction, Transaction, TransactionCore, TransactionStatus,
};
pub use user::{Identity, User, UserSummary};
pub use value_objects::*;
