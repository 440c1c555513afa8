mod auth_service;
mod password;

pub use auth_service::{AuthSession, authenticate, login, register};
