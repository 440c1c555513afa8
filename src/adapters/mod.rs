pub mod jwt;
pub mod memory;
pub mod postgres;
