pub mod config;
pub mod error;
pub mod identity;
pub mod records;
pub mod server;
pub mod storage;
