//! # palaver-store
//!
//! SQLite persistence for Palaver chat messages.
//!
//! The store is synchronous by design; async callers wrap it in
//! `spawn_blocking`.  One [`Database`] owns one connection and every append
//! goes through it, which keeps writes serialized and lets the store
//! guarantee non-decreasing `created_at` values per database.

pub mod database;
pub mod messages;
pub mod migrations;
pub mod models;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
