//! # palaver-server
//!
//! The Palaver messaging service: validated send/fetch operations over the
//! SQLite message store, filesystem voice-attachment storage, and the axum
//! surface exposing both.
//!
//! The binary in `main.rs` only wires these modules together; they live in a
//! library crate so integration tests can build the router against temporary
//! storage.

pub mod api;
pub mod attachments;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod service;
