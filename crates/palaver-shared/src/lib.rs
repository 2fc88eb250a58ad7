//! # palaver-shared
//!
//! Types shared between the Palaver server and client crates: the message
//! domain model, the JSON wire envelopes of the chat API, and the documented
//! defaults every deployment starts from.

pub mod constants;
pub mod types;
pub mod wire;

pub use types::{Message, MessageBody, Participant, Scope};
