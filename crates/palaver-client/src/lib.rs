//! # palaver-client
//!
//! Embeddable chat client: a typed HTTP wrapper over the Palaver API, a
//! polling sync loop publishing snapshots through a watch channel, and the
//! per-conversation compose/view state an application frontend renders.
//!
//! The crate stays headless. Audio capture, rendering, and authentication
//! belong to the embedding application; it hands each [`ConversationView`]
//! an authenticated [`Participant`](palaver_shared::types::Participant) and
//! feeds recorder chunks from whatever capture backend it uses.

pub mod api;
pub mod compose;
pub mod directory;
pub mod sync;
pub mod view;

mod error;

pub use api::ChatApi;
pub use compose::{Composer, RecordingState};
pub use directory::{HttpUserDirectory, InMemoryUserDirectory, UserDirectory};
pub use error::{ClientError, ComposeError};
pub use sync::{spawn_sync, Conversation, SyncConfig, SyncHandle};
pub use view::ConversationView;
