use thiserror::Error;

/// Errors surfaced by the chat client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure: connection refused, DNS, timeout, malformed URL.
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server rejected the request as invalid (HTTP 4xx). The message is
    /// the server's own validation text, suitable for showing to the user.
    #[error("{message}")]
    Rejected { message: String },

    /// The server failed to process the request (HTTP 5xx).
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Compose-state misuse, reported before anything reaches the network.
    #[error(transparent)]
    Compose(#[from] ComposeError),
}

/// Recorder state machine violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComposeError {
    #[error("Recording already in progress")]
    AlreadyRecording,

    #[error("No recording in progress")]
    NotRecording,

    #[error("Recording contains no audio")]
    EmptyRecording,
}
