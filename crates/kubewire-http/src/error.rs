use kubewire_types::{DecodeError, Status};
use thiserror::Error;

/// Errors returned by the connection, the watch stream and the mapper
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid endpoint url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// No complete response was obtained
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A response was obtained but its body is not the JSON that was expected
    #[error("malformed response (HTTP {status}): {reason}")]
    MalformedResponse { status: u16, reason: String },

    /// The server answered with a Status document
    #[error("api error: {0}")]
    Api(Status),

    /// A resource name that cannot be a single path segment
    #[error("invalid resource name `{0}`")]
    InvalidName(String),

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl ClientError {
    /// The server's Status, if this is an API error
    pub fn status(&self) -> Option<&Status> {
        match self {
            Self::Api(status) => Some(status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status().is_some_and(Status::is_not_found)
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
