//! Error types for the chat collaborator.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Nothing to send: no text and no image
    #[error("Message is empty")]
    EmptyMessage,

    /// A reply is still outstanding for the previous message
    #[error("A reply is already in progress")]
    Busy,

    /// Attached image is not a base64 data URL
    #[error("Invalid image attachment: {message}")]
    InvalidAttachment { message: String },

    /// No API key configured for the model provider
    #[error("No API key configured")]
    MissingApiKey,

    /// Network/HTTP request failed
    #[error("Network error: {message}")]
    Network { message: String },

    /// Provider answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Provider answered with a body we could not read
    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },
}

impl ChatError {
    /// True for errors raised before anything was sent to the provider.
    pub fn is_rejected_input(&self) -> bool {
        matches!(
            self,
            ChatError::EmptyMessage | ChatError::Busy | ChatError::InvalidAttachment { .. }
        )
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Network {
            message: err.to_string(),
        }
    }
}
