use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum TransportError {
    #[error("Envelope Serialize Error: {message} {location}")]
    Serialize {
        message: String,
        location: ErrorLocation,
    },

    #[error("Post Error: {message} {location}")]
    Post {
        message: String,
        location: ErrorLocation,
    },

    #[error("Mount Error: {message} {location}")]
    Mount {
        message: String,
        location: ErrorLocation,
    },
}

impl TransportError {
    #[track_caller]
    pub fn post(message: impl Into<String>) -> Self {
        TransportError::Post {
            message: message.into(),
            location: ErrorLocation::here(),
        }
    }

    #[track_caller]
    pub fn mount(message: impl Into<String>) -> Self {
        TransportError::Mount {
            message: message.into(),
            location: ErrorLocation::here(),
        }
    }
}

impl From<serde_json::Error> for TransportError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        TransportError::Serialize {
            message: error.to_string(),
            location: ErrorLocation::here(),
        }
    }
}
