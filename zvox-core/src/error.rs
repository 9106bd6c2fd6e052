//! Error taxonomy: fatal input errors, retryable provider errors, voice mismatches.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Fatal, user-facing: missing voice, unknown encoder, malformed file.
    #[error("{0}")]
    Input(String),

    /// Transient synthesis failure; retried up to the policy budget, then fatal.
    #[error("{encoder}: {message}")]
    Provider {
        encoder: &'static str,
        message: String,
    },

    /// A voice configuration bound to the wrong provider's encoder. Never retried.
    #[error("voice is not a {expected} voice")]
    VoiceMismatch { expected: &'static str },

    /// Audio file handling (silence, concat) failure.
    #[error("audio: {0}")]
    Audio(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn input(message: impl Into<String>) -> Self {
        Error::Input(message.into())
    }

    pub fn provider(encoder: &'static str, message: impl Into<String>) -> Self {
        Error::Provider {
            encoder,
            message: message.into(),
        }
    }

    /// Only provider errors are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Provider { .. })
    }
}
