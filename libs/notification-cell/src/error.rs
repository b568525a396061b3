use thiserror::Error;

/// Which half of a dispatch went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDomain {
    /// The message could not be assembled (QR encoding, missing data).
    Payload,
    /// The message was built but could not be handed to the channel.
    Transmit,
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Could not build notification payload: {0}")]
    Payload(String),

    #[error("Notification transport failed: {0}")]
    Transport(String),

    #[error("Notification channel timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("Notification channel is not configured")]
    NotConfigured,
}

impl NotificationError {
    pub fn domain(&self) -> FailureDomain {
        match self {
            NotificationError::Payload(_) => FailureDomain::Payload,
            NotificationError::Transport(_)
            | NotificationError::Timeout { .. }
            | NotificationError::NotConfigured => FailureDomain::Transmit,
        }
    }
}

impl From<reqwest::Error> for NotificationError {
    fn from(err: reqwest::Error) -> Self {
        NotificationError::Transport(err.to_string())
    }
}
