// libs/notification-cell/src/test_utils.rs
//
// Channel and encoder fakes shared by the notification and appointment test
// suites.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::NotificationError;
use crate::models::{ConfirmationMessage, ReminderMessage};
use crate::services::channel::NotificationChannel;
use crate::services::qr::ImageEncoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelBehavior {
    Succeed,
    Fail,
    Hang,
}

/// Records every attempt, whatever the configured outcome.
pub struct RecordingChannel {
    behavior: ChannelBehavior,
    confirmations: Mutex<Vec<ConfirmationMessage>>,
    reminders: Mutex<Vec<ReminderMessage>>,
}

impl RecordingChannel {
    pub fn new(behavior: ChannelBehavior) -> Self {
        Self {
            behavior,
            confirmations: Mutex::new(Vec::new()),
            reminders: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(ChannelBehavior::Succeed)
    }

    pub fn failing() -> Self {
        Self::new(ChannelBehavior::Fail)
    }

    pub fn hanging() -> Self {
        Self::new(ChannelBehavior::Hang)
    }

    pub fn confirmations(&self) -> Vec<ConfirmationMessage> {
        self.confirmations.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn reminders(&self) -> Vec<ReminderMessage> {
        self.reminders.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Poll until `count` confirmations were attempted or `within` elapses.
    pub async fn wait_for_confirmations(&self, count: usize, within: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + within;
        while tokio::time::Instant::now() < deadline {
            if self.confirmations().len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.confirmations().len() >= count
    }

    async fn outcome(&self) -> Result<(), NotificationError> {
        match self.behavior {
            ChannelBehavior::Succeed => Ok(()),
            ChannelBehavior::Fail => Err(NotificationError::Transport("HTTP 401: bad api key".to_string())),
            ChannelBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send_confirmation(&self, message: &ConfirmationMessage) -> Result<(), NotificationError> {
        if let Ok(mut sent) = self.confirmations.lock() {
            sent.push(message.clone());
        }
        self.outcome().await
    }

    async fn send_reminder(&self, message: &ReminderMessage) -> Result<(), NotificationError> {
        if let Ok(mut sent) = self.reminders.lock() {
            sent.push(message.clone());
        }
        self.outcome().await
    }
}

/// Encoder that always refuses, to exercise the payload failure domain.
#[derive(Debug, Default, Clone)]
pub struct BrokenEncoder;

impl ImageEncoder for BrokenEncoder {
    fn encode_qr(&self, _payload: &str, _size: u32) -> Result<Vec<u8>, NotificationError> {
        Err(NotificationError::Payload("encoder unavailable".to_string()))
    }
}
