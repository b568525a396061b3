// libs/notification-cell/src/services/channel.rs
use async_trait::async_trait;
use tracing::info;

use crate::error::NotificationError;
use crate::models::{ConfirmationMessage, ReminderMessage};

/// Outbound transport for patient notifications.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send_confirmation(&self, message: &ConfirmationMessage) -> Result<(), NotificationError>;

    async fn send_reminder(&self, message: &ReminderMessage) -> Result<(), NotificationError>;
}

/// Channel used when no mail provider is configured: messages are written to
/// the log and reported as sent.
#[derive(Debug, Default, Clone)]
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn send_confirmation(&self, message: &ConfirmationMessage) -> Result<(), NotificationError> {
        info!(
            appointment_id = %message.appointment_id,
            to = %message.to_email,
            date = %message.date,
            time = %message.time,
            qr_bytes = message.qr_png.len(),
            "Confirmation (log channel) for {} with Dr. {}",
            message.patient_name, message.doctor_name
        );
        Ok(())
    }

    async fn send_reminder(&self, message: &ReminderMessage) -> Result<(), NotificationError> {
        info!(
            to = %message.to_email,
            time = %message.display_time,
            "Reminder (log channel) for {} with Dr. {}",
            message.patient_name, message.doctor_name
        );
        Ok(())
    }
}
