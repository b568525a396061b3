// libs/notification-cell/src/services/dispatcher.rs
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use shared_config::AppConfig;

use crate::error::NotificationError;
use crate::models::{
    ClinicTimezone, ConfirmationDetails, ConfirmationMessage, ReminderDetails, ReminderMessage,
};
use crate::services::channel::{LogChannel, NotificationChannel};
use crate::services::qr::{ImageEncoder, QrPngEncoder};
use crate::services::sendgrid::SendGridChannel;

/// Converts scheduling data into channel messages and bounds every channel
/// call with a timeout.
///
/// Nothing in here retries. Callers receive the error, log it, and move on.
pub struct NotificationDispatcher {
    channel: Arc<dyn NotificationChannel>,
    encoder: Arc<dyn ImageEncoder>,
    timezone: ClinicTimezone,
    timeout: Duration,
    qr_size: u32,
    confirmation_slots: Arc<Semaphore>,
}

impl NotificationDispatcher {
    pub fn new(
        channel: Arc<dyn NotificationChannel>,
        encoder: Arc<dyn ImageEncoder>,
        config: &AppConfig,
    ) -> Self {
        if config.notification_timeout_secs == 0 {
            warn!("Notification timeout of 0s would fail every send, using 1s");
        }
        if config.confirmation_concurrency == 0 {
            warn!("Confirmation concurrency of 0 would block every send, using 1");
        }

        Self {
            channel,
            encoder,
            timezone: ClinicTimezone::from_offset_minutes(config.clinic_utc_offset_minutes),
            timeout: Duration::from_secs(config.notification_timeout_secs.max(1)),
            qr_size: config.qr_image_size,
            confirmation_slots: Arc::new(Semaphore::new(config.confirmation_concurrency.max(1))),
        }
    }

    /// SendGrid when configured, otherwise a channel that only logs.
    pub fn from_config(config: &AppConfig) -> Self {
        let channel: Arc<dyn NotificationChannel> = match SendGridChannel::new(config) {
            Ok(channel) => {
                info!("Notifications will be sent through SendGrid");
                Arc::new(channel)
            }
            Err(e) => {
                warn!("SendGrid unavailable ({}), notifications will only be logged", e);
                Arc::new(LogChannel)
            }
        };

        Self::new(channel, Arc::new(QrPngEncoder), config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `APPT:<id>|PATIENT:<name>|DATE:<date>|TIME:<time>`
    pub fn qr_payload(&self, details: &ConfirmationDetails) -> String {
        format!(
            "APPT:{}|PATIENT:{}|DATE:{}|TIME:{}",
            details.appointment_id,
            details.patient_name,
            self.timezone.format_date(details.scheduled_at),
            self.timezone.format_time(details.scheduled_at),
        )
    }

    pub fn build_confirmation(
        &self,
        details: &ConfirmationDetails,
    ) -> Result<ConfirmationMessage, NotificationError> {
        if details.patient_email.trim().is_empty() {
            return Err(NotificationError::Payload(format!(
                "patient of appointment {} has no email address",
                details.appointment_id
            )));
        }

        let qr_png = self.encoder.encode_qr(&self.qr_payload(details), self.qr_size)?;

        Ok(ConfirmationMessage {
            to_email: details.patient_email.clone(),
            patient_name: details.patient_name.clone(),
            doctor_name: details.doctor_name.clone(),
            specialty: details.specialty.clone().unwrap_or_default(),
            date: self.timezone.format_date(details.scheduled_at),
            time: self.timezone.format_time(details.scheduled_at),
            appointment_id: details.appointment_id,
            qr_png,
        })
    }

    pub fn build_reminder(&self, details: &ReminderDetails) -> Result<ReminderMessage, NotificationError> {
        if details.patient_email.trim().is_empty() {
            return Err(NotificationError::Payload(format!(
                "patient of appointment {} has no email address",
                details.appointment_id
            )));
        }

        Ok(ReminderMessage {
            to_email: details.patient_email.clone(),
            patient_name: details.patient_name.clone(),
            doctor_name: details.doctor_name.clone(),
            scheduled_at: details.scheduled_at,
            display_time: self.timezone.format_datetime(details.scheduled_at),
        })
    }

    #[instrument(skip(self, details), fields(appointment_id = %details.appointment_id))]
    pub async fn send_confirmation(&self, details: &ConfirmationDetails) -> Result<(), NotificationError> {
        let message = self.build_confirmation(details)?;
        debug!("Confirmation payload built ({} byte QR)", message.qr_png.len());

        self.bounded(self.channel.send_confirmation(&message)).await
    }

    #[instrument(skip(self, details), fields(appointment_id = %details.appointment_id))]
    pub async fn send_reminder(&self, details: &ReminderDetails) -> Result<(), NotificationError> {
        let message = self.build_reminder(details)?;

        self.bounded(self.channel.send_reminder(&message)).await
    }

    /// Send a confirmation on a detached task. The outcome is logged and
    /// never reported back; the handle is only useful to tests.
    ///
    /// At most `confirmation_concurrency` sends run at once.
    pub fn dispatch_confirmation(self: &Arc<Self>, details: ConfirmationDetails) -> JoinHandle<()> {
        let dispatcher = Arc::clone(self);

        tokio::spawn(async move {
            let Ok(_slot) = Arc::clone(&dispatcher.confirmation_slots).acquire_owned().await else {
                warn!(appointment_id = %details.appointment_id, "Confirmation slots closed, dropping send");
                return;
            };

            match dispatcher.send_confirmation(&details).await {
                Ok(()) => info!(
                    appointment_id = %details.appointment_id,
                    "Confirmation sent to {}", details.patient_email
                ),
                Err(e) => warn!(
                    appointment_id = %details.appointment_id,
                    domain = ?e.domain(),
                    "Confirmation not delivered: {}", e
                ),
            }
        })
    }

    async fn bounded<F>(&self, call: F) -> Result<(), NotificationError>
    where
        F: Future<Output = Result<(), NotificationError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(NotificationError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}
