// libs/notification-cell/src/services/sendgrid.rs
use std::fmt;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::error::NotificationError;
use crate::models::{
    ConfirmationMessage, ReminderMessage, SendGridAddress, SendGridAttachment, SendGridContent,
    SendGridMailRequest, SendGridPersonalization,
};
use crate::services::channel::NotificationChannel;

pub const CONFIRMATION_SUBJECT: &str = "Appointment Confirmed | Healthcare System";
pub const REMINDER_SUBJECT: &str = "Appointment Reminder";
pub const QR_ATTACHMENT_NAME: &str = "appointment-qr.png";

/// SendGrid v3 mail client.
/// Based on: https://docs.sendgrid.com/api-reference/mail-send/mail-send
pub struct SendGridChannel {
    client: Client,
    api_key: String,
    from_email: String,
    base_url: String,
}

// The API key never reaches logs or assertion output.
impl fmt::Debug for SendGridChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendGridChannel")
            .field("api_key", &"<redacted>")
            .field("from_email", &self.from_email)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl SendGridChannel {
    pub fn new(config: &AppConfig) -> Result<Self, NotificationError> {
        if !config.is_email_configured() {
            return Err(NotificationError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            api_key: config.sendgrid_api_key.clone(),
            from_email: config.sendgrid_from_email.clone(),
            base_url: config.sendgrid_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// POST /v3/mail/send
    async fn send_mail(&self, request: &SendGridMailRequest) -> Result<(), NotificationError> {
        let url = format!("{}/v3/mail/send", self.base_url);
        debug!("Sending mail request to: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let response_text = response.text().await.unwrap_or_default();
            error!("SendGrid mail send failed: {} - {}", status, response_text);
            return Err(NotificationError::Transport(format!("HTTP {}: {}", status, response_text)));
        }

        info!("SendGrid accepted mail with status {}", status);
        Ok(())
    }

    fn envelope(&self, to_email: &str, subject: &str, content: SendGridContent) -> SendGridMailRequest {
        SendGridMailRequest {
            personalizations: vec![SendGridPersonalization {
                to: vec![SendGridAddress { email: to_email.to_string() }],
            }],
            from: SendGridAddress { email: self.from_email.clone() },
            subject: subject.to_string(),
            content: vec![content],
            attachments: Vec::new(),
        }
    }
}

#[async_trait]
impl NotificationChannel for SendGridChannel {
    async fn send_confirmation(&self, message: &ConfirmationMessage) -> Result<(), NotificationError> {
        let mut request = self.envelope(
            &message.to_email,
            CONFIRMATION_SUBJECT,
            SendGridContent {
                content_type: "text/html".to_string(),
                value: confirmation_html(message),
            },
        );

        if !message.qr_png.is_empty() {
            request.attachments.push(SendGridAttachment {
                content: general_purpose::STANDARD.encode(&message.qr_png),
                content_type: "image/png".to_string(),
                filename: QR_ATTACHMENT_NAME.to_string(),
                disposition: "attachment".to_string(),
            });
        }

        self.send_mail(&request).await
    }

    async fn send_reminder(&self, message: &ReminderMessage) -> Result<(), NotificationError> {
        let request = self.envelope(
            &message.to_email,
            REMINDER_SUBJECT,
            SendGridContent {
                content_type: "text/plain".to_string(),
                value: reminder_text(message),
            },
        );

        self.send_mail(&request).await
    }
}

pub fn confirmation_html(message: &ConfirmationMessage) -> String {
    format!(
        "<h2>Appointment Confirmed</h2>\
         <p>Hello <b>{patient}</b>,</p>\
         <p>Your appointment has been successfully booked.</p>\
         <hr/>\
         <p><b>Doctor:</b> {doctor}</p>\
         <p><b>Specialty:</b> {specialty}</p>\
         <p><b>Date:</b> {date}</p>\
         <p><b>Time:</b> {time}</p>\
         <p><b>Appointment ID:</b> #{id}</p>\
         <br/>\
         <p><b>QR Code:</b> Your appointment QR code is attached with this email.</p>\
         <p>Please show and scan the QR code at the reception desk.</p>\
         <br/>\
         <p>Thank you,<br/>Healthcare Appointment Team</p>",
        patient = escape_html(&message.patient_name),
        doctor = escape_html(&message.doctor_name),
        specialty = escape_html(&message.specialty),
        date = message.date,
        time = message.time,
        id = message.appointment_id,
    )
}

pub fn reminder_text(message: &ReminderMessage) -> String {
    format!(
        "Hello {},\n\n\
         This is a reminder for your appointment.\n\n\
         Doctor: Dr. {}\n\
         Time: {}\n\n\
         Please be available 10 minutes early.\n\n\
         Thank you.",
        message.patient_name, message.doctor_name, message.display_time
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
