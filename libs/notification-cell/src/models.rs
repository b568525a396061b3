// libs/notification-cell/src/models.rs
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

// ==============================================================================
// CLINIC TIMEZONE
// ==============================================================================

/// The single wall clock every patient-facing date and time is rendered in.
///
/// Instants are stored and compared in UTC; only text meant for people goes
/// through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClinicTimezone {
    offset: FixedOffset,
}

impl ClinicTimezone {
    pub fn from_offset_minutes(minutes: i32) -> Self {
        let offset = minutes.checked_mul(60).and_then(FixedOffset::east_opt).unwrap_or_else(|| {
            warn!("Clinic UTC offset of {} minutes is out of range, falling back to UTC", minutes);
            Utc.fix()
        });
        Self { offset }
    }

    /// Indian Standard Time, +05:30.
    pub fn ist() -> Self {
        Self::from_offset_minutes(330)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// `yyyy-MM-dd`
    pub fn format_date(&self, instant: DateTime<Utc>) -> String {
        instant.with_timezone(&self.offset).format("%Y-%m-%d").to_string()
    }

    /// `HH:mm`, 24 hour clock.
    pub fn format_time(&self, instant: DateTime<Utc>) -> String {
        instant.with_timezone(&self.offset).format("%H:%M").to_string()
    }

    /// Human readable form used in reminder bodies, e.g. `2024-01-01 10:00 (UTC+05:30)`.
    pub fn format_datetime(&self, instant: DateTime<Utc>) -> String {
        let local = instant.with_timezone(&self.offset);
        format!("{} (UTC{})", local.format("%Y-%m-%d %H:%M"), local.format("%:z"))
    }
}

impl Default for ClinicTimezone {
    fn default() -> Self {
        Self::ist()
    }
}

// ==============================================================================
// DOMAIN INPUT
// ==============================================================================

/// What the booking side knows about a freshly persisted appointment.
#[derive(Debug, Clone)]
pub struct ConfirmationDetails {
    pub appointment_id: Uuid,
    pub patient_name: String,
    pub patient_email: String,
    pub doctor_name: String,
    pub specialty: Option<String>,
    pub scheduled_at: DateTime<Utc>,
}

/// What the reminder scan knows about an appointment that is about to start.
#[derive(Debug, Clone)]
pub struct ReminderDetails {
    pub appointment_id: Uuid,
    pub patient_name: String,
    pub patient_email: String,
    pub doctor_name: String,
    pub scheduled_at: DateTime<Utc>,
}

// ==============================================================================
// CHANNEL MESSAGES
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationMessage {
    pub to_email: String,
    pub patient_name: String,
    pub doctor_name: String,
    pub specialty: String,
    pub date: String,
    pub time: String,
    pub appointment_id: Uuid,
    pub qr_png: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReminderMessage {
    pub to_email: String,
    pub patient_name: String,
    pub doctor_name: String,
    pub scheduled_at: DateTime<Utc>,
    pub display_time: String,
}

// ==============================================================================
// SENDGRID WIRE FORMAT
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendGridMailRequest {
    pub personalizations: Vec<SendGridPersonalization>,
    pub from: SendGridAddress,
    pub subject: String,
    pub content: Vec<SendGridContent>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub attachments: Vec<SendGridAttachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendGridPersonalization {
    pub to: Vec<SendGridAddress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendGridAddress {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendGridContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendGridAttachment {
    pub content: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub filename: String,
    pub disposition: String,
}
