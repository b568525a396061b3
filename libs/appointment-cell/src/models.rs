// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    /// Absolute instant. Rows written before the column was mandatory may
    /// carry no time; the conflict checker and reminder scan skip those.
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// A new booking as the coordinator persists it.
    pub fn scheduled(patient_id: Uuid, doctor_id: Uuid, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            scheduled_at: Some(scheduled_at),
            status: AppointmentStatus::Scheduled,
            reminder_sent: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AppointmentStatus::Scheduled
    }

    /// Still waiting for its reminder and inside `window`.
    pub fn is_due_for_reminder(&self, window: &ReminderWindow) -> bool {
        self.is_active()
            && !self.reminder_sent
            && self.scheduled_at.map_or(false, |at| window.contains(at))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Scheduled,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "Scheduled"),
            AppointmentStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

// ==============================================================================
// SCHEDULING POLICY
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingPolicy {
    /// Two active appointments of one doctor must be at least this far apart.
    pub min_separation: Duration,
    /// Run the conflict check again when an appointment is moved.
    pub reschedule_conflict_check: bool,
}

impl SchedulingPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            min_separation: Duration::minutes(config.booking_min_separation_minutes),
            reschedule_conflict_check: config.reschedule_conflict_check,
        }
    }
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

// ==============================================================================
// REMINDER MODELS
// ==============================================================================

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReminderWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReminderWindow {
    /// Window scanned by the tick that runs at `now`: `[now - catch_up, now + width)`.
    pub fn for_tick(now: DateTime<Utc>, width: Duration, catch_up: Duration) -> Self {
        Self {
            start: now - catch_up,
            end: now + width,
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

/// Outcome of one reminder scan, for logs and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReminderScanReport {
    pub due: usize,
    pub dispatched: usize,
    pub dispatch_failures: usize,
    pub skipped: usize,
    pub marked: usize,
    pub mark_failures: usize,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub scheduled_at: DateTime<Utc>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Slot already booked")]
    SlotUnavailable,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound
            | AppointmentError::PatientNotFound
            | AppointmentError::DoctorNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::SlotUnavailable => AppError::Conflict(err.to_string()),
            AppointmentError::ValidationError(_) => AppError::BadRequest(err.to_string()),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
