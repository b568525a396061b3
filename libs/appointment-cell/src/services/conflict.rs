// libs/appointment-cell/src/services/conflict.rs
use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::models::Appointment;

/// Decides whether a doctor can take an appointment at a given instant.
///
/// The caller passes every appointment it knows for the doctor, past and
/// future alike; nothing is pre-filtered by date.
#[derive(Debug, Clone, Copy)]
pub struct ConflictChecker {
    min_separation: Duration,
}

impl ConflictChecker {
    pub fn new(min_separation: Duration) -> Self {
        Self { min_separation }
    }

    pub fn min_separation(&self) -> Duration {
        self.min_separation
    }

    /// Appointments of `doctor_id` that are strictly closer than the minimum
    /// separation to `candidate`.
    ///
    /// Cancelled bookings, bookings of other doctors and rows without a time
    /// are ignored.
    pub fn find_conflicts<'a>(
        &self,
        doctor_id: Uuid,
        candidate: DateTime<Utc>,
        existing: &'a [Appointment],
    ) -> Vec<&'a Appointment> {
        let conflicts: Vec<&Appointment> = existing
            .iter()
            .filter(|appointment| appointment.doctor_id == doctor_id && appointment.is_active())
            .filter(|appointment| match appointment.scheduled_at {
                Some(at) => (at - candidate).abs() < self.min_separation,
                None => false,
            })
            .collect();

        debug!(
            "Checked {} existing appointments of doctor {} against {}: {} conflicts",
            existing.len(), doctor_id, candidate, conflicts.len()
        );

        conflicts
    }

    pub fn is_slot_available(
        &self,
        doctor_id: Uuid,
        candidate: DateTime<Utc>,
        existing: &[Appointment],
    ) -> bool {
        self.find_conflicts(doctor_id, candidate, existing).is_empty()
    }
}

impl Default for ConflictChecker {
    fn default() -> Self {
        Self::new(Duration::minutes(15))
    }
}
