// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use notification_cell::{ConfirmationDetails, NotificationDispatcher};
use shared_config::AppConfig;
use shared_models::identity::{Identity, IdentityRole};

use crate::models::{Appointment, AppointmentError, AppointmentStatus, SchedulingPolicy};
use crate::services::conflict::ConflictChecker;
use crate::services::identity::IdentityStore;
use crate::services::locks::DoctorLocks;
use crate::services::store::AppointmentStore;

/// Books, moves and removes appointments.
///
/// Booking success means the appointment was persisted. The confirmation
/// mail is sent afterwards on its own task and its outcome never reaches the
/// caller.
pub struct BookingCoordinator {
    store: Arc<dyn AppointmentStore>,
    identities: Arc<dyn IdentityStore>,
    dispatcher: Arc<NotificationDispatcher>,
    checker: ConflictChecker,
    locks: DoctorLocks,
    policy: SchedulingPolicy,
}

impl BookingCoordinator {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        identities: Arc<dyn IdentityStore>,
        dispatcher: Arc<NotificationDispatcher>,
        config: &AppConfig,
    ) -> Self {
        Self::with_policy(store, identities, dispatcher, SchedulingPolicy::from_config(config))
    }

    pub fn with_policy(
        store: Arc<dyn AppointmentStore>,
        identities: Arc<dyn IdentityStore>,
        dispatcher: Arc<NotificationDispatcher>,
        policy: SchedulingPolicy,
    ) -> Self {
        Self {
            store,
            identities,
            dispatcher,
            checker: ConflictChecker::new(policy.min_separation),
            locks: DoctorLocks::new(),
            policy,
        }
    }

    /// Book `doctor_id` for `patient_id` at `scheduled_at`.
    ///
    /// Past instants are accepted.
    #[instrument(skip(self))]
    pub async fn book(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        scheduled_at: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        info!("Booking appointment for patient {} with doctor {} at {}", patient_id, doctor_id, scheduled_at);

        if patient_id == doctor_id {
            return Err(AppointmentError::ValidationError(
                "Patient and doctor must be different people".to_string()
            ));
        }

        let patient = self.resolve_role(patient_id, IdentityRole::Patient).await?
            .ok_or(AppointmentError::PatientNotFound)?;
        let doctor = self.resolve_role(doctor_id, IdentityRole::Doctor).await?
            .ok_or(AppointmentError::DoctorNotFound)?;

        let appointment = {
            let _doctor_guard = self.locks.acquire(doctor_id).await;

            let existing = self.store.list_by_doctor(doctor_id).await?;
            let conflicts = self.checker.find_conflicts(doctor_id, scheduled_at, &existing);
            if let Some(conflict) = conflicts.first() {
                warn!(
                    conflicting_appointment = %conflict.id,
                    "Slot at {} rejected for doctor {} - {} conflicting appointments",
                    scheduled_at, doctor_id, conflicts.len()
                );
                return Err(AppointmentError::SlotUnavailable);
            }

            self.store
                .insert(Appointment::scheduled(patient_id, doctor_id, scheduled_at))
                .await?
        };

        info!(appointment_id = %appointment.id, "Appointment booked");

        self.confirm(&appointment, scheduled_at, &patient, &doctor);

        Ok(appointment)
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        self.store.get(appointment_id).await?.ok_or(AppointmentError::NotFound)
    }

    pub async fn all_appointments(&self) -> Result<Vec<Appointment>, AppointmentError> {
        self.store.list_all().await
    }

    pub async fn appointments_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        self.store.list_by_doctor(doctor_id).await
    }

    pub async fn appointments_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        self.store.list_by_patient(patient_id).await
    }

    /// Move an appointment to `new_time`.
    ///
    /// Unless `reschedule_conflict_check` is enabled the new time is not
    /// checked against the doctor's other bookings. `reminder_sent` is kept
    /// as is, so an appointment already reminded is not reminded again.
    #[instrument(skip(self))]
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        new_time: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id).await?;
        if !current.is_active() {
            return Err(AppointmentError::ValidationError(
                "Cancelled appointments cannot be rescheduled".to_string()
            ));
        }

        if !self.policy.reschedule_conflict_check {
            let updated = self.store.update_scheduled_at(appointment_id, new_time).await?;
            info!("Appointment {} moved to {} without conflict check", appointment_id, new_time);
            return Ok(updated);
        }

        let _doctor_guard = self.locks.acquire(current.doctor_id).await;

        let others: Vec<Appointment> = self.store
            .list_by_doctor(current.doctor_id)
            .await?
            .into_iter()
            .filter(|appointment| appointment.id != appointment_id)
            .collect();

        if !self.checker.is_slot_available(current.doctor_id, new_time, &others) {
            warn!("Reschedule of {} to {} rejected: slot taken", appointment_id, new_time);
            return Err(AppointmentError::SlotUnavailable);
        }

        let updated = self.store.update_scheduled_at(appointment_id, new_time).await?;
        info!("Appointment {} moved to {}", appointment_id, new_time);
        Ok(updated)
    }

    /// Cancelled appointments stay on record but free their slot and get no reminder.
    #[instrument(skip(self))]
    pub async fn cancel(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let cancelled = self.store
            .update_status(appointment_id, AppointmentStatus::Cancelled)
            .await?;

        info!("Appointment {} cancelled", appointment_id);
        Ok(cancelled)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        self.store.delete(appointment_id).await?;

        info!("Appointment {} deleted", appointment_id);
        Ok(())
    }

    async fn resolve_role(&self, id: Uuid, role: IdentityRole) -> Result<Option<Identity>, AppointmentError> {
        let identity = self.identities.resolve(id).await?;

        Ok(identity.filter(|identity| {
            let matches = identity.role == role;
            if !matches {
                debug!("Identity {} has role {}, expected {}", id, identity.role, role);
            }
            matches
        }))
    }

    fn confirm(
        &self,
        appointment: &Appointment,
        scheduled_at: DateTime<Utc>,
        patient: &Identity,
        doctor: &Identity,
    ) {
        let details = ConfirmationDetails {
            appointment_id: appointment.id,
            patient_name: patient.display_name.clone(),
            patient_email: patient.email.clone(),
            doctor_name: doctor.display_name.clone(),
            specialty: doctor.specialty.clone(),
            scheduled_at,
        };

        // Detached; the task logs its own outcome.
        drop(self.dispatcher.dispatch_confirmation(details));
    }
}
