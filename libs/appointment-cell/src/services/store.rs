// libs/appointment-cell/src/services/store.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, ReminderWindow};

/// Durable home of appointment records. Every method touches at most one
/// record for writes and must apply the change atomically.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError>;

    async fn list_all(&self) -> Result<Vec<Appointment>, AppointmentError>;

    async fn list_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, AppointmentError>;

    async fn list_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError>;

    /// Active appointments inside `window` whose reminder has not gone out.
    async fn due_for_reminder(&self, window: &ReminderWindow) -> Result<Vec<Appointment>, AppointmentError>;

    /// Set `reminder_sent`. Setting it again is a no-op.
    async fn mark_reminder_sent(&self, appointment_id: Uuid) -> Result<(), AppointmentError>;

    async fn update_scheduled_at(
        &self,
        appointment_id: Uuid,
        scheduled_at: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError>;

    async fn update_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError>;

    async fn delete(&self, appointment_id: Uuid) -> Result<(), AppointmentError>;
}

/// Process-local store, used when no database is configured and by tests.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.appointments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.appointments.read().await.is_empty()
    }

    async fn filtered<F>(&self, predicate: F) -> Vec<Appointment>
    where
        F: Fn(&Appointment) -> bool,
    {
        let appointments = self.appointments.read().await;
        let mut matching: Vec<Appointment> = appointments
            .values()
            .filter(|appointment| predicate(appointment))
            .cloned()
            .collect();
        // None sorts first, which keeps legacy rows at the front like the database does
        matching.sort_by_key(|appointment| (appointment.scheduled_at, appointment.created_at));
        matching
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        if appointments.contains_key(&appointment.id) {
            return Err(AppointmentError::DatabaseError(format!(
                "appointment {} already exists",
                appointment.id
            )));
        }
        appointments.insert(appointment.id, appointment.clone());
        debug!("Stored appointment {}", appointment.id);
        Ok(appointment)
    }

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.appointments.read().await.get(&appointment_id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.filtered(|_| true).await)
    }

    async fn list_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.filtered(|a| a.doctor_id == doctor_id).await)
    }

    async fn list_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.filtered(|a| a.patient_id == patient_id).await)
    }

    async fn due_for_reminder(&self, window: &ReminderWindow) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.filtered(|a| a.is_due_for_reminder(window)).await)
    }

    async fn mark_reminder_sent(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        let mut appointments = self.appointments.write().await;
        let appointment = appointments
            .get_mut(&appointment_id)
            .ok_or(AppointmentError::NotFound)?;
        appointment.reminder_sent = true;
        Ok(())
    }

    async fn update_scheduled_at(
        &self,
        appointment_id: Uuid,
        scheduled_at: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        let appointment = appointments
            .get_mut(&appointment_id)
            .ok_or(AppointmentError::NotFound)?;
        appointment.scheduled_at = Some(scheduled_at);
        Ok(appointment.clone())
    }

    async fn update_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        let appointment = appointments
            .get_mut(&appointment_id)
            .ok_or(AppointmentError::NotFound)?;
        appointment.status = status;
        Ok(appointment.clone())
    }

    async fn delete(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        self.appointments
            .write()
            .await
            .remove(&appointment_id)
            .map(|_| ())
            .ok_or(AppointmentError::NotFound)
    }
}
