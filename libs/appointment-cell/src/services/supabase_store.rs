// libs/appointment-cell/src/services/supabase_store.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, ReminderWindow};
use crate::services::store::AppointmentStore;

const APPOINTMENTS: &str = "/rest/v1/appointments";

/// `appointments` table behind PostgREST.
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch(&self, query: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!("{}?{}&order=scheduled_at.asc.nullsfirst", APPOINTMENTS, query);

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        parse_rows(result)
    }

    async fn patch_one(&self, appointment_id: Uuid, body: Value) -> Result<Appointment, AppointmentError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS, appointment_id);

        let result: Vec<Value> = self.supabase.request(
            Method::PATCH,
            &path,
            Some(body),
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        parse_rows(result)?
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let body = serde_json::to_value(&appointment)
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to encode appointment: {}", e)))?;

        let result: Vec<Value> = self.supabase.request(
            Method::POST,
            APPOINTMENTS,
            Some(body),
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let stored = parse_rows(result)?
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("Insert returned no rows".to_string()))?;

        debug!("Stored appointment {}", stored.id);
        Ok(stored)
    }

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        let rows = self.fetch(&format!("id=eq.{}", appointment_id)).await?;
        Ok(rows.into_iter().next())
    }

    async fn list_all(&self) -> Result<Vec<Appointment>, AppointmentError> {
        self.fetch("select=*").await
    }

    async fn list_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        self.fetch(&format!("doctor_id=eq.{}", doctor_id)).await
    }

    async fn list_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        self.fetch(&format!("patient_id=eq.{}", patient_id)).await
    }

    async fn due_for_reminder(&self, window: &ReminderWindow) -> Result<Vec<Appointment>, AppointmentError> {
        let query = format!(
            "status=eq.{}&reminder_sent=is.false&scheduled_at=gte.{}&scheduled_at=lt.{}",
            AppointmentStatus::Scheduled,
            timestamp_param(window.start),
            timestamp_param(window.end),
        );

        self.fetch(&query).await
    }

    async fn mark_reminder_sent(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        self.patch_one(appointment_id, json!({ "reminder_sent": true }))
            .await
            .map(|_| ())
    }

    async fn update_scheduled_at(
        &self,
        appointment_id: Uuid,
        scheduled_at: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        self.patch_one(appointment_id, json!({ "scheduled_at": scheduled_at })).await
    }

    async fn update_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        self.patch_one(appointment_id, json!({ "status": status })).await
    }

    async fn delete(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS, appointment_id);

        let deleted: Vec<Value> = self.supabase.request(
            Method::DELETE,
            &path,
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if deleted.is_empty() {
            return Err(AppointmentError::NotFound);
        }
        Ok(())
    }
}

/// UTC with a `Z` suffix, so the value needs no URL escaping.
fn timestamp_param(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_rows(rows: Vec<Value>) -> Result<Vec<Appointment>, AppointmentError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Appointment>, _>>()
        .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))
}
