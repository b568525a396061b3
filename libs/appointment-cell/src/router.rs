// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::handlers;
use crate::services::{BookingCoordinator, ReminderScanner};

/// Services shared by every appointment route.
pub struct AppointmentState {
    pub coordinator: Arc<BookingCoordinator>,
    pub scanner: Arc<ReminderScanner>,
}

pub fn appointment_routes(state: Arc<AppointmentState>) -> Router {
    Router::new()
        // Core appointment management
        .route("/", post(handlers::book_appointment).get(handlers::list_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment).delete(handlers::delete_appointment))
        .route("/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))

        // Appointment listings
        .route("/patients/{patient_id}", get(handlers::get_patient_appointments))
        .route("/doctors/{doctor_id}", get(handlers::get_doctor_appointments))

        // Reminders
        .route("/reminders/scan", post(handlers::run_reminder_scan))

        .with_state(state)
}
