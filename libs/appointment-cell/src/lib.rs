pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

// Re-export all models and services for external use
pub use models::*;
pub use services::*;

pub use router::{appointment_routes, AppointmentState};
