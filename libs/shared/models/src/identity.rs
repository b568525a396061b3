use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Read-only view of a user as the scheduling core needs it.
///
/// Patients, doctors and receptionists share one flat record. Booking checks
/// the role tag; `specialty` is only populated for doctors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub role: IdentityRole,
    #[serde(default)]
    pub specialty: Option<String>,
}

impl Identity {
    pub fn patient(id: Uuid, display_name: &str, email: &str) -> Self {
        Self {
            id,
            display_name: display_name.to_string(),
            email: email.to_string(),
            role: IdentityRole::Patient,
            specialty: None,
        }
    }

    pub fn doctor(id: Uuid, display_name: &str, email: &str, specialty: &str) -> Self {
        Self {
            id,
            display_name: display_name.to_string(),
            email: email.to_string(),
            role: IdentityRole::Doctor,
            specialty: Some(specialty.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdentityRole {
    Patient,
    Doctor,
    Receptionist,
}

impl fmt::Display for IdentityRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityRole::Patient => write!(f, "PATIENT"),
            IdentityRole::Doctor => write!(f, "DOCTOR"),
            IdentityRole::Receptionist => write!(f, "RECEPTIONIST"),
        }
    }
}
