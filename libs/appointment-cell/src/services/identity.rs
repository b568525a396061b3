// libs/appointment-cell/src/services/identity.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;
use shared_models::identity::{Identity, IdentityRole};

use crate::models::AppointmentError;

/// Read-only lookup of patients and doctors.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn resolve(&self, id: Uuid) -> Result<Option<Identity>, AppointmentError>;
}

#[derive(Default)]
pub struct InMemoryIdentityStore {
    identities: RwLock<HashMap<Uuid, Identity>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identities(identities: impl IntoIterator<Item = Identity>) -> Self {
        Self {
            identities: RwLock::new(identities.into_iter().map(|i| (i.id, i)).collect()),
        }
    }

    pub async fn upsert(&self, identity: Identity) {
        self.identities.write().await.insert(identity.id, identity);
    }

    pub async fn remove(&self, id: Uuid) {
        self.identities.write().await.remove(&id);
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn resolve(&self, id: Uuid) -> Result<Option<Identity>, AppointmentError> {
        Ok(self.identities.read().await.get(&id).cloned())
    }
}

#[derive(Debug, Deserialize)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    role: IdentityRole,
    #[serde(default)]
    specialty: Option<String>,
}

impl From<UserRow> for Identity {
    fn from(row: UserRow) -> Self {
        Identity {
            id: row.id,
            display_name: row.username,
            email: row.email,
            role: row.role,
            specialty: row.specialty,
        }
    }
}

/// `users` table behind PostgREST.
pub struct SupabaseIdentityStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseIdentityStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl IdentityStore for SupabaseIdentityStore {
    async fn resolve(&self, id: Uuid) -> Result<Option<Identity>, AppointmentError> {
        let path = format!(
            "/rest/v1/users?id=eq.{}&select=id,username,email,role,specialty",
            id
        );

        let rows: Vec<UserRow> = self.supabase.request(
            Method::GET,
            &path,
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().next().map(Identity::from))
    }
}
