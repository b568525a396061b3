// libs/appointment-cell/src/services/locks.rs
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async mutex per doctor. Holding the guard makes the
/// read-check-write sequence of a booking exclusive for that doctor within
/// this process; other doctors are unaffected.
///
/// Entries only live while some booking holds or waits on them.
#[derive(Default)]
pub struct DoctorLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl DoctorLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, doctor_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Holders and waiters keep their own clone, so a count of one is idle.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(doctor_id).or_default())
        };
        lock.lock_owned().await
    }
}
