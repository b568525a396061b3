pub mod booking;
pub mod conflict;
pub mod identity;
pub mod locks;
pub mod reminder;
pub mod store;
pub mod supabase_store;

pub use booking::BookingCoordinator;
pub use conflict::ConflictChecker;
pub use identity::{IdentityStore, InMemoryIdentityStore, SupabaseIdentityStore};
pub use locks::DoctorLocks;
pub use reminder::{ReminderScanner, ReminderScannerHandle};
pub use store::{AppointmentStore, InMemoryAppointmentStore};
pub use supabase_store::SupabaseAppointmentStore;
