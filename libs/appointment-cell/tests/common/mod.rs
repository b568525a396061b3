// libs/appointment-cell/tests/common/mod.rs
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::{
    AppointmentStore, BookingCoordinator, InMemoryAppointmentStore, InMemoryIdentityStore,
    ReminderScanner,
};
use notification_cell::test_utils::RecordingChannel;
use notification_cell::{NotificationDispatcher, QrPngEncoder};
use shared_config::AppConfig;
use shared_models::identity::Identity;

pub struct TestClinic {
    pub config: AppConfig,
    pub store: Arc<InMemoryAppointmentStore>,
    pub identities: Arc<InMemoryIdentityStore>,
    pub channel: Arc<RecordingChannel>,
    pub coordinator: Arc<BookingCoordinator>,
    pub scanner: Arc<ReminderScanner>,
    pub patient: Identity,
    pub doctor: Identity,
}

impl TestClinic {
    pub async fn new() -> Self {
        Self::build(AppConfig::default(), RecordingChannel::succeeding()).await
    }

    pub async fn with_channel(channel: RecordingChannel) -> Self {
        Self::build(AppConfig::default(), channel).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        Self::build(config, RecordingChannel::succeeding()).await
    }

    pub async fn build(config: AppConfig, channel: RecordingChannel) -> Self {
        let store = Arc::new(InMemoryAppointmentStore::new());
        Self::build_with_store(config, channel, Arc::clone(&store) as Arc<dyn AppointmentStore>, store).await
    }

    /// `scanner_store` lets a test wrap the store the scanner writes through.
    pub async fn build_with_store(
        config: AppConfig,
        channel: RecordingChannel,
        scanner_store: Arc<dyn AppointmentStore>,
        store: Arc<InMemoryAppointmentStore>,
    ) -> Self {
        let patient = Identity::patient(Uuid::new_v4(), "asha", "asha@example.com");
        let doctor = Identity::doctor(Uuid::new_v4(), "rao", "rao@clinic.example", "Cardiology");
        let identities = Arc::new(InMemoryIdentityStore::with_identities([
            patient.clone(),
            doctor.clone(),
        ]));

        let channel = Arc::new(channel);
        let dispatcher = Arc::new(NotificationDispatcher::new(
            channel.clone(),
            Arc::new(QrPngEncoder),
            &config,
        ));

        let coordinator = Arc::new(BookingCoordinator::new(
            store.clone(),
            identities.clone(),
            Arc::clone(&dispatcher),
            &config,
        ));
        let scanner = Arc::new(ReminderScanner::new(
            scanner_store,
            identities.clone(),
            dispatcher,
            &config,
        ));

        Self {
            config,
            store,
            identities,
            channel,
            coordinator,
            scanner,
            patient,
            doctor,
        }
    }

    pub async fn add_doctor(&self, name: &str) -> Identity {
        let doctor = Identity::doctor(Uuid::new_v4(), name, &format!("{}@clinic.example", name), "General");
        self.identities.upsert(doctor.clone()).await;
        doctor
    }

    pub async fn add_patient(&self, name: &str) -> Identity {
        let patient = Identity::patient(Uuid::new_v4(), name, &format!("{}@example.com", name));
        self.identities.upsert(patient.clone()).await;
        patient
    }
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
}
