// libs/appointment-cell/tests/booking_test.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Duration as ChronoDuration;
use uuid::Uuid;

use appointment_cell::{AppointmentError, AppointmentStatus, AppointmentStore};
use notification_cell::test_utils::RecordingChannel;
use shared_config::AppConfig;

use common::{at, TestClinic};

#[tokio::test]
async fn booking_persists_scheduled_appointment_without_reminder() {
    let clinic = TestClinic::new().await;

    let appointment = clinic.coordinator
        .book(clinic.patient.id, clinic.doctor.id, at(10, 0))
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Scheduled);
    assert!(!appointment.reminder_sent);
    assert_eq!(appointment.scheduled_at, Some(at(10, 0)));

    let stored = clinic.store.get(appointment.id).await.unwrap().unwrap();
    assert_eq!(stored, appointment);
}

#[tokio::test]
async fn slot_ten_minutes_away_is_rejected_twenty_minutes_away_is_accepted() {
    let clinic = TestClinic::new().await;
    clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(10, 0)).await.unwrap();

    let rejected = clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(10, 10)).await;
    assert_matches!(rejected, Err(AppointmentError::SlotUnavailable));

    let accepted = clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(10, 20)).await;
    assert!(accepted.is_ok());
    assert_eq!(clinic.store.len().await, 2);
}

#[tokio::test]
async fn slot_exactly_fifteen_minutes_away_is_accepted() {
    let clinic = TestClinic::new().await;
    clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(10, 0)).await.unwrap();

    assert!(clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(10, 15)).await.is_ok());
    assert!(clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(9, 45)).await.is_ok());
}

#[tokio::test]
async fn earlier_slot_within_separation_is_rejected_too() {
    let clinic = TestClinic::new().await;
    clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(10, 0)).await.unwrap();

    let rejected = clinic.coordinator
        .book(clinic.patient.id, clinic.doctor.id, at(10, 0) - ChronoDuration::minutes(14))
        .await;
    assert_matches!(rejected, Err(AppointmentError::SlotUnavailable));
}

#[tokio::test]
async fn other_doctors_are_independent() {
    let clinic = TestClinic::new().await;
    let second_doctor = clinic.add_doctor("mehta").await;
    clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(10, 0)).await.unwrap();

    assert!(clinic.coordinator.book(clinic.patient.id, second_doctor.id, at(10, 0)).await.is_ok());
}

#[tokio::test]
async fn unknown_patient_is_not_found_and_nothing_is_stored() {
    let clinic = TestClinic::new().await;

    let result = clinic.coordinator.book(Uuid::new_v4(), clinic.doctor.id, at(10, 0)).await;

    assert_matches!(result, Err(AppointmentError::PatientNotFound));
    assert!(clinic.store.is_empty().await);
}

#[tokio::test]
async fn unknown_doctor_is_not_found_and_nothing_is_stored() {
    let clinic = TestClinic::new().await;

    let result = clinic.coordinator.book(clinic.patient.id, Uuid::new_v4(), at(10, 0)).await;

    assert_matches!(result, Err(AppointmentError::DoctorNotFound));
    assert!(clinic.store.is_empty().await);
}

#[tokio::test]
async fn identities_must_have_the_right_role() {
    let clinic = TestClinic::new().await;

    // doctor id used as patient and vice versa
    let result = clinic.coordinator.book(clinic.doctor.id, clinic.patient.id, at(10, 0)).await;

    assert_matches!(result, Err(AppointmentError::PatientNotFound));
    assert!(clinic.store.is_empty().await);
}

#[tokio::test]
async fn patient_cannot_book_themselves() {
    let clinic = TestClinic::new().await;

    let result = clinic.coordinator.book(clinic.doctor.id, clinic.doctor.id, at(10, 0)).await;

    assert_matches!(result, Err(AppointmentError::ValidationError(_)));
    assert!(clinic.store.is_empty().await);
}

#[tokio::test]
async fn past_instants_are_accepted() {
    let clinic = TestClinic::new().await;
    let long_ago = chrono::Utc::now() - ChronoDuration::days(365);

    assert!(clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, long_ago).await.is_ok());
}

#[tokio::test]
async fn confirmation_is_sent_after_booking() {
    let clinic = TestClinic::new().await;

    // 04:30 UTC is 10:00 in the clinic
    let appointment = clinic.coordinator
        .book(clinic.patient.id, clinic.doctor.id, at(4, 30))
        .await
        .unwrap();

    assert!(clinic.channel.wait_for_confirmations(1, Duration::from_secs(2)).await);
    let sent = clinic.channel.confirmations();
    assert_eq!(sent[0].appointment_id, appointment.id);
    assert_eq!(sent[0].to_email, "asha@example.com");
    assert_eq!(sent[0].doctor_name, "rao");
    assert_eq!(sent[0].specialty, "Cardiology");
    assert_eq!(sent[0].date, "2024-01-01");
    assert_eq!(sent[0].time, "10:00");
    assert!(!sent[0].qr_png.is_empty());
}

#[tokio::test]
async fn rejected_booking_sends_no_confirmation() {
    let clinic = TestClinic::new().await;
    clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(10, 0)).await.unwrap();
    assert!(clinic.channel.wait_for_confirmations(1, Duration::from_secs(2)).await);

    let _ = clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(10, 5)).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(clinic.channel.confirmations().len(), 1);
}

#[tokio::test]
async fn failing_channel_never_fails_booking() {
    let clinic = TestClinic::with_channel(RecordingChannel::failing()).await;

    let appointment = clinic.coordinator
        .book(clinic.patient.id, clinic.doctor.id, at(10, 0))
        .await
        .unwrap();

    assert!(clinic.channel.wait_for_confirmations(1, Duration::from_secs(2)).await);
    assert!(clinic.store.get(appointment.id).await.unwrap().is_some());
}

#[tokio::test]
async fn hanging_channel_does_not_delay_booking() {
    let clinic = TestClinic::with_channel(RecordingChannel::hanging()).await;

    let booked = tokio::time::timeout(
        Duration::from_secs(2),
        clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(10, 0)),
    )
    .await
    .expect("booking must not wait for the channel");

    assert!(booked.is_ok());
}

// Bookings are serialized per doctor: of two identical concurrent requests
// exactly one is stored, the other sees the first and is rejected.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_bookings_only_one_wins() {
    let clinic = TestClinic::new().await;
    let other_patient = clinic.add_patient("ravi").await;

    let first = {
        let coordinator = Arc::clone(&clinic.coordinator);
        let (patient, doctor) = (clinic.patient.id, clinic.doctor.id);
        tokio::spawn(async move { coordinator.book(patient, doctor, at(10, 0)).await })
    };
    let second = {
        let coordinator = Arc::clone(&clinic.coordinator);
        let (patient, doctor) = (other_patient.id, clinic.doctor.id);
        tokio::spawn(async move { coordinator.book(patient, doctor, at(10, 0)).await })
    };

    let results = vec![first.await.unwrap(), second.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let rejections = results
        .iter()
        .filter(|r| matches!(r, Err(AppointmentError::SlotUnavailable)))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(rejections, 1);
    assert_eq!(clinic.store.list_by_doctor(clinic.doctor.id).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_bookings_never_double_book() {
    let clinic = TestClinic::new().await;

    let attempts = (0..20).map(|i| {
        let coordinator = Arc::clone(&clinic.coordinator);
        let (patient, doctor) = (clinic.patient.id, clinic.doctor.id);
        // every attempt lands within 10 minutes of the others
        let candidate = at(10, 0) + ChronoDuration::seconds(i * 30);
        tokio::spawn(async move { coordinator.book(patient, doctor, candidate).await })
    });

    let results = futures::future::join_all(attempts).await;
    let successes = results.into_iter().filter(|r| matches!(r, Ok(Ok(_)))).count();

    assert_eq!(successes, 1);
}

#[tokio::test]
async fn listings_by_doctor_and_patient() {
    let clinic = TestClinic::new().await;
    let second_patient = clinic.add_patient("ravi").await;
    clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(10, 0)).await.unwrap();
    clinic.coordinator.book(second_patient.id, clinic.doctor.id, at(11, 0)).await.unwrap();

    let by_doctor = clinic.coordinator.appointments_by_doctor(clinic.doctor.id).await.unwrap();
    assert_eq!(by_doctor.len(), 2);

    let by_patient = clinic.coordinator.appointments_by_patient(second_patient.id).await.unwrap();
    assert_eq!(by_patient.len(), 1);
    assert_eq!(by_patient[0].scheduled_at, Some(at(11, 0)));

    assert!(clinic.coordinator.appointments_by_patient(Uuid::new_v4()).await.unwrap().is_empty());
    assert_eq!(clinic.coordinator.all_appointments().await.unwrap().len(), 2);
}

// Rescheduling does not consult the conflict checker unless enabled, so a
// move onto an occupied slot goes through by default.
#[tokio::test]
async fn reschedule_does_not_recheck_conflicts_by_default() {
    let clinic = TestClinic::new().await;
    clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(10, 0)).await.unwrap();
    let movable = clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(12, 0)).await.unwrap();

    let moved = clinic.coordinator.reschedule(movable.id, at(10, 5)).await.unwrap();

    assert_eq!(moved.scheduled_at, Some(at(10, 5)));
}

#[tokio::test]
async fn reschedule_rechecks_conflicts_when_enabled() {
    let clinic = TestClinic::with_config(AppConfig {
        reschedule_conflict_check: true,
        ..AppConfig::default()
    })
    .await;
    clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(10, 0)).await.unwrap();
    let movable = clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(12, 0)).await.unwrap();

    let rejected = clinic.coordinator.reschedule(movable.id, at(10, 5)).await;
    assert_matches!(rejected, Err(AppointmentError::SlotUnavailable));

    // moving next to its own old time is fine
    let moved = clinic.coordinator.reschedule(movable.id, at(12, 5)).await.unwrap();
    assert_eq!(moved.scheduled_at, Some(at(12, 5)));
}

#[tokio::test]
async fn reschedule_keeps_reminder_flag() {
    let clinic = TestClinic::new().await;
    let appointment = clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(10, 0)).await.unwrap();
    clinic.store.mark_reminder_sent(appointment.id).await.unwrap();

    let moved = clinic.coordinator.reschedule(appointment.id, at(15, 0)).await.unwrap();

    assert!(moved.reminder_sent);
}

#[tokio::test]
async fn reschedule_of_unknown_appointment_is_not_found() {
    let clinic = TestClinic::new().await;

    assert_matches!(
        clinic.coordinator.reschedule(Uuid::new_v4(), at(10, 0)).await,
        Err(AppointmentError::NotFound)
    );
}

#[tokio::test]
async fn cancelled_appointment_frees_its_slot() {
    let clinic = TestClinic::new().await;
    let appointment = clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(10, 0)).await.unwrap();

    let cancelled = clinic.coordinator.cancel(appointment.id).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

    assert!(clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(10, 0)).await.is_ok());
}

#[tokio::test]
async fn cancelled_appointment_cannot_be_rescheduled() {
    let clinic = TestClinic::new().await;
    let appointment = clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(10, 0)).await.unwrap();
    clinic.coordinator.cancel(appointment.id).await.unwrap();

    assert_matches!(
        clinic.coordinator.reschedule(appointment.id, at(11, 0)).await,
        Err(AppointmentError::ValidationError(_))
    );
}

#[tokio::test]
async fn delete_removes_record_and_unknown_id_is_not_found() {
    let clinic = TestClinic::new().await;
    let appointment = clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(10, 0)).await.unwrap();

    clinic.coordinator.delete(appointment.id).await.unwrap();

    assert_matches!(clinic.coordinator.get_appointment(appointment.id).await, Err(AppointmentError::NotFound));
    assert_matches!(clinic.coordinator.delete(appointment.id).await, Err(AppointmentError::NotFound));
}

#[tokio::test]
async fn ids_are_unique_across_bookings() {
    let clinic = TestClinic::new().await;
    let first = clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(9, 0)).await.unwrap();
    let second = clinic.coordinator.book(clinic.patient.id, clinic.doctor.id, at(11, 0)).await.unwrap();

    assert_ne!(first.id, second.id);
}
