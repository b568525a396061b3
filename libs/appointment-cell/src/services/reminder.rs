// libs/appointment-cell/src/services/reminder.rs
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use notification_cell::{NotificationDispatcher, ReminderDetails};
use shared_config::AppConfig;

use crate::models::{Appointment, AppointmentError, ReminderScanReport, ReminderWindow};
use crate::services::identity::IdentityStore;
use crate::services::store::AppointmentStore;

/// Periodic scan that sends one reminder per appointment shortly before it
/// starts.
///
/// `reminder_sent` is set after every dispatch attempt, failed or not, and
/// appointments carrying the flag are never selected again. Scans are
/// serialized, so a manual scan and a timer tick never select the same
/// unmarked rows.
pub struct ReminderScanner {
    store: Arc<dyn AppointmentStore>,
    identities: Arc<dyn IdentityStore>,
    dispatcher: Arc<NotificationDispatcher>,
    interval: Duration,
    window: ChronoDuration,
    catch_up: ChronoDuration,
    scan_guard: Mutex<()>,
}

impl ReminderScanner {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        identities: Arc<dyn IdentityStore>,
        dispatcher: Arc<NotificationDispatcher>,
        config: &AppConfig,
    ) -> Self {
        if config.reminder_window_secs < 1 {
            warn!("Reminder window of {}s is empty, using 1s", config.reminder_window_secs);
        }

        Self {
            store,
            identities,
            dispatcher,
            interval: Duration::from_secs(config.reminder_interval_secs.max(1)),
            window: ChronoDuration::seconds(config.reminder_window_secs.max(1)),
            catch_up: ChronoDuration::seconds(config.reminder_catch_up_secs.max(0)),
            scan_guard: Mutex::new(()),
        }
    }

    pub fn window_at(&self, now: DateTime<Utc>) -> ReminderWindow {
        ReminderWindow::for_tick(now, self.window, self.catch_up)
    }

    /// One tick against the wall clock.
    pub async fn run_reminder_scan(&self) -> Result<ReminderScanReport, AppointmentError> {
        self.scan_at(Utc::now()).await
    }

    /// One tick as if the clock read `now`. Waits for a scan already in
    /// progress, then sees the rows it marked.
    #[instrument(skip(self))]
    pub async fn scan_at(&self, now: DateTime<Utc>) -> Result<ReminderScanReport, AppointmentError> {
        let _scan = self.scan_guard.lock().await;

        let window = self.window_at(now);
        debug!("Scanning for reminders in [{}, {})", window.start, window.end);

        let due: Vec<Appointment> = self.store
            .due_for_reminder(&window)
            .await?
            .into_iter()
            .filter(|appointment| appointment.is_due_for_reminder(&window))
            .collect();

        let mut report = ReminderScanReport {
            due: due.len(),
            ..ReminderScanReport::default()
        };

        for appointment in &due {
            self.remind(appointment, &mut report).await;
        }

        Ok(report)
    }

    async fn remind(&self, appointment: &Appointment, report: &mut ReminderScanReport) {
        let Some(details) = self.reminder_details(appointment).await else {
            report.skipped += 1;
            return;
        };

        match self.dispatcher.send_reminder(&details).await {
            Ok(()) => {
                report.dispatched += 1;
                info!(appointment_id = %appointment.id, "Reminder sent to {}", details.patient_email);
            }
            Err(e) => {
                report.dispatch_failures += 1;
                warn!(
                    appointment_id = %appointment.id,
                    domain = ?e.domain(),
                    "Reminder not delivered, marking as attempted: {}", e
                );
            }
        }

        match self.store.mark_reminder_sent(appointment.id).await {
            Ok(()) => report.marked += 1,
            Err(e) => {
                report.mark_failures += 1;
                error!(
                    appointment_id = %appointment.id,
                    "Failed to record reminder, it stays eligible for later ticks: {}", e
                );
            }
        }
    }

    /// `None` when either party is missing; the appointment is left unmarked.
    async fn reminder_details(&self, appointment: &Appointment) -> Option<ReminderDetails> {
        let scheduled_at = appointment.scheduled_at?;

        let patient = match self.identities.resolve(appointment.patient_id).await {
            Ok(Some(patient)) => patient,
            Ok(None) => {
                warn!(appointment_id = %appointment.id, "Patient {} not found, skipping reminder", appointment.patient_id);
                return None;
            }
            Err(e) => {
                warn!(appointment_id = %appointment.id, "Patient lookup failed, skipping reminder: {}", e);
                return None;
            }
        };

        let doctor = match self.identities.resolve(appointment.doctor_id).await {
            Ok(Some(doctor)) => doctor,
            Ok(None) => {
                warn!(appointment_id = %appointment.id, "Doctor {} not found, skipping reminder", appointment.doctor_id);
                return None;
            }
            Err(e) => {
                warn!(appointment_id = %appointment.id, "Doctor lookup failed, skipping reminder: {}", e);
                return None;
            }
        };

        Some(ReminderDetails {
            appointment_id: appointment.id,
            patient_name: patient.display_name,
            patient_email: patient.email,
            doctor_name: doctor.display_name,
            scheduled_at,
        })
    }

    /// Run the scan on its own task until the returned handle is shut down.
    ///
    /// Ticks never overlap: a slow scan delays the next one and ticks missed
    /// meanwhile are skipped.
    pub fn start(self: Arc<Self>) -> ReminderScannerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let scanner = self;

        let task = tokio::spawn(async move {
            info!("Reminder scanner started, ticking every {:?}", scanner.interval);

            let mut ticker = tokio::time::interval(scanner.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match scanner.run_reminder_scan().await {
                            Ok(report) if report.due > 0 => info!(?report, "Reminder scan finished"),
                            Ok(_) => debug!("Reminder scan found nothing due"),
                            Err(e) => error!("Reminder scan failed: {}", e),
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Reminder scanner stopped");
        });

        ReminderScannerHandle { shutdown_tx, task }
    }
}

/// Owner of a running scanner task.
pub struct ReminderScannerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReminderScannerHandle {
    /// Stop ticking and wait for an in-flight scan to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            error!("Reminder scanner task ended abnormally: {}", e);
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}
