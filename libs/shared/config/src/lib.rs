use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub sendgrid_api_key: String,
    pub sendgrid_from_email: String,
    pub sendgrid_base_url: String,
    /// Offset of the clinic's wall clock from UTC. IST is +330 and has no DST.
    pub clinic_utc_offset_minutes: i32,
    pub booking_min_separation_minutes: i64,
    pub reminder_interval_secs: u64,
    pub reminder_window_secs: i64,
    pub reminder_catch_up_secs: i64,
    pub notification_timeout_secs: u64,
    /// Confirmation mails in flight at once; further ones wait their turn.
    pub confirmation_concurrency: usize,
    pub qr_image_size: u32,
    pub reschedule_conflict_check: bool,
    pub server_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            sendgrid_api_key: String::new(),
            sendgrid_from_email: String::new(),
            sendgrid_base_url: "https://api.sendgrid.com".to_string(),
            clinic_utc_offset_minutes: 330,
            booking_min_separation_minutes: 15,
            reminder_interval_secs: 60,
            reminder_window_secs: 60,
            reminder_catch_up_secs: 0,
            notification_timeout_secs: 10,
            confirmation_concurrency: 4,
            qr_image_size: 320,
            reschedule_conflict_check: false,
            server_port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using in-memory storage");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            sendgrid_api_key: env::var("SENDGRID_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("SENDGRID_API_KEY not set, notifications will only be logged");
                    String::new()
                }),
            sendgrid_from_email: env::var("SENDGRID_FROM_EMAIL")
                .unwrap_or_else(|_| {
                    warn!("SENDGRID_FROM_EMAIL not set, using empty value");
                    String::new()
                }),
            sendgrid_base_url: env::var("SENDGRID_BASE_URL")
                .unwrap_or(defaults.sendgrid_base_url),
            clinic_utc_offset_minutes: parse_or("CLINIC_UTC_OFFSET_MINUTES", defaults.clinic_utc_offset_minutes),
            booking_min_separation_minutes: parse_or("BOOKING_MIN_SEPARATION_MINUTES", defaults.booking_min_separation_minutes),
            reminder_interval_secs: parse_or("REMINDER_INTERVAL_SECS", defaults.reminder_interval_secs),
            reminder_window_secs: parse_or("REMINDER_WINDOW_SECS", defaults.reminder_window_secs),
            reminder_catch_up_secs: parse_or("REMINDER_CATCH_UP_SECS", defaults.reminder_catch_up_secs),
            notification_timeout_secs: parse_or("NOTIFICATION_TIMEOUT_SECS", defaults.notification_timeout_secs),
            confirmation_concurrency: parse_or("CONFIRMATION_CONCURRENCY", defaults.confirmation_concurrency),
            qr_image_size: parse_or("QR_IMAGE_SIZE", defaults.qr_image_size),
            reschedule_conflict_check: parse_or("RESCHEDULE_CONFLICT_CHECK", defaults.reschedule_conflict_check),
            server_port: parse_or("SERVER_PORT", defaults.server_port),
        };

        if !config.is_configured() {
            warn!("Database not configured - appointments will not survive a restart");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
    }

    pub fn is_email_configured(&self) -> bool {
        !self.sendgrid_api_key.is_empty()
            && !self.sendgrid_from_email.is_empty()
            && !self.sendgrid_base_url.is_empty()
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {:?}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
