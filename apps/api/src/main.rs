use std::net::SocketAddr;
use std::sync::Arc;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::{
    AppointmentState, AppointmentStore, BookingCoordinator, IdentityStore,
    InMemoryAppointmentStore, InMemoryIdentityStore, ReminderScanner,
    SupabaseAppointmentStore, SupabaseIdentityStore,
};
use notification_cell::NotificationDispatcher;
use shared_config::AppConfig;
use shared_database::SupabaseClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic scheduler");

    // Load configuration
    let config = AppConfig::from_env();

    let (store, identities): (Arc<dyn AppointmentStore>, Arc<dyn IdentityStore>) = if config.is_configured() {
        let supabase = Arc::new(SupabaseClient::new(&config));
        (
            Arc::new(SupabaseAppointmentStore::new(Arc::clone(&supabase))),
            Arc::new(SupabaseIdentityStore::new(supabase)),
        )
    } else {
        warn!("Supabase is not configured, appointments are kept in memory and no identities are known");
        (
            Arc::new(InMemoryAppointmentStore::new()),
            Arc::new(InMemoryIdentityStore::new()),
        )
    };

    let dispatcher = Arc::new(NotificationDispatcher::from_config(&config));

    let coordinator = Arc::new(BookingCoordinator::new(
        Arc::clone(&store),
        Arc::clone(&identities),
        Arc::clone(&dispatcher),
        &config,
    ));
    let scanner = Arc::new(ReminderScanner::new(store, identities, dispatcher, &config));
    let reminders = Arc::clone(&scanner).start();

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Create shared state
    let state = Arc::new(AppointmentState { coordinator, scanner });

    // Build the application router
    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reminders.shutdown().await;
    info!("Clinic scheduler stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
