//! HTTP server for Cluby: account registration, sign-in, and server-side role resolution.
//!
//! Clients never read the directory themselves; `/api/auth/me` runs the same
//! reconciliation the session context uses and returns the resolved user.

pub mod error;
pub mod routes;
pub mod settings;
pub mod state;

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use api::auth::AuthConfig;
use api::db::{connect, migrate, PgDirectory, PgIdentity};

pub use error::ApiError;
pub use routes::router;
pub use settings::Settings;
pub use state::AppState;

/// Connect, migrate, and serve until Ctrl-C or SIGTERM.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let pool = connect(&settings.database.url(), settings.database.max_connections)
        .await
        .context("connecting to database")?;
    migrate(&pool).await.context("running migrations")?;

    let session_ttl = chrono::Duration::hours(settings.auth.session_ttl_hours);
    let state = AppState::new(
        Arc::new(PgIdentity::new(pool.clone(), session_ttl)),
        Arc::new(PgDirectory::new(pool)),
        AuthConfig::new(settings.auth.admin_email_suffix),
    );

    let address = settings.server.address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving requests")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
