//! Corebank API Server
//!
//! Main entry point for the Corebank backend service.

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use corebank_api::{AppState, create_router, jobs::EmiDeductionJob};
use corebank_db::connect_with;
use corebank_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(config.server.log_json);

    let db = connect_with(&config.database).await?;
    info!("Connected to database");

    let jwt_service = JwtService::new(JwtConfig::from(&config.jwt));
    let state = AppState::new(db.clone(), jwt_service);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = if config.jobs.emi_deduction_enabled {
        info!(run_hour = config.jobs.emi_run_hour, "EMI deduction scheduler enabled");
        Some(EmiDeductionJob::new(db).spawn(config.jobs.emi_run_hour, shutdown_rx))
    } else {
        info!("EMI deduction scheduler disabled");
        None
    };

    let app = create_router(state, config.server.cors_origin.as_deref());

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Corebank shutting down");
    if shutdown_tx.send(true).is_err() {
        warn!("EMI scheduler already stopped");
    }
    if let Some(handle) = scheduler {
        handle.await?;
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "corebank=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        () = terminate => info!("Received terminate signal, initiating graceful shutdown"),
    }
}
