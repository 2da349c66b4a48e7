//! Rotation Timer - a shared countdown timer service for chapter meetings
//!
//! This is the main entry point for the rotation-timer application.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use rotation_timer::{
    api::create_router,
    auth::{Principal, Role},
    config::Config,
    state::AppState,
    store::MemoryDocStore,
    tasks::spawn_ticker,
    timer::TimerStore,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "rotation_timer={},tower_http=info",
            config.log_level()
        ))
        .init();

    info!("Starting rotation-timer server");
    info!(
        "Configuration: host={}, port={}, tick={}ms, auto-switch={}",
        config.host,
        config.port,
        config.tick_ms,
        !config.no_auto_switch
    );

    let timer = TimerStore::new(Arc::new(MemoryDocStore::new()));

    // Provision the timer document up front so the first subscriber sees a
    // concrete idle state rather than an absent document.
    timer.ensure_exists().await?;

    // The service ticker keeps a fresh view for /status and, unless
    // disabled, auto-advances the phase under a regent service principal
    // even when no controller has the page open.
    let ticker_user = if config.no_auto_switch {
        None
    } else {
        Some(Principal::new(
            config.service_uid.clone(),
            config.service_email.clone(),
            Role::Regent,
        ))
    };
    let ticker = spawn_ticker(timer.clone(), ticker_user, config.tick_period());

    let state = Arc::new(AppState::new(
        timer,
        ticker.view(),
        config.host.clone(),
        config.port,
    ));

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /timer/start     - Start a session from the main phase");
    info!("  POST /timer/pause     - Pause the running countdown");
    info!("  POST /timer/resume    - Resume a paused countdown");
    info!("  POST /timer/reset     - Return the timer to idle");
    info!("  POST /timer/durations - Save leg durations");
    info!("  GET  /timer           - Timer document and remaining time");
    info!("  GET  /status          - Server status and ticker view");
    info!("  GET  /health          - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    ticker.stop();
    info!("Server shutdown complete");
    Ok(())
}
