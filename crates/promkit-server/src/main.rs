//! promkit server
//!
//! - Loads `PROMKIT_CONFIG` (default `promkit.yaml`)
//! - Declares configured metrics against the resolved registry
//! - Serves `/healthz` and the metrics endpoint, counting inbound requests

use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use promkit_server::{app_state, config, router};

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "promkit-server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::var("PROMKIT_CONFIG").unwrap_or_else(|_| "promkit.yaml".into());
    let cfg = config::load_from_file(&path)?;
    let state = app_state::AppState::new(cfg)?;
    let listen = state.cfg().server.listen_addr()?;
    let app = router::build_router(state);

    tracing::info!(%listen, "promkit-server starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
