//! Serves the math assistant web app.

#[macro_use]
extern crate tracing;

use std::process::ExitCode;
use std::sync::Arc;

use math_assistant::AppConfig;
use math_assistant::server::{self, AppState};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    debug!("configuration: {config:?}");

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(err) => {
            eprintln!("failed to set up the agent: {err}");
            return ExitCode::FAILURE;
        }
    };

    let listener = match TcpListener::bind(config.addr).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("failed to listen on {}: {err}", config.addr);
            return ExitCode::FAILURE;
        }
    };
    info!("listening on http://{}", config.addr);

    let state = Arc::new(state);
    state.spawn_sweeper();
    if let Err(err) = axum::serve(listener, server::router(state)).await {
        error!("server stopped: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
