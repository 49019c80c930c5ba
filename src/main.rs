// SPDX-License-Identifier: MIT

//! Trip-Herald server
//!
//! Watches an activity-listing site for newly posted trips and announces
//! each one once to a Discord channel. Pipeline stages run as Cloud Tasks
//! callbacks against this server.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trip_herald::{
    config::Config,
    db::FirestoreDb,
    services::{DiscordClient, SourceClient, TasksService},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Trip-Herald");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    let user_agent = config.user_agent();
    let source = SourceClient::new(&config.source_base_url, &user_agent);
    tracing::info!(base_url = %config.source_base_url, "Source client initialized");

    // Initialize Cloud Tasks service
    let tasks_service = TasksService::new(
        &config.gcp_project_id,
        &config.gcp_region,
        &config.service_url,
    );
    tracing::info!(
        project = %config.gcp_project_id,
        "Cloud Tasks service initialized"
    );

    let discord = DiscordClient::new(
        &config.discord_bot_token,
        &config.discord_channel_id,
        &user_agent,
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        source,
        tasks_service,
        discord,
    });

    // Build router
    let app = trip_herald::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trip_herald=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
