// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use perfgraph::application::graph_service::GraphService;
use perfgraph::infrastructure::config::{
    load_catalogue_config, load_server_config, load_templates_config,
};
use perfgraph::infrastructure::static_catalogue::StaticCatalogue;
use perfgraph::presentation::app_state::AppState;
use perfgraph::presentation::handlers::{graphs, health_check, metrics};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let server_config = load_server_config()?;
    let catalogue_config = load_catalogue_config(server_config.catalogue_path.as_deref())?;
    let templates_config = load_templates_config(server_config.templates_path.as_deref())?;

    // Metric catalogue (infrastructure layer)
    let catalogue = Arc::new(StaticCatalogue::from_config(catalogue_config)?);
    tracing::info!("Loaded {} graph templates", templates_config.templates.len());

    // Create services (application layer)
    let graph_service = GraphService::new(catalogue, templates_config);

    let state = Arc::new(AppState { graph_service });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/graphs", post(graphs))
        .route("/metrics", post(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = server_config
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address {}", server_config.listen))?;
    tracing::info!("Starting perfgraph service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
