// HTTP request handlers
use crate::domain::error::GraphingError;
use crate::domain::metric::TranslatedMetrics;
use crate::domain::operation::SourceIdentity;
use crate::domain::recipe::GraphRecipe;
use crate::presentation::app_state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct PerfDataRequest {
    pub perf_data: String,
    pub check_command: String,
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub host_name: String,
    #[serde(default)]
    pub service_description: String,
}

impl PerfDataRequest {
    fn source(&self) -> SourceIdentity {
        SourceIdentity::new(&self.site, &self.host_name, &self.service_description)
    }
}

type HandlerError = (StatusCode, String);

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Compile the graph recipes for one service's performance data
pub async fn graphs(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PerfDataRequest>,
) -> Result<Json<Vec<GraphRecipe>>, HandlerError> {
    state
        .graph_service
        .graph_recipes(&request.perf_data, &request.check_command, &request.source())
        .map(Json)
        .map_err(|e| reject(&request, e))
}

/// Translated metrics without graph compilation
pub async fn metrics(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PerfDataRequest>,
) -> Result<Json<TranslatedMetrics>, HandlerError> {
    state
        .graph_service
        .translate(&request.perf_data, &request.check_command)
        .map(Json)
        .map_err(|e| reject(&request, e))
}

fn reject(request: &PerfDataRequest, error: GraphingError) -> HandlerError {
    tracing::warn!(
        "Graphing failed for {} ({}): {}",
        request.service_description,
        request.check_command,
        error
    );
    (StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
}
