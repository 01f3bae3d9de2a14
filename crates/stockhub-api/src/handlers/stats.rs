//! Connection statistics handler.

use axum::extract::State;
use axum::Json;

use stockhub_realtime::connection::registry::RegistryStats;

use crate::dto::response::ApiResponse;
use crate::state::AppState;

/// GET /api/stats
///
/// Reflects only this process's connections. In a multi-process
/// deployment each process holds its own registry, so global numbers
/// require aggregating every process's stats externally.
pub async fn stats(State(state): State<AppState>) -> Json<ApiResponse<RegistryStats>> {
    Json(ApiResponse::ok(state.engine.registry().stats()))
}
