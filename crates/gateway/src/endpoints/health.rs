//! # GET /health

use axum::Json;

use bgrelay_types::HealthResponse;

/// GET /health — 死活確認。認証・パラメータなし。
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}
