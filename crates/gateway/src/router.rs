//! # ルーター構築
//!
//! ルート、ボディサイズ上限、CORS、HTTPトレースを組み立てる。
//! `main` とテストの両方から使う。

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use bgrelay_core::settings::CorsSettings;

use crate::config::RelayState;
use crate::endpoints;

/// リレーのルーターを構築する。
pub fn build_router(state: Arc<RelayState>, max_upload_size: usize, cors: &CorsSettings) -> Router {
    let router = Router::new()
        .route("/health", get(endpoints::handle_health))
        .route("/api/upload-image", post(endpoints::handle_upload_image))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_size));

    let router = match cors_layer(cors) {
        Some(layer) => router.layer(layer),
        None => router,
    };

    router.layer(TraceLayer::new_for_http())
}

/// CORS設定からレイヤーを作る。許可オリジンが1つもなければNone。
fn cors_layer(cors: &CorsSettings) -> Option<CorsLayer> {
    if cors.allow_all_origins {
        // 任意オリジン + credentials（オリジンはリクエストからミラーする）
        return Some(CorsLayer::very_permissive());
    }

    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "不正なCORSオリジンを無視します");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([ACCEPT, AUTHORIZATION, CONTENT_TYPE])
            .allow_credentials(true),
    )
}
