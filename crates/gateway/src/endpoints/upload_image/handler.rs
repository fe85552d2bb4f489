//! # /api/upload-image ハンドラ

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use bgrelay_types::RelayResponse;

use crate::config::RelayState;
use crate::error::RelayError;
use crate::upload::UploadRequest;

use super::pipeline::relay_upload;

/// POST /api/upload-image — 画像を推論バックエンドへ中継し、結果をストレージに保存する。
///
/// 失敗時は `RelayError` が `RelayResponse` 形式のJSONとステータスを組み立てる。
pub async fn handle_upload_image(
    State(state): State<Arc<RelayState>>,
    upload: UploadRequest,
) -> Result<Json<RelayResponse>, RelayError> {
    let response = relay_upload(&state, upload).await?;
    Ok(Json(response))
}
