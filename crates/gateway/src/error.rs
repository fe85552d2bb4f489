//! # リレーエラー型
//!
//! どの段階で失敗しても `RelayResponse` 形式のJSONと対応するHTTPステータスを返す。
//! 推論バックエンドの結果が確定した後の失敗（ストレージ系）では `ai_status` に200を残す。

use axum::http::StatusCode;
use axum::Json;

use bgrelay_core::{
    describe_backend_status, BACKEND_OK_MESSAGE, BACKEND_TIMEOUT_MESSAGE,
    BACKEND_UNAVAILABLE_MESSAGE, EMPTY_RESULT_MESSAGE,
};
use bgrelay_types::{AiStatus, RelayResponse, StorageStatus};

use crate::inference::InferenceError;

/// リレーエラー型。
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// 不正なリクエスト（画像・ファイル名の欠落、Base64デコード失敗）
    #[error("{0}")]
    BadRequest(String),
    /// リクエストボディが `MAX_UPLOAD_SIZE` を超過
    #[error("upload exceeds the maximum size: {0}")]
    PayloadTooLarge(String),
    /// 推論バックエンドに接続できない
    #[error("cannot connect to AI service")]
    BackendUnavailable,
    /// 推論バックエンドの応答がタイムアウト
    #[error("AI processing timed out")]
    BackendTimeout,
    /// 推論バックエンド呼び出し中のその他の失敗
    #[error("AI service call failed: {0}")]
    BackendCall(String),
    /// 推論バックエンドが200以外を返した
    #[error("AI processing failed")]
    BackendRejected { status_code: u16 },
    /// 200なのに画像が空
    #[error("AI returned an empty image")]
    EmptyResult,
    /// ストレージ未構成・到達不能
    #[error("storage service unavailable")]
    StorageUnavailable,
    /// オブジェクトの書き込み失敗
    #[error("failed to store image: {0}")]
    StorageFailure(String),
}

impl From<InferenceError> for RelayError {
    fn from(e: InferenceError) -> Self {
        match e {
            InferenceError::Connect(_) => RelayError::BackendUnavailable,
            InferenceError::Timeout => RelayError::BackendTimeout,
            InferenceError::Transport(msg) | InferenceError::InvalidResponse(msg) => {
                RelayError::BackendCall(msg)
            }
        }
    }
}

impl RelayError {
    /// 返却するHTTPステータス
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::BackendUnavailable | RelayError::StorageUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            RelayError::BackendTimeout => StatusCode::GATEWAY_TIMEOUT,
            RelayError::BackendCall(_)
            | RelayError::EmptyResult
            | RelayError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // バックエンドのステータスをそのまま外側のステータスにする
            RelayError::BackendRejected { status_code } => {
                StatusCode::from_u16(*status_code).unwrap_or(StatusCode::BAD_GATEWAY)
            }
        }
    }

    /// レスポンス本体
    pub fn to_response(&self) -> RelayResponse {
        let ai_status = match self {
            RelayError::BadRequest(_) | RelayError::PayloadTooLarge(_) => None,
            RelayError::BackendUnavailable => Some(ai_status(503, BACKEND_UNAVAILABLE_MESSAGE)),
            RelayError::BackendTimeout => Some(ai_status(504, BACKEND_TIMEOUT_MESSAGE)),
            RelayError::BackendCall(msg) => Some(ai_status(500, msg)),
            RelayError::BackendRejected { status_code } => Some(AiStatus {
                status_code: *status_code,
                message: describe_backend_status(*status_code),
            }),
            RelayError::EmptyResult => Some(ai_status(500, EMPTY_RESULT_MESSAGE)),
            RelayError::StorageUnavailable | RelayError::StorageFailure(_) => {
                Some(ai_status(200, BACKEND_OK_MESSAGE))
            }
        };

        let storage_status = match self {
            RelayError::StorageUnavailable => Some(StorageStatus::failed("storage unavailable")),
            RelayError::StorageFailure(msg) => Some(StorageStatus::failed(msg.clone())),
            _ => None,
        };

        RelayResponse {
            ai_status,
            storage_status,
            ..RelayResponse::failure(self.to_string())
        }
    }
}

fn ai_status(status_code: u16, message: &str) -> AiStatus {
    AiStatus {
        status_code,
        message: message.to_string(),
    }
}

impl axum::response::IntoResponse for RelayError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_response())).into_response()
    }
}
