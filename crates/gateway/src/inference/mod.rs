//! # 推論バックエンドクライアント
//!
//! 背景除去バックエンドへの1回の呼び出しを抽象化するトレイト。
//! 環境変数 `AI_BACKEND_ENCODING` で実装を切り替える。
//!
//! 現在の実装:
//! - `multipart` — `clothes_image` / `clothes_filename` を送り、画像バイナリを受け取る
//! - `json` — `clothes_image_base64` を送り、`data.clothes_image_processed_base64` を受け取る
//!
//! どちらもリトライしない。タイムアウトはreqwestクライアント側で設定する。

pub mod json;
pub mod multipart;

pub use json::JsonInferenceClient;
pub use multipart::MultipartInferenceClient;

use std::time::Duration;

use bgrelay_core::settings::{BackendEncoding, RelaySettings};

use crate::upload::UploadRequest;

/// ログに残すエラーボディの最大文字数
const ERROR_BODY_LOG_CHARS: usize = 200;

/// 推論バックエンド呼び出しの結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceResult {
    pub status_code: u16,
    /// 処理済み画像（`status_code == 200` の場合のみ中身がある）
    pub image: Vec<u8>,
    /// 200以外の場合のレスポンスボディ（先頭200文字）
    pub error_body: Option<String>,
}

/// 通信レベルの失敗。バックエンドのドメインエラー（415等）はここに含めない。
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("cannot connect to inference backend: {0}")]
    Connect(String),
    #[error("inference backend timed out")]
    Timeout,
    #[error("{0}")]
    Transport(String),
    /// 200だがボディが契約どおりでない
    #[error("invalid inference response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for InferenceError {
    fn from(e: reqwest::Error) -> Self {
        // 接続タイムアウトは is_connect も真になるため先に判定する
        if e.is_timeout() {
            InferenceError::Timeout
        } else if e.is_connect() {
            InferenceError::Connect(e.to_string())
        } else {
            InferenceError::Transport(e.to_string())
        }
    }
}

/// 推論バックエンドクライアントのトレイト。
#[async_trait::async_trait]
pub trait InferenceClient: Send + Sync {
    /// ワイヤ形式（ログ用）
    fn encoding(&self) -> BackendEncoding;

    /// 画像の背景除去を1回だけ依頼する。
    async fn remove_background(
        &self,
        upload: &UploadRequest,
    ) -> Result<InferenceResult, InferenceError>;
}

/// タイムアウト付きのHTTPクライアントを構築する。
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// 設定に従って推論クライアントを構築する。
pub fn from_settings(settings: &RelaySettings) -> anyhow::Result<Box<dyn InferenceClient>> {
    let http = build_http_client(settings.ai_backend_timeout)?;
    let endpoint = settings.ai_backend_url.clone();
    let client: Box<dyn InferenceClient> = match settings.ai_backend_encoding {
        BackendEncoding::Multipart => Box::new(MultipartInferenceClient::new(http, endpoint)),
        BackendEncoding::Json => Box::new(JsonInferenceClient::new(http, endpoint)),
    };
    Ok(client)
}

/// 200以外のレスポンスボディを読み、ログ用に切り詰める。
pub(crate) async fn read_error_body(response: reqwest::Response) -> Option<String> {
    let text = response.text().await.ok()?;
    Some(text.chars().take(ERROR_BODY_LOG_CHARS).collect())
}
