//! # ローカル用モック推論バックエンド
//!
//! 背景除去を行わず、受け取った画像をそのまま返す。
//! multipart契約（`clothes_image` → 画像バイナリ）と
//! JSON契約（`clothes_image_base64` → `data.clothes_image_processed_base64`）の両方に応答する。
//!
//! ## 環境変数
//! - `MOCK_INFERENCE_ADDR` — 待ち受けアドレス（既定 `0.0.0.0:8002`）
//! - `MOCK_INFERENCE_STATUS` — 設定すると常にこのステータスを返す（エラー経路の確認用）

use std::sync::Arc;

use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};

use bgrelay_types::{BackendJsonRequest, BACKEND_FILENAME_FIELD, BACKEND_IMAGE_FIELD};

/// モックの設定
#[derive(Debug, Clone, Default)]
struct MockConfig {
    /// 強制的に返すステータス
    forced_status: Option<StatusCode>,
}

type HandlerError = (StatusCode, String);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let addr =
        std::env::var("MOCK_INFERENCE_ADDR").unwrap_or_else(|_| "0.0.0.0:8002".to_string());
    let forced_status = match std::env::var("MOCK_INFERENCE_STATUS") {
        Ok(raw) => {
            let code: u16 = raw.trim().parse()?;
            Some(StatusCode::from_u16(code)?)
        }
        Err(_) => None,
    };
    if let Some(status) = forced_status {
        tracing::warn!(%status, "すべてのリクエストに固定ステータスを返します");
    }

    let app = app(MockConfig { forced_status });

    tracing::info!("モック推論バックエンドを {} で起動します", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn app(config: MockConfig) -> Router {
    Router::new()
        .route("/api/remove_bg", post(handle_remove_bg))
        .with_state(Arc::new(config))
}

/// POST /api/remove_bg — Content-Typeで契約を振り分ける。
async fn handle_remove_bg(
    State(config): State<Arc<MockConfig>>,
    request: Request,
) -> Result<Response, HandlerError> {
    if let Some(status) = config.forced_status {
        return Ok((
            status,
            Json(serde_json::json!({ "detail": format!("mock failure ({status})") })),
        )
            .into_response());
    }

    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        echo_multipart(request).await
    } else {
        echo_json(request).await
    }
}

async fn echo_multipart(request: Request) -> Result<Response, HandlerError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.body_text()))?;

    let mut image = None;
    let mut filename = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(BACKEND_IMAGE_FIELD) => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.body_text()))?;
                image = Some(bytes);
            }
            Some(BACKEND_FILENAME_FIELD) => {
                filename = field.text().await.ok();
            }
            _ => {}
        }
    }

    let image = image.ok_or((
        StatusCode::UNSUPPORTED_MEDIA_TYPE,
        format!("missing field: {BACKEND_IMAGE_FIELD}"),
    ))?;
    tracing::info!(
        filename = filename.as_deref().unwrap_or("-"),
        bytes = image.len(),
        "multipart画像をそのまま返します"
    );

    Ok((StatusCode::OK, [(CONTENT_TYPE, "image/png")], image).into_response())
}

async fn echo_json(request: Request) -> Result<Response, HandlerError> {
    let Json(body) = Json::<BackendJsonRequest>::from_request(request, &())
        .await
        .map_err(|e| (StatusCode::UNSUPPORTED_MEDIA_TYPE, e.body_text()))?;

    tracing::info!(
        encoded_len = body.clothes_image_base64.len(),
        "Base64画像をそのまま返します"
    );

    Ok(Json(serde_json::json!({
        "data": { "clothes_image_processed_base64": body.clothes_image_base64 }
    }))
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn spawn(config: MockConfig) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app(config)).await.unwrap();
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        format!("http://127.0.0.1:{port}/api/remove_bg")
    }

    #[tokio::test]
    async fn test_multipart_echo() {
        let url = spawn(MockConfig::default()).await;

        let form = reqwest::multipart::Form::new()
            .part(
                BACKEND_IMAGE_FIELD,
                reqwest::multipart::Part::bytes(vec![0x89, b'P', b'N', b'G'])
                    .file_name("a.png"),
            )
            .text(BACKEND_FILENAME_FIELD, "a.png");
        let response = reqwest::Client::new()
            .post(&url)
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(
            response.bytes().await.unwrap().as_ref(),
            &[0x89, b'P', b'N', b'G']
        );
    }

    #[tokio::test]
    async fn test_json_echo() {
        let url = spawn(MockConfig::default()).await;

        let response = reqwest::Client::new()
            .post(&url)
            .json(&serde_json::json!({ "clothes_image_base64": "aGVsbG8=" }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["data"]["clothes_image_processed_base64"], "aGVsbG8=");
    }

    #[tokio::test]
    async fn test_forced_status() {
        let url = spawn(MockConfig {
            forced_status: Some(StatusCode::UNPROCESSABLE_ENTITY),
        })
        .await;

        let response = reqwest::Client::new()
            .post(&url)
            .json(&serde_json::json!({ "clothes_image_base64": "aGVsbG8=" }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 422);
    }

    #[tokio::test]
    async fn test_missing_image_field() {
        let url = spawn(MockConfig::default()).await;

        let form = reqwest::multipart::Form::new().text(BACKEND_FILENAME_FIELD, "a.png");
        let response = reqwest::Client::new()
            .post(&url)
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 415);
    }
}
