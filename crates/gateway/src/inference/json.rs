//! # JSON形式の推論クライアント

use base64::Engine;

use bgrelay_core::settings::BackendEncoding;
use bgrelay_core::{decode_base64_image, CoreError};
use bgrelay_types::{BackendJsonRequest, BackendJsonResponse};

use super::{read_error_body, InferenceClient, InferenceError, InferenceResult};
use crate::upload::UploadRequest;

/// `{"clothes_image_base64": ...}` を送るクライアント。
/// 成功時は `{"data": {"clothes_image_processed_base64": ...}}` を期待する。
pub struct JsonInferenceClient {
    http: reqwest::Client,
    endpoint: String,
}

impl JsonInferenceClient {
    pub fn new(http: reqwest::Client, endpoint: String) -> Self {
        Self { http, endpoint }
    }

    /// レスポンスから画像を取り出す。フィールド欠落・空文字列は空画像として返す。
    fn extract_image(body: &BackendJsonResponse) -> Result<Vec<u8>, InferenceError> {
        let Some(encoded) = body.processed_image_base64() else {
            return Ok(Vec::new());
        };
        match decode_base64_image(encoded) {
            Ok(decoded) => Ok(decoded.bytes),
            Err(CoreError::EmptyImage) => Ok(Vec::new()),
            Err(e) => Err(InferenceError::InvalidResponse(e.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl InferenceClient for JsonInferenceClient {
    fn encoding(&self) -> BackendEncoding {
        BackendEncoding::Json
    }

    async fn remove_background(
        &self,
        upload: &UploadRequest,
    ) -> Result<InferenceResult, InferenceError> {
        let request = BackendJsonRequest {
            clothes_image_base64: base64::engine::general_purpose::STANDARD.encode(&upload.image),
        };
        let response = self.http.post(&self.endpoint).json(&request).send().await?;

        let status_code = response.status().as_u16();
        if status_code != 200 {
            return Ok(InferenceResult {
                status_code,
                image: Vec::new(),
                error_body: read_error_body(response).await,
            });
        }

        let raw = response.bytes().await?;
        let body: BackendJsonResponse = serde_json::from_slice(&raw)
            .map_err(|e| InferenceError::InvalidResponse(format!("JSON parse error: {e}")))?;

        Ok(InferenceResult {
            status_code,
            image: Self::extract_image(&body)?,
            error_body: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bgrelay_types::BackendJsonData;

    fn response_with(encoded: Option<&str>) -> BackendJsonResponse {
        BackendJsonResponse {
            data: Some(BackendJsonData {
                clothes_image_processed_base64: encoded.map(str::to_string),
            }),
        }
    }

    #[test]
    fn test_extract_image() {
        let image = JsonInferenceClient::extract_image(&response_with(Some("aGVsbG8="))).unwrap();
        assert_eq!(image, b"hello");
    }

    #[test]
    fn test_extract_missing_or_empty_image() {
        assert!(JsonInferenceClient::extract_image(&response_with(None))
            .unwrap()
            .is_empty());
        assert!(JsonInferenceClient::extract_image(&response_with(Some("")))
            .unwrap()
            .is_empty());
        assert!(JsonInferenceClient::extract_image(&BackendJsonResponse::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_extract_invalid_base64() {
        let result = JsonInferenceClient::extract_image(&response_with(Some("***")));
        assert!(matches!(result, Err(InferenceError::InvalidResponse(_))));
    }
}
