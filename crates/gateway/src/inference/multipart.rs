//! # multipart形式の推論クライアント

use reqwest::multipart::{Form, Part};

use bgrelay_core::settings::BackendEncoding;
use bgrelay_types::{BACKEND_FILENAME_FIELD, BACKEND_IMAGE_FIELD};

use super::{read_error_body, InferenceClient, InferenceError, InferenceResult};
use crate::upload::UploadRequest;

/// `clothes_image`（ファイル）と `clothes_filename`（テキスト）を送るクライアント。
/// 成功時のボディは処理済み画像のバイナリそのもの。
pub struct MultipartInferenceClient {
    http: reqwest::Client,
    endpoint: String,
}

impl MultipartInferenceClient {
    pub fn new(http: reqwest::Client, endpoint: String) -> Self {
        Self { http, endpoint }
    }

    fn build_form(upload: &UploadRequest) -> Result<Form, InferenceError> {
        let part = Part::bytes(upload.image.clone())
            .file_name(upload.filename.clone())
            .mime_str(&upload.content_type)
            .map_err(|e| InferenceError::Transport(format!("invalid image content type: {e}")))?;

        Ok(Form::new()
            .part(BACKEND_IMAGE_FIELD, part)
            .text(BACKEND_FILENAME_FIELD, upload.filename.clone()))
    }
}

#[async_trait::async_trait]
impl InferenceClient for MultipartInferenceClient {
    fn encoding(&self) -> BackendEncoding {
        BackendEncoding::Multipart
    }

    async fn remove_background(
        &self,
        upload: &UploadRequest,
    ) -> Result<InferenceResult, InferenceError> {
        let form = Self::build_form(upload)?;
        let response = self.http.post(&self.endpoint).multipart(form).send().await?;

        let status_code = response.status().as_u16();
        if status_code != 200 {
            return Ok(InferenceResult {
                status_code,
                image: Vec::new(),
                error_body: read_error_body(response).await,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let image = response.bytes().await?.to_vec();
        tracing::debug!(
            content_type = %content_type,
            bytes = image.len(),
            "推論バックエンドから画像バイナリを受信"
        );

        Ok(InferenceResult {
            status_code,
            image,
            error_body: None,
        })
    }
}
