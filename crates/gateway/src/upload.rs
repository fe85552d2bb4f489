//! # アップロードリクエスト
//!
//! `POST /api/upload-image` のボディを `UploadRequest` に変換するエクストラクタ。
//! `Content-Type` により multipart と Base64 JSON を振り分ける。
//! ここで失敗したリクエストは推論バックエンドへ送られない。

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::Json;

use bgrelay_core::{decode_base64_image, sanitize_filename, CoreError};
use bgrelay_types::{UploadImageJsonRequest, FILENAME_FIELD, IMAGE_FIELD};

use crate::error::RelayError;

/// Content-Typeが不明な画像に使う値
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// 検証済みのアップロード。画像・ファイル名とも空でない。
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub image: Vec<u8>,
    /// パスを除去したファイル名（拡張子は未正規化）
    pub filename: String,
    pub content_type: String,
}

impl UploadRequest {
    /// 欠落・空の値を `BadRequest` として検証する。画像の検査が先。
    pub fn new(
        image: Option<Vec<u8>>,
        filename: Option<String>,
        content_type: Option<String>,
    ) -> Result<Self, RelayError> {
        let image = image.filter(|b| !b.is_empty()).ok_or_else(|| {
            RelayError::BadRequest(format!("image file is required (field: {IMAGE_FIELD})"))
        })?;
        let filename = filename
            .as_deref()
            .and_then(sanitize_filename)
            .ok_or_else(|| {
                RelayError::BadRequest(format!("filename is required (field: {FILENAME_FIELD})"))
            })?;

        Ok(Self {
            image,
            filename,
            content_type: content_type.unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string()),
        })
    }

    /// JSON形式: `image_data` はBase64（`data:` プレフィックス任意）
    pub fn from_json(body: UploadImageJsonRequest) -> Result<Self, RelayError> {
        let decoded = match body.image_data.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(data) => Some(decode_base64_image(data).map_err(|e| match e {
                CoreError::EmptyImage => RelayError::BadRequest(format!(
                    "image file is required (field: {IMAGE_FIELD})"
                )),
                other => RelayError::BadRequest(other.to_string()),
            })?),
        };

        match decoded {
            Some(image) => Self::new(Some(image.bytes), body.filename, image.mime_type),
            None => Self::new(None, body.filename, None),
        }
    }

    /// multipart形式: `image_data`（ファイル）と `filename`（テキスト）
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, RelayError> {
        let mut image = None;
        let mut content_type = None;
        let mut filename = None;

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some(IMAGE_FIELD) => {
                    content_type = field.content_type().map(str::to_owned);
                    image = Some(field.bytes().await.map_err(multipart_error)?.to_vec());
                }
                Some(FILENAME_FIELD) => {
                    filename = Some(field.text().await.map_err(multipart_error)?);
                }
                _ => {}
            }
        }

        Self::new(image, filename, content_type)
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> RelayError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        RelayError::PayloadTooLarge(e.body_text())
    } else {
        RelayError::BadRequest(format!("invalid multipart body: {}", e.body_text()))
    }
}

impl<S> FromRequest<S> for UploadRequest
where
    S: Send + Sync,
{
    type Rejection = RelayError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| RelayError::BadRequest(e.body_text()))?;
            Self::from_multipart(multipart).await
        } else if content_type.starts_with("application/json") {
            let Json(body) = Json::<UploadImageJsonRequest>::from_request(req, state)
                .await
                .map_err(|e| {
                    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                        RelayError::PayloadTooLarge(e.body_text())
                    } else {
                        RelayError::BadRequest(e.body_text())
                    }
                })?;
            Self::from_json(body)
        } else {
            Err(RelayError::BadRequest(format!(
                "image file is required (field: {IMAGE_FIELD}); send multipart/form-data or application/json"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_image_first() {
        match UploadRequest::new(None, None, None) {
            Err(RelayError::BadRequest(msg)) => assert!(msg.contains("image_data"), "{msg}"),
            other => panic!("予期しない結果: {other:?}"),
        }
        match UploadRequest::new(Some(vec![]), Some("a.png".into()), None) {
            Err(RelayError::BadRequest(msg)) => assert!(msg.contains("image_data"), "{msg}"),
            other => panic!("予期しない結果: {other:?}"),
        }
    }

    #[test]
    fn test_new_requires_filename() {
        for filename in [None, Some(String::new()), Some("   ".into()), Some("dir/".into())] {
            match UploadRequest::new(Some(vec![1, 2, 3]), filename, None) {
                Err(RelayError::BadRequest(msg)) => assert!(msg.contains("filename"), "{msg}"),
                other => panic!("予期しない結果: {other:?}"),
            }
        }
    }

    #[test]
    fn test_new_sanitizes_filename_and_defaults_content_type() {
        let upload =
            UploadRequest::new(Some(vec![1]), Some("../secret/a.jpg".into()), None).unwrap();
        assert_eq!(upload.filename, "a.jpg");
        assert_eq!(upload.content_type, "application/octet-stream");
    }

    #[test]
    fn test_from_json_with_data_uri() {
        let upload = UploadRequest::from_json(UploadImageJsonRequest {
            image_data: Some("data:image/jpeg;base64,aGVsbG8=".into()),
            filename: Some("shirt.jpg".into()),
        })
        .unwrap();
        assert_eq!(upload.image, b"hello");
        assert_eq!(upload.content_type, "image/jpeg");
        assert_eq!(upload.filename, "shirt.jpg");
    }

    #[test]
    fn test_from_json_rejects_invalid_base64() {
        let result = UploadRequest::from_json(UploadImageJsonRequest {
            image_data: Some("%%%".into()),
            filename: Some("shirt.jpg".into()),
        });
        assert!(matches!(result, Err(RelayError::BadRequest(_))));
    }

    #[test]
    fn test_from_json_missing_fields() {
        let result = UploadRequest::from_json(UploadImageJsonRequest {
            image_data: Some("aGVsbG8=".into()),
            filename: None,
        });
        match result {
            Err(RelayError::BadRequest(msg)) => assert!(msg.contains("filename"), "{msg}"),
            other => panic!("予期しない結果: {other:?}"),
        }

        let result = UploadRequest::from_json(UploadImageJsonRequest::default());
        match result {
            Err(RelayError::BadRequest(msg)) => assert!(msg.contains("image_data"), "{msg}"),
            other => panic!("予期しない結果: {other:?}"),
        }
    }
}
