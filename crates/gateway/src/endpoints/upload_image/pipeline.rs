//! # アップロード中継パイプライン
//!
//! 1リクエストにつき推論呼び出しは高々1回、保存も高々1回。
//! 各段階の失敗は `RelayError` として即座に返し、後続の段階には進まない。

use bgrelay_core::{
    describe_backend_status, generate_object_key, has_png_signature, PngFileName,
    BACKEND_OK_MESSAGE, PNG_CONTENT_TYPE,
};
use bgrelay_types::{AiStatus, RelayResponse, StorageStatus, STORAGE_KIND};

use crate::config::RelayState;
use crate::error::RelayError;
use crate::inference::InferenceResult;
use crate::storage::ObjectStore;
use crate::upload::UploadRequest;

/// 成功時のトップレベルメッセージ
const SUCCESS_MESSAGE: &str = "image processed and stored";

/// 保存済みオブジェクトの情報
struct StoredObject {
    key: String,
    bucket: String,
}

#[tracing::instrument(
    name = "upload_image",
    skip_all,
    fields(request_id = %uuid::Uuid::new_v4(), filename = %upload.filename)
)]
pub(super) async fn relay_upload(
    state: &RelayState,
    upload: UploadRequest,
) -> Result<RelayResponse, RelayError> {
    tracing::info!(
        bytes = upload.image.len(),
        content_type = %upload.content_type,
        "画像アップロードを受信"
    );

    // Step 1: 推論バックエンド呼び出し（リトライなし）
    tracing::info!(encoding = ?state.inference.encoding(), "推論バックエンドへ送信");
    let result = state
        .inference
        .remove_background(&upload)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "推論バックエンドの呼び出しに失敗");
            RelayError::from(e)
        })?;
    let processed = accept_inference(result)?;

    // Step 2: 保存名の正規化（拡張子は常に .png）
    let name = PngFileName::normalize(&upload.filename);

    // Step 3: PNGシグネチャ確認（不一致でも処理は継続）
    if !has_png_signature(&processed) {
        tracing::warn!(
            bytes = processed.len(),
            "処理済み画像がPNGシグネチャで始まっていません"
        );
    }

    // Step 4: 保存
    let storage = state.storage.as_deref().ok_or_else(|| {
        tracing::error!("ストレージが利用できません");
        RelayError::StorageUnavailable
    })?;
    let stored = store_processed(storage, name.base(), &processed).await?;

    // Step 5: 署名付きURL（失敗してもアップロード自体は成功扱い）
    let url = match storage
        .presigned_get_object(&stored.key, state.presign_expiry_secs)
        .await
    {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(key = %stored.key, error = %e, "署名付きURLの生成に失敗");
            None
        }
    };

    tracing::info!(key = %stored.key, bucket = %stored.bucket, "処理済み画像を保存しました");

    Ok(RelayResponse {
        success: true,
        message: SUCCESS_MESSAGE.to_string(),
        ai_status: Some(AiStatus {
            status_code: 200,
            message: BACKEND_OK_MESSAGE.to_string(),
        }),
        storage_status: Some(StorageStatus {
            success: true,
            filename: Some(stored.key),
            original_filename: Some(name.file_name()),
            url,
            storage: Some(STORAGE_KIND.to_string()),
            bucket: Some(stored.bucket),
            message: None,
        }),
    })
}

/// 推論結果を判定し、処理済み画像を取り出す。
fn accept_inference(result: InferenceResult) -> Result<Vec<u8>, RelayError> {
    if result.status_code != 200 {
        tracing::error!(
            status_code = result.status_code,
            reason = %describe_backend_status(result.status_code),
            body = result.error_body.as_deref().unwrap_or_default(),
            "推論バックエンドがエラーを返しました"
        );
        return Err(RelayError::BackendRejected {
            status_code: result.status_code,
        });
    }

    if result.image.is_empty() {
        tracing::error!("推論バックエンドが空の画像を返しました");
        return Err(RelayError::EmptyResult);
    }

    Ok(result.image)
}

/// 新しいキーで処理済み画像を書き込む。上書きは発生しない。
async fn store_processed(
    storage: &dyn ObjectStore,
    base: &str,
    data: &[u8],
) -> Result<StoredObject, RelayError> {
    let key = generate_object_key(base);
    storage
        .put_object(&key, data, PNG_CONTENT_TYPE)
        .await
        .map_err(|e| {
            tracing::error!(key = %key, error = %e, "処理済み画像の書き込みに失敗");
            e
        })?;

    Ok(StoredObject {
        key,
        bucket: storage.bucket_name().to_string(),
    })
}
