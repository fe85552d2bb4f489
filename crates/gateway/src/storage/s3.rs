//! # S3互換オブジェクトストレージ実装
//!
//! MinIO, AWS S3 等のS3互換APIを使用する実装。
//! 起動時に一度だけ構築し、バケットの存在確認（なければ作成）を済ませてから
//! リレーの共有状態に注入する。

use bgrelay_core::settings::MinioSettings;

use super::ObjectStore;
use crate::error::RelayError;

/// S3互換ストレージによる `ObjectStore` 実装。
pub struct MinioObjectStore {
    /// 書き込み用バケット（内部エンドポイント）
    bucket_internal: s3::Bucket,
    /// 署名付きURL生成用バケット。
    /// Docker内部ホスト名とクライアントから見えるホスト名が異なる場合に使用。
    /// Noneの場合はbucket_internalを使用する。
    bucket_public: Option<s3::Bucket>,
}

impl MinioObjectStore {
    pub fn new(bucket_internal: s3::Bucket, bucket_public: Option<s3::Bucket>) -> Self {
        Self {
            bucket_internal,
            bucket_public,
        }
    }

    fn region(endpoint: &str, region: &str) -> s3::Region {
        s3::Region::Custom {
            region: region.to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    fn credentials(settings: &MinioSettings) -> anyhow::Result<s3::creds::Credentials> {
        Ok(s3::creds::Credentials::new(
            Some(&settings.access_key),
            Some(&settings.secret_key),
            None,
            None,
            None,
        )?)
    }

    /// パススタイルのバケットハンドルを構築する（通信は発生しない）。
    fn init_bucket(endpoint: &str, settings: &MinioSettings) -> anyhow::Result<s3::Bucket> {
        let bucket = s3::Bucket::new(
            &settings.bucket_name,
            Self::region(endpoint, &settings.region),
            Self::credentials(settings)?,
        )?
        .with_path_style();

        Ok(*bucket)
    }

    /// 設定から構築し、バケットの存在を確認する。存在しなければ作成する。
    pub async fn connect(settings: &MinioSettings) -> anyhow::Result<Self> {
        let endpoint = settings.endpoint_url();
        let bucket_internal = Self::init_bucket(&endpoint, settings)?;

        if bucket_internal.exists().await? {
            tracing::info!(bucket = %settings.bucket_name, "バケットは既に存在します");
        } else {
            let response = s3::Bucket::create_with_path_style(
                &settings.bucket_name,
                Self::region(&endpoint, &settings.region),
                Self::credentials(settings)?,
                s3::BucketConfiguration::default(),
            )
            .await?;
            if !response.success() {
                anyhow::bail!(
                    "バケット作成に失敗: HTTP {} - {}",
                    response.response_code,
                    response.response_text
                );
            }
            tracing::info!(bucket = %settings.bucket_name, "バケットを作成しました");
        }

        let bucket_public = settings
            .public_endpoint_url()
            .map(|public_ep| {
                tracing::info!(
                    minio_public_endpoint = %public_ep,
                    "クライアント向けMinIOエンドポイントを設定"
                );
                Self::init_bucket(&public_ep, settings)
            })
            .transpose()?;

        Ok(Self::new(bucket_internal, bucket_public))
    }
}

#[async_trait::async_trait]
impl ObjectStore for MinioObjectStore {
    fn bucket_name(&self) -> &str {
        &self.bucket_internal.name
    }

    async fn put_object(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), RelayError> {
        let response = self
            .bucket_internal
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(|e| RelayError::StorageFailure(format!("MinIO upload failed: {e}")))?;

        // fail-on-errを無効にしているためステータスは自前で確認する
        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(RelayError::StorageFailure(format!(
                "MinIO upload failed: HTTP {status}"
            )));
        }
        Ok(())
    }

    async fn presigned_get_object(
        &self,
        key: &str,
        expiry_secs: u32,
    ) -> Result<String, RelayError> {
        let bucket = self.bucket_public.as_ref().unwrap_or(&self.bucket_internal);
        bucket
            .presign_get(key, expiry_secs, None)
            .await
            .map_err(|e| RelayError::StorageFailure(format!("presigned URL generation failed: {e}")))
    }
}
