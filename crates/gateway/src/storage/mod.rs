//! # オブジェクトストレージ
//!
//! 処理済み画像の保存先の抽象インターフェース。
//! S3互換ストレージ（MinIO）実装は `s3` サブモジュールを参照。
//!
//! 保存は追記のみ。キーは呼び出し側が毎回新しく生成するため、
//! 同一オブジェクトへの同時書き込みは発生しない。

#[cfg(feature = "vendor-minio")]
pub mod s3;

#[cfg(feature = "vendor-minio")]
pub use self::s3::MinioObjectStore;

use crate::error::RelayError;

/// オブジェクトストレージの抽象インターフェース。
///
/// 書き込み失敗は `RelayError::StorageFailure` として返す。
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// 保存先バケット名
    fn bucket_name(&self) -> &str;

    /// オブジェクトを書き込む。
    async fn put_object(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), RelayError>;

    /// 署名付きダウンロードURL（GET）を生成する。
    async fn presigned_get_object(&self, key: &str, expiry_secs: u32)
        -> Result<String, RelayError>;
}
