//! # bgrelay Core
//!
//! リレーパイプラインのうち、I/Oを伴わない規則をまとめたクレート。
//!
//! ## 提供する処理
//! 1. クライアントのファイル名のサニタイズと `.png` への正規化
//! 2. 一意なオブジェクトキーの生成（`processed_<hex8>_<base>.png`）
//! 3. PNGシグネチャの検査
//! 4. 推論バックエンドのステータスコードとメッセージの対応表
//! 5. `data:` URIプレフィックス付きBase64画像のデコード
//! 6. 環境変数からの設定読み込み

mod backend_status;
mod data_uri;
mod filename;
mod object_key;
mod png;
pub mod settings;

pub use backend_status::{
    describe_backend_status, BACKEND_OK_MESSAGE, BACKEND_TIMEOUT_MESSAGE,
    BACKEND_UNAVAILABLE_MESSAGE, EMPTY_RESULT_MESSAGE,
};
pub use data_uri::{decode_base64_image, DecodedImage};
pub use filename::{sanitize_filename, PngFileName};
pub use object_key::{generate_object_key, is_generated_object_key, OBJECT_KEY_PREFIX};
pub use png::{has_png_signature, PNG_CONTENT_TYPE, PNG_SIGNATURE};

/// 署名付きダウンロードURLの有効期限（7日、S3の上限値）。
pub const PRESIGNED_URL_TTL_SECS: u32 = 7 * 24 * 60 * 60;

/// Coreモジュールのエラー型
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Base64デコードエラー
    #[error("invalid base64 image data: {0}")]
    InvalidBase64(String),
    /// デコード結果が空
    #[error("image data is empty")]
    EmptyImage,
}
