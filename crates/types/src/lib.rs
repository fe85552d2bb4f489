//! # bgrelay 共有型定義
//!
//! リレーサーバー・CLI・モック推論バックエンドで共有するワイヤ形式の構造体。
//!
//! ## フィールド名の規則
//! - クライアント向けJSON: snake_case（`ai_status`, `storage_status`）
//! - 推論バックエンド向け: `clothes_` プレフィックス付きフィールド

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// フィールド名
// ---------------------------------------------------------------------------

/// アップロードリクエストの画像フィールド名（multipart / JSON 共通）
pub const IMAGE_FIELD: &str = "image_data";

/// アップロードリクエストのファイル名フィールド名（multipart / JSON 共通）
pub const FILENAME_FIELD: &str = "filename";

/// 推論バックエンドへ送るmultipartの画像フィールド名
pub const BACKEND_IMAGE_FIELD: &str = "clothes_image";

/// 推論バックエンドへ送るmultipartのファイル名フィールド名
pub const BACKEND_FILENAME_FIELD: &str = "clothes_filename";

/// ストレージ種別の表示名（`storage_status.storage`）
pub const STORAGE_KIND: &str = "minio";

// ---------------------------------------------------------------------------
// クライアント向けレスポンス
// ---------------------------------------------------------------------------

/// `POST /api/upload-image` のレスポンス本体。
///
/// 失敗時も同じ形で返す。`ai_status` は推論バックエンドの結果が確定した時点で、
/// `storage_status` は保存を試みた時点で含まれる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayResponse {
    /// パイプライン全体が成功したか
    pub success: bool,
    /// 人間向けの要約メッセージ
    pub message: String,
    /// 推論バックエンドの結果
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_status: Option<AiStatus>,
    /// オブジェクトストレージへの保存結果
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_status: Option<StorageStatus>,
}

impl RelayResponse {
    /// 推論・ストレージの結果を持たない失敗レスポンス（入力検証エラー等）。
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ai_status: None,
            storage_status: None,
        }
    }
}

/// 推論バックエンドの結果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiStatus {
    /// バックエンドのHTTPステータス（通信失敗時はリレー側で割り当てた値）
    pub status_code: u16,
    /// ステータスに対応するメッセージ
    pub message: String,
}

/// オブジェクトストレージへの保存結果。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStatus {
    pub success: bool,
    /// 生成されたオブジェクトキー（`processed_<hex8>_<base>.png`）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// 拡張子を `.png` に正規化したクライアントのファイル名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    /// 署名付きダウンロードURL。生成に失敗した場合は省略。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    /// 失敗理由
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StorageStatus {
    /// 保存失敗を表すステータス。
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// `GET /health` のレスポンス。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

// ---------------------------------------------------------------------------
// クライアント向けリクエスト（JSON形式）
// ---------------------------------------------------------------------------

/// `POST /api/upload-image` のJSON形式リクエスト。
///
/// 欠損フィールドをリレー側で400として扱うため、両フィールドともOptional。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadImageJsonRequest {
    /// Base64画像。`data:<mime>;base64,` プレフィックスは任意。
    #[serde(default)]
    pub image_data: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

// ---------------------------------------------------------------------------
// 推論バックエンドとのJSON契約
// ---------------------------------------------------------------------------

/// JSON形式で推論バックエンドへ送るリクエスト。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendJsonRequest {
    pub clothes_image_base64: String,
}

/// JSON形式の推論バックエンドのレスポンス。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendJsonResponse {
    #[serde(default)]
    pub data: Option<BackendJsonData>,
}

/// `BackendJsonResponse.data` の中身。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendJsonData {
    #[serde(default)]
    pub clothes_image_processed_base64: Option<String>,
}

impl BackendJsonResponse {
    /// 処理済み画像のBase64文字列を取り出す。欠損時はNone。
    pub fn processed_image_base64(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.clothes_image_processed_base64.as_deref())
    }
}
