//! # リレー共有状態
//!
//! 起動時に一度だけ構築し、`Arc` で全リクエストに共有する。
//! リクエスト間で共有するのはHTTPクライアントとストレージクライアントのみで、
//! どちらも同時利用可能なコネクションプール。

use crate::inference::InferenceClient;
use crate::storage::ObjectStore;

/// リレーの共有状態。
pub struct RelayState {
    /// 推論バックエンドクライアント（ワイヤ形式は設定で選択）
    pub inference: Box<dyn InferenceClient>,
    /// オブジェクトストレージ。起動時の接続確認に失敗した場合はNoneで、
    /// 各リクエストは `storage unavailable` を返す。
    pub storage: Option<Box<dyn ObjectStore>>,
    /// 署名付きURLの有効期限（秒）
    pub presign_expiry_secs: u32,
}
