//! # POST /api/upload-image
//!
//! ## モジュール構成
//! - `handler`: axumハンドラ（共有状態とエクストラクタの受け取り）
//! - `pipeline`: 推論 → 結果判定 → 正規化 → 保存 → 署名付きURL の直線的な処理
//!
//! リクエストの検証は `crate::upload::UploadRequest` のエクストラクタで済ませる。

mod handler;
mod pipeline;

pub use handler::handle_upload_image;
