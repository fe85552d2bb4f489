//! # 推論バックエンドのステータス対応表

/// 200（背景除去成功）のメッセージ
pub const BACKEND_OK_MESSAGE: &str = "background removed";

/// 接続失敗時に `ai_status.message` へ入れるメッセージ（503）
pub const BACKEND_UNAVAILABLE_MESSAGE: &str = "service unavailable";

/// タイムアウト時に `ai_status.message` へ入れるメッセージ（504）
pub const BACKEND_TIMEOUT_MESSAGE: &str = "timeout";

/// 200なのに画像が空だった場合のメッセージ（500）
pub const EMPTY_RESULT_MESSAGE: &str = "empty result";

/// バックエンドのステータスコードを人間向けメッセージに変換する。
///
/// 表にないコードは `unknown status code: <code>` となる。
pub fn describe_backend_status(status_code: u16) -> String {
    match status_code {
        200 => BACKEND_OK_MESSAGE.to_string(),
        415 => "non-image upload".to_string(),
        422 => "image too blurry".to_string(),
        500 => "model inference failure".to_string(),
        other => format!("unknown status code: {other}"),
    }
}
