//! # Base64画像のデコード
//!
//! JSON形式のアップロードと推論バックエンドのJSONレスポンスで使う。
//! `data:<mime>;base64,` プレフィックスは任意。

use base64::Engine;

use crate::CoreError;

/// デコード済み画像。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    /// `data:` URIに含まれていたMIMEタイプ（妥当な形式の場合のみ）
    pub mime_type: Option<String>,
}

/// Base64文字列を画像バイト列にデコードする。
///
/// 先頭の `data:<mime>;base64,` を取り除き、途中の空白・改行は無視する。
/// デコード結果が空の場合は `CoreError::EmptyImage`。
pub fn decode_base64_image(input: &str) -> Result<DecodedImage, CoreError> {
    let input = input.trim();

    let (mime_type, payload) = match input.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| CoreError::InvalidBase64("data URI without payload".into()))?;
            let mime = header.split(';').next().unwrap_or_default();
            (is_mime_type(mime).then(|| mime.to_ascii_lowercase()), payload)
        }
        None => (None, input),
    };

    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| CoreError::InvalidBase64(e.to_string()))?;

    if bytes.is_empty() {
        return Err(CoreError::EmptyImage);
    }

    Ok(DecodedImage { bytes, mime_type })
}

/// `type/subtype` 形式か（パラメータなし）
fn is_mime_type(value: &str) -> bool {
    match value.split_once('/') {
        Some((kind, sub)) if !kind.is_empty() && !sub.is_empty() => value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '+' | '.' | '-')),
        _ => false,
    }
}
