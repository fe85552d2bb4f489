//! # オブジェクトキーの生成
//!
//! キーは `processed_<8桁の小文字hex>_<base>.png`。
//! ストアへの存在確認は行わず、32bitの乱数で衝突を避ける。

/// 生成キーのプレフィックス
pub const OBJECT_KEY_PREFIX: &str = "processed_";

/// ベース名から新しいオブジェクトキーを生成する。呼び出しごとに異なる値を返す。
pub fn generate_object_key(base: &str) -> String {
    let suffix = hex::encode(rand::random::<[u8; 4]>());
    format!("{OBJECT_KEY_PREFIX}{suffix}_{base}.png")
}

/// `generate_object_key` が生成しうる形式か（`processed_[0-9a-f]{8}_.+\.png`）
pub fn is_generated_object_key(key: &str) -> bool {
    let Some(rest) = key.strip_prefix(OBJECT_KEY_PREFIX) else {
        return false;
    };
    let Some((hex_part, tail)) = rest.split_at_checked(8) else {
        return false;
    };
    let hex_ok = hex_part
        .chars()
        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
    let Some(name) = tail.strip_prefix('_') else {
        return false;
    };
    hex_ok && name.len() > ".png".len() && name.ends_with(".png")
}
