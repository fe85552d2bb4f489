//! # PNGシグネチャ検査

/// PNGファイル先頭8バイトのシグネチャ
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// 保存時のContent-Type
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// 先頭8バイトがPNGシグネチャと一致するか。8バイト未満は不一致。
pub fn has_png_signature(data: &[u8]) -> bool {
    data.starts_with(&PNG_SIGNATURE)
}
