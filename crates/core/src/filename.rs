//! # ファイル名の正規化

/// クライアントが送ったファイル名から、パスの最後の要素だけを取り出す。
///
/// `/` と `\` の両方を区切りとして扱い、制御文字は除去する。
/// 結果が空、または `.` / `..` の場合はNone。
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let last = raw
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// 拡張子を `.png` に強制したファイル名。
///
/// 既存の拡張子（最後の `.` 以降）を取り除いた部分をベース名とする。
/// `.hidden` のように先頭の `.` しかない名前は拡張子なしとみなす。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngFileName {
    base: String,
}

impl PngFileName {
    pub fn normalize(name: &str) -> Self {
        let base = match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => name,
        };
        Self {
            base: base.to_string(),
        }
    }

    /// 拡張子を除いたベース名
    pub fn base(&self) -> &str {
        &self.base
    }

    /// `<base>.png`
    pub fn file_name(&self) -> String {
        format!("{}.png", self.base)
    }
}
