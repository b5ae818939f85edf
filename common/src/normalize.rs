//! 比較用テキスト正規化
//!
//! 前後空白除去 → 小文字化 → アクセント除去 → 記号除去 の順に処理する。
//! 連続空白は残るが、`tokenize` は空白の連続を1区切りとして扱う。

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s]").unwrap();
}

/// 比較用の正規形に変換する
///
/// 空文字・空白のみの入力には空文字を返す。失敗しない。
///
/// # Examples
/// ```
/// use ekho_common::normalize::normalize;
///
/// assert_eq!(normalize("  Hélène  D'Arc "), "helene darc");
/// ```
pub fn normalize(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let lowered = trimmed.to_lowercase();
    let folded = fold_accents(&lowered);
    NON_WORD.replace_all(&folded, "").into_owned()
}

/// 値がない可能性のある入力を正規化する
pub fn normalize_opt(text: Option<&str>) -> String {
    text.map(normalize).unwrap_or_default()
}

/// 分解して結合文字を落とす（é → e）
pub fn fold_accents(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}

/// 空白で分割する
pub fn tokenize(canonical: &str) -> Vec<&str> {
    canonical.split_whitespace().collect()
}
