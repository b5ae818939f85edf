//! エラー型定義

use crate::outcome::NoTranscriptionCause;
use thiserror::Error;

/// 共通エラー型
///
/// いずれも操作単位で回復可能。失敗した操作は台帳の状態を変更しない。
#[derive(Error, Debug)]
pub enum Error {
    #[error("氏名列を特定できません（列: {}）。列を指定してください", .fields.join(", "))]
    AmbiguousNameField { fields: Vec<String> },

    #[error("音声を取得できません: {0}")]
    NoTranscription(NoTranscriptionCause),

    #[error("「{text}」に一致する参加者がいません（閾値: {threshold}）")]
    NoMatch { text: String, threshold: u8 },

    #[error("無効なレコード番号: {index}（名簿件数: {len}）")]
    InvalidRecordIndex { index: usize, len: usize },

    #[error("列が見つかりません: {0}")]
    UnknownField(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_ambiguous() {
        let error = Error::AmbiguousNameField {
            fields: vec!["Code".to_string(), "Ville".to_string()],
        };
        let display = format!("{}", error);
        assert!(display.contains("Code, Ville"));
    }

    #[test]
    fn test_error_display_no_match() {
        let error = Error::NoMatch { text: "xyz qqq".to_string(), threshold: 70 };
        let display = format!("{}", error);
        assert!(display.contains("xyz qqq"));
        assert!(display.contains("70"));
    }

    #[test]
    fn test_error_display_invalid_index() {
        let error = Error::InvalidRecordIndex { index: 5, len: 2 };
        let display = format!("{}", error);
        assert!(display.contains('5'));
        assert!(display.contains('2'));
    }

    #[test]
    fn test_error_display_config() {
        let error = Error::Config("閾値が不正です".to_string());
        let display = format!("{}", error);
        assert_eq!(display, "Config error: 閾値が不正です");
    }

    #[test]
    fn test_error_display_no_transcription() {
        let error = Error::NoTranscription(NoTranscriptionCause::ServiceFailure);
        let display = format!("{}", error);
        assert!(display.contains("音声認識サービスのエラー"));
    }
}
