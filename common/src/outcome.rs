//! 1回の認識試行の結果
//!
//! 「入力なし」「入力はあったが聞き取れない」「聞き取れたが該当者なし」を
//! 区別して呼び出し側へ返す。

use crate::error::Error;
use crate::ranker::MatchCandidate;
use serde::{Deserialize, Serialize};

/// 音声取得に失敗した理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoTranscriptionCause {
    /// 制限時間内に発話がなかった
    Timeout,
    /// 発話はあったが認識できなかった
    Unintelligible,
    /// 音声認識サービス自体の失敗
    ServiceFailure,
}

impl std::fmt::Display for NoTranscriptionCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoTranscriptionCause::Timeout => write!(f, "発話が検出されませんでした"),
            NoTranscriptionCause::Unintelligible => write!(f, "音声を認識できませんでした"),
            NoTranscriptionCause::ServiceFailure => write!(f, "音声認識サービスのエラー"),
        }
    }
}

/// 発話1件の処理結果
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionOutcome {
    /// 入力なし（無音・タイムアウト）
    NoInput,
    /// 入力はあったが文字にできなかった
    Unrecognized(NoTranscriptionCause),
    /// 文字にはなったが閾値以上の候補がない
    NoMatch { text: String, threshold: u8 },
    /// 最上位候補を自動で出席にした
    AutoConfirmed {
        text: String,
        confirmed: MatchCandidate,
        others: Vec<MatchCandidate>,
    },
    /// 手動確認待ち
    NeedsConfirmation {
        text: String,
        candidates: Vec<MatchCandidate>,
    },
}

impl RecognitionOutcome {
    /// 音声取得失敗の理由から結果を作る
    pub fn from_cause(cause: NoTranscriptionCause) -> Self {
        match cause {
            NoTranscriptionCause::Timeout => RecognitionOutcome::NoInput,
            other => RecognitionOutcome::Unrecognized(other),
        }
    }

    /// 名簿に変更が入ったか
    pub fn mutated(&self) -> bool {
        matches!(self, RecognitionOutcome::AutoConfirmed { .. })
    }

    /// 失敗を表す結果ならエラーとして返す
    pub fn error(&self) -> Option<Error> {
        match self {
            RecognitionOutcome::NoInput => {
                Some(Error::NoTranscription(NoTranscriptionCause::Timeout))
            }
            RecognitionOutcome::Unrecognized(cause) => Some(Error::NoTranscription(*cause)),
            RecognitionOutcome::NoMatch { text, threshold } => Some(Error::NoMatch {
                text: text.clone(),
                threshold: *threshold,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cause_separates_timeout() {
        assert_eq!(
            RecognitionOutcome::from_cause(NoTranscriptionCause::Timeout),
            RecognitionOutcome::NoInput
        );
        assert_eq!(
            RecognitionOutcome::from_cause(NoTranscriptionCause::Unintelligible),
            RecognitionOutcome::Unrecognized(NoTranscriptionCause::Unintelligible)
        );
        assert_eq!(
            RecognitionOutcome::from_cause(NoTranscriptionCause::ServiceFailure),
            RecognitionOutcome::Unrecognized(NoTranscriptionCause::ServiceFailure)
        );
    }

    #[test]
    fn test_only_auto_confirm_mutates() {
        assert!(!RecognitionOutcome::NoInput.mutated());
        let no_match = RecognitionOutcome::NoMatch { text: "x".into(), threshold: 70 };
        assert!(!no_match.mutated());
    }

    #[test]
    fn test_error_for_failures() {
        assert!(matches!(
            RecognitionOutcome::NoInput.error(),
            Some(Error::NoTranscription(NoTranscriptionCause::Timeout))
        ));
        let no_match = RecognitionOutcome::NoMatch { text: "x".into(), threshold: 70 };
        assert!(matches!(no_match.error(), Some(Error::NoMatch { threshold: 70, .. })));

        let confirmed = RecognitionOutcome::NeedsConfirmation { text: "x".into(), candidates: vec![] };
        assert!(confirmed.error().is_none());
    }
}
