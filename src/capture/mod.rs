//! 音声取得・文字起こし
//!
//! 文字起こしの手段を順番に試す。最初に成功した結果を使い、
//! 全部失敗したときだけ失敗理由をまとめて返す。

mod command;
mod typed;

pub use command::CommandTranscriber;
pub use typed::TypedTranscriber;

use crate::error::{EkhoError, Result};
use async_trait::async_trait;
use ekho_common::NoTranscriptionCause;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 1回の文字起こしの失敗
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionFailure {
    /// 時間内に発話がなかった
    NoSpeech,
    /// 発話はあったが認識できなかった
    Unintelligible,
    /// 認識手段そのものの失敗
    ServiceFailure(String),
}

impl TranscriptionFailure {
    pub fn cause(&self) -> NoTranscriptionCause {
        match self {
            TranscriptionFailure::NoSpeech => NoTranscriptionCause::Timeout,
            TranscriptionFailure::Unintelligible => NoTranscriptionCause::Unintelligible,
            TranscriptionFailure::ServiceFailure(_) => NoTranscriptionCause::ServiceFailure,
        }
    }
}

impl std::fmt::Display for TranscriptionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptionFailure::ServiceFailure(detail) => {
                write!(f, "{}: {}", self.cause(), detail)
            }
            other => write!(f, "{}", other.cause()),
        }
    }
}

/// 文字起こしの手段
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// ログ表示用の名前
    fn name(&self) -> &str;

    /// 1回分の発話を取得して文字にする
    async fn transcribe(&self) -> std::result::Result<String, TranscriptionFailure>;
}

/// 設定ファイル上の文字起こし手段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranscriberConfig {
    /// 外部コマンド（標準出力に認識結果を出す）。引数の `{lang}` は言語に置換
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// 操作者のキーボード入力
    Typed,
}

/// 全手段が失敗したときの記録
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainFailure {
    pub attempts: Vec<(String, TranscriptionFailure)>,
}

impl ChainFailure {
    /// まとめた失敗理由
    ///
    /// 全手段がサービス障害ならサービス障害、どれかが「認識不可」なら認識不可、
    /// それ以外は無音（タイムアウト）。
    pub fn cause(&self) -> NoTranscriptionCause {
        let causes: Vec<NoTranscriptionCause> = self.attempts.iter().map(|(_, f)| f.cause()).collect();

        if causes.iter().all(|c| *c == NoTranscriptionCause::ServiceFailure) {
            NoTranscriptionCause::ServiceFailure
        } else if causes.contains(&NoTranscriptionCause::Unintelligible) {
            NoTranscriptionCause::Unintelligible
        } else {
            NoTranscriptionCause::Timeout
        }
    }
}

impl std::fmt::Display for ChainFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cause())?;
        for (name, failure) in &self.attempts {
            write!(f, "\n  - {}: {}", name, failure)?;
        }
        Ok(())
    }
}

/// 順番に試す文字起こし手段の列
#[derive(Default)]
pub struct FallbackChain {
    providers: Vec<Box<dyn Transcriber>>,
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: impl Transcriber + 'static) -> Self {
        self.push(provider);
        self
    }

    pub fn push(&mut self, provider: impl Transcriber + 'static) {
        self.providers.push(Box::new(provider));
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// 先頭から試し、最初の成功で打ち切る
    pub async fn transcribe(&self) -> std::result::Result<String, ChainFailure> {
        let mut failure = ChainFailure::default();

        for provider in &self.providers {
            let result = match provider.transcribe().await {
                Ok(text) if text.trim().is_empty() => Err(TranscriptionFailure::NoSpeech),
                other => other,
            };

            match result {
                Ok(text) => {
                    tracing::debug!(provider = provider.name(), %text, "文字起こし成功");
                    return Ok(text.trim().to_string());
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "文字起こし失敗、次の手段へ");
                    failure.attempts.push((provider.name().to_string(), e));
                }
            }
        }

        Err(failure)
    }
}

/// 設定から手段の列を組み立てる
pub fn build_chain(
    configs: &[TranscriberConfig],
    language: &str,
    timeout: Duration,
) -> Result<FallbackChain> {
    let mut chain = FallbackChain::new();

    for config in configs {
        match config {
            TranscriberConfig::Command { program, args } => {
                if program.trim().is_empty() {
                    return Err(EkhoError::InvalidTranscriber("program が空です".into()));
                }
                let args = args.iter().map(|a| a.replace("{lang}", language)).collect();
                chain.push(CommandTranscriber::new(program.clone(), args, timeout));
            }
            TranscriberConfig::Typed => chain.push(TypedTranscriber::new()),
        }
    }

    if chain.is_empty() {
        return Err(EkhoError::InvalidTranscriber("文字起こし手段が設定されていません".into()));
    }

    Ok(chain)
}
