//! 外部コマンドによる文字起こし
//!
//! コマンドが録音と認識を行い、結果を標準出力に書く想定。
//! - 終了コード0: 標準出力が認識結果（空なら認識不可）
//! - 終了コード2: 発話なし
//! - それ以外: サービス障害

use super::{Transcriber, TranscriptionFailure};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

/// 「発話なし」を表す終了コード
pub const NO_SPEECH_EXIT_CODE: i32 = 2;

pub struct CommandTranscriber {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandTranscriber {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

#[async_trait]
impl Transcriber for CommandTranscriber {
    fn name(&self) -> &str {
        &self.program
    }

    async fn transcribe(&self) -> Result<String, TranscriptionFailure> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => return Err(TranscriptionFailure::NoSpeech),
            Ok(Err(e)) => {
                return Err(TranscriptionFailure::ServiceFailure(format!(
                    "{} の起動に失敗: {}",
                    self.program, e
                )))
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            if output.status.code() == Some(NO_SPEECH_EXIT_CODE) {
                return Err(TranscriptionFailure::NoSpeech);
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriptionFailure::ServiceFailure(format!(
                "{} failed (code {:?}): {}",
                self.program,
                output.status.code(),
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(TranscriptionFailure::Unintelligible);
        }
        Ok(text)
    }
}
