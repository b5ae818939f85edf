//! キーボード入力（音声が使えないときの手入力）

use super::{Transcriber, TranscriptionFailure};
use async_trait::async_trait;
use dialoguer::Input;

pub struct TypedTranscriber {
    prompt: String,
}

impl TypedTranscriber {
    pub fn new() -> Self {
        Self {
            prompt: "氏名を入力（空でスキップ）".into(),
        }
    }
}

impl Default for TypedTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcriber for TypedTranscriber {
    fn name(&self) -> &str {
        "keyboard"
    }

    async fn transcribe(&self) -> Result<String, TranscriptionFailure> {
        let prompt = self.prompt.clone();
        let input = tokio::task::spawn_blocking(move || {
            Input::<String>::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
        })
        .await
        .map_err(|e| TranscriptionFailure::ServiceFailure(e.to_string()))?
        .map_err(|e| TranscriptionFailure::ServiceFailure(e.to_string()))?;

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(TranscriptionFailure::NoSpeech);
        }
        Ok(trimmed.to_string())
    }
}
