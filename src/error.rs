use thiserror::Error;

#[derive(Error, Debug)]
pub enum EkhoError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("名簿ファイルが不正: {0}")]
    InvalidRoster(String),

    #[error("音声認識コマンドの設定が不正: {0}")]
    InvalidTranscriber(String),

    #[error("入力エラー: {0}")]
    Prompt(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] ekho_common::Error),
}

pub type Result<T> = std::result::Result<T, EkhoError>;
