use crate::capture::TranscriberConfig;
use crate::error::{EkhoError, Result};
use ekho_common::MatchConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 照合・自動確定の設定
    pub matching: MatchConfig,
    /// 音声認識の言語
    pub language: String,
    /// 発話を待つ秒数
    pub listen_timeout_seconds: u64,
    /// 音声認識の手段（上から順に試す）
    pub transcribers: Vec<TranscriberConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            matching: MatchConfig::default(),
            language: "fr-FR".into(),
            listen_timeout_seconds: 10,
            transcribers: vec![TranscriberConfig::Typed],
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| EkhoError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("ekho").join("config.json"))
    }

    /// 環境変数を優先
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(threshold) = read_score_env("EKHO_THRESHOLD")? {
            self.matching.threshold = threshold;
        }
        if let Some(threshold) = read_score_env("EKHO_AUTO_THRESHOLD")? {
            self.matching.auto_threshold = threshold;
        }
        Ok(())
    }

    /// コマンドライン指定の閾値を反映して検証する
    pub fn matching_with(&self, threshold: Option<u8>, auto_threshold: Option<u8>) -> Result<MatchConfig> {
        let mut matching = self.matching.clone();
        if let Some(t) = threshold {
            matching.threshold = t;
        }
        if let Some(t) = auto_threshold {
            matching.auto_threshold = t;
        }
        matching.validate()?;
        Ok(matching)
    }
}

fn read_score_env(name: &str) -> Result<Option<u8>> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u8>()
            .map(Some)
            .map_err(|_| EkhoError::Config(format!("{} の値が不正です: {}", name, value))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.matching.threshold, 70);
        assert_eq!(config.language, "fr-FR");
        assert_eq!(config.transcribers.len(), 1);
    }

    #[test]
    fn test_matching_with_overrides() {
        let config = Config::default();
        let matching = config.matching_with(Some(80), None).unwrap();
        assert_eq!(matching.threshold, 80);
        assert_eq!(matching.auto_threshold, 95);

        assert!(config.matching_with(Some(99), Some(90)).is_err());
    }

    #[test]
    fn test_partial_config_json() {
        let config: Config = serde_json::from_str(r#"{"language": "en-US"}"#).unwrap();
        assert_eq!(config.language, "en-US");
        assert_eq!(config.listen_timeout_seconds, 10);
    }
}
