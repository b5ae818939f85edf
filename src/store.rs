//! セッション記録の保存
//!
//! 名簿ファイルの隣に出欠の記録（UpdateOverlay）と氏名列の指定を保存し、
//! 次回読み込み時に再適用する。

use crate::error::Result;
use ekho_common::{AttendanceSession, NameFieldSpec, UpdateOverlay};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const SESSION_SUFFIX: &str = ".ekho-session.json";
const TEMP_EXTENSION: &str = "json.tmp";

/// セッション記録ファイルの構造
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// バージョン（互換性チェック用）
    version: u32,
    /// 操作者が指定した氏名列
    #[serde(default)]
    pub name_field: Option<NameFieldSpec>,
    /// レコード番号 → 最後に記録した出欠
    #[serde(default)]
    pub overlay: UpdateOverlay,
}

impl SessionSnapshot {
    const CURRENT_VERSION: u32 = 1;

    /// セッションの現在の状態から作る
    pub fn capture(session: &AttendanceSession) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            name_field: session.name_field().cloned(),
            overlay: session.ledger().overlay().clone(),
        }
    }

    /// 名簿ファイルに対応する記録ファイルのパス
    pub fn snapshot_path(roster_path: &Path) -> PathBuf {
        let stem = roster_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "roster".to_string());
        let parent = roster_path.parent().unwrap_or_else(|| Path::new("."));
        parent.join(format!("{}{}", stem, SESSION_SUFFIX))
    }

    /// 記録を読み込む（なし・破損・バージョン違いは空として扱う）
    pub fn load(roster_path: &Path) -> Self {
        let path = Self::snapshot_path(roster_path);
        if !path.exists() {
            return Self::default();
        }

        let file = match File::open(&path) {
            Ok(f) => f,
            Err(_) => return Self::default(),
        };

        match serde_json::from_reader::<_, SessionSnapshot>(BufReader::new(file)) {
            Ok(snapshot) if snapshot.version == Self::CURRENT_VERSION => snapshot,
            Ok(snapshot) => {
                tracing::warn!(version = snapshot.version, "セッション記録のバージョン不一致、破棄します");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "セッション記録を読めません、破棄します");
                Self::default()
            }
        }
    }

    /// 書き込み途中の一時ファイルのパス
    pub fn temp_path(roster_path: &Path) -> PathBuf {
        Self::snapshot_path(roster_path).with_extension(TEMP_EXTENSION)
    }

    /// 記録を保存する
    ///
    /// 一時ファイルに書き切ってから置き換えるので、途中で止まっても前回の記録は残る。
    pub fn save(&self, roster_path: &Path) -> Result<()> {
        let path = Self::snapshot_path(roster_path);
        let temp = Self::temp_path(roster_path);

        if let Err(e) = self.write_to(&temp) {
            let _ = std::fs::remove_file(&temp);
            return Err(e);
        }
        std::fs::rename(&temp, &path)?;
        Ok(())
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    /// 記録を削除する
    pub fn clear(roster_path: &Path) -> Result<bool> {
        let path = Self::snapshot_path(roster_path);
        if path.exists() {
            std::fs::remove_file(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// セッションへ適用する。適用した出欠の件数を返す
    ///
    /// 保存した氏名列が名簿から消えていれば自動判定のままにする。
    pub fn restore_into(&self, session: &mut AttendanceSession) -> usize {
        if let Some(spec) = &self.name_field {
            if let Err(e) = session.set_name_field(spec.clone()) {
                tracing::warn!(error = %e, "保存した氏名列を使えません");
            }
        }
        session.apply_overlay(&self.overlay)
    }

    pub fn len(&self) -> usize {
        self.overlay.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlay.is_empty()
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            name_field: None,
            overlay: UpdateOverlay::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_path() {
        let path = SessionSnapshot::snapshot_path(Path::new("/tmp/liste.json"));
        assert_eq!(path, PathBuf::from("/tmp/liste.ekho-session.json"));
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let path = SessionSnapshot::temp_path(Path::new("/tmp/liste.json"));
        assert_eq!(path, PathBuf::from("/tmp/liste.ekho-session.json.tmp"));
    }

    #[test]
    fn test_default_is_empty() {
        assert!(SessionSnapshot::default().is_empty());
    }
}
