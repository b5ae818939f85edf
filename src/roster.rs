//! 名簿ファイルの読み込みと出欠表の書き出し
//!
//! 名簿はJSON配列（1行1オブジェクト）。値の型は問わず、文字列に揃えて扱う。

use crate::error::{EkhoError, Result};
use crate::store::SessionSnapshot;
use chrono::Local;
use ekho_common::ledger::find_presence_field;
use ekho_common::{AttendanceSession, MatchConfig, Roster};
use serde_json::{Map, Value};
use std::path::Path;

/// 出席列がない名簿に追加する列名
pub const PRESENCE_COLUMN: &str = "Présent";
/// 確認時刻の列名
pub const TIME_COLUMN: &str = "Heure";
/// 出席を表す記号
pub const PRESENT_MARK: &str = "✓";

/// 名簿ファイルを読み込む
pub fn load_roster(path: &Path) -> Result<Roster> {
    if !path.exists() {
        return Err(EkhoError::FileNotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    parse_roster(&value)
}

/// JSON値から名簿を作る
pub fn parse_roster(value: &Value) -> Result<Roster> {
    let rows = value
        .as_array()
        .ok_or_else(|| EkhoError::InvalidRoster("JSON配列ではありません".into()))?;

    let objects = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.as_object()
                .cloned()
                .ok_or_else(|| EkhoError::InvalidRoster(format!("{}行目がオブジェクトではありません", i + 1)))
        })
        .collect::<Result<Vec<Map<String, Value>>>>()?;

    Ok(Roster::from_json_rows(&objects))
}

/// 名簿を読み込み、保存済みの記録を適用したセッションを開く
pub fn open_session(path: &Path, matching: MatchConfig) -> Result<(AttendanceSession, usize)> {
    let roster = load_roster(path)?;
    let mut session = AttendanceSession::load(roster, matching)?;
    let snapshot = SessionSnapshot::load(path);
    let restored = snapshot.restore_into(&mut session);
    Ok((session, restored))
}

/// 出欠表をJSON値にする
///
/// 元の列に加え、出席列（既存があれば上書き）と確認時刻列を持つ。合成列は出さない。
pub fn projection_to_json(session: &AttendanceSession) -> Value {
    let presence_column = find_presence_field(&session.roster().field_names)
        .unwrap_or(PRESENCE_COLUMN)
        .to_string();

    let rows = session
        .projection()
        .into_iter()
        .map(|row| {
            let mut object = Map::new();
            for (name, value) in row.fields {
                object.insert(name, Value::String(value));
            }
            let mark = if row.present { PRESENT_MARK } else { "" };
            object.insert(presence_column.clone(), Value::String(mark.to_string()));
            let time = row
                .confirmed_at
                .filter(|_| row.present)
                .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            object.insert(TIME_COLUMN.to_string(), Value::String(time));
            Value::Object(object)
        })
        .collect();

    Value::Array(rows)
}

/// 出欠表を書き出す
pub fn write_projection(session: &AttendanceSession, output: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&projection_to_json(session))?;
    std::fs::write(output, json)?;
    Ok(())
}
