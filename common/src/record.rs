//! 名簿の型定義
//!
//! - Record: 列名 → 文字列値 のマップ（欠損・NaN は空文字に正規化）
//! - Roster: 列名リストとレコード列。レコードの並び順が唯一の識別子

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 欠損値とみなす文字列（表計算ソフトの書き出しで空欄がこうなる）
const MISSING_MARKER: &str = "nan";

/// 名簿の1行
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: HashMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// 列名と値の組から作る
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut record = Self::new();
        for (key, value) in pairs {
            record.insert(key, value.as_ref());
        }
        record
    }

    /// JSONオブジェクトから作る（数値・真偽値は文字列化、null は空文字）
    pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut record = Self::new();
        for (key, value) in object {
            let text = match value {
                serde_json::Value::Null => String::new(),
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                other => other.to_string(),
            };
            record.insert(key.clone(), &text);
        }
        record
    }

    /// 値を設定する。`NaN` は空文字として保存する
    ///
    /// "Nat" や "None" などは氏名でありうるのでそのまま残す。
    pub fn insert(&mut self, key: impl Into<String>, value: &str) {
        let cleaned = if is_missing(value) { "" } else { value.trim() };
        self.values.insert(key.into(), cleaned.to_string());
    }

    /// 列の値（列がなければ None）
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// 列の値（列がなければ空文字）
    pub fn value(&self, field: &str) -> &str {
        self.get(field).unwrap_or("")
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }
}

fn is_missing(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case(MISSING_MARKER)
}

/// 名簿
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    /// 元ファイルの列順
    pub field_names: Vec<String>,
    pub records: Vec<Record>,
}

impl Roster {
    pub fn new(field_names: Vec<String>, records: Vec<Record>) -> Self {
        Self { field_names, records }
    }

    /// JSON配列（オブジェクトの列）から作る
    ///
    /// 列順は最初に現れた順。後続の行にだけある列も末尾に追加する。
    pub fn from_json_rows(rows: &[serde_json::Map<String, serde_json::Value>]) -> Self {
        let mut field_names: Vec<String> = Vec::new();
        let mut records = Vec::with_capacity(rows.len());

        for row in rows {
            for key in row.keys() {
                if !field_names.iter().any(|f| f == key) {
                    field_names.push(key.clone());
                }
            }
            records.push(Record::from_json_object(row));
        }

        Self { field_names, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.field_names.iter().any(|f| f == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_missing_values() {
        let record = Record::from_pairs([("Nom", "NaN"), ("Prenom", " Jean "), ("Ville", "nan")]);
        assert_eq!(record.get("Nom"), Some(""));
        assert_eq!(record.get("Prenom"), Some("Jean"));
        assert_eq!(record.value("Ville"), "");
        assert_eq!(record.get("Absent"), None);
        assert_eq!(record.value("Absent"), "");
    }

    #[test]
    fn test_record_keeps_name_like_values() {
        let record = Record::from_pairs([("Prenom", "Nat"), ("Nom", "None"), ("Surnom", "N/A"), ("Ville", "null")]);
        assert_eq!(record.value("Prenom"), "Nat");
        assert_eq!(record.value("Nom"), "None");
        assert_eq!(record.value("Surnom"), "N/A");
        assert_eq!(record.value("Ville"), "null");
    }

    #[test]
    fn test_record_from_json_object() {
        let value = json!({"Nom": "Dupont", "Age": 42, "Inscrit": true, "Note": null});
        let record = Record::from_json_object(value.as_object().unwrap());
        assert_eq!(record.value("Nom"), "Dupont");
        assert_eq!(record.value("Age"), "42");
        assert_eq!(record.value("Inscrit"), "true");
        assert_eq!(record.get("Note"), Some(""));
    }

    #[test]
    fn test_roster_from_json_rows_keeps_order() {
        let rows = json!([
            {"Nom": "Dupont", "Prenom": "Jean"},
            {"Nom": "Martin", "Prenom": "Marie", "Email": "m@example.com"}
        ]);
        let rows: Vec<_> = rows
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().unwrap().clone())
            .collect();
        let roster = Roster::from_json_rows(&rows);

        assert_eq!(roster.len(), 2);
        assert!(roster.has_field("Email"));
        assert_eq!(roster.get(1).unwrap().value("Prenom"), "Marie");
        assert_eq!(roster.get(0).unwrap().get("Email"), None);
    }
}
