//! 氏名列の判定
//!
//! 列名を正規化してキーワード表と照合し、氏名として使う列を決める。
//!
//! ## 判定順
//! 1. 「氏名」列（full name / nom complet）があれば単一列で確定
//! 2. 姓の列と名の列が両方あれば2列結合（それぞれ重みが最大の列）
//! 3. 弱い候補（name / participant / invité）のうち重みが最大のもの
//! 4. いずれもなければ `AmbiguousNameField`（操作者に列を選んでもらう）

use crate::error::{Error, Result};
use crate::normalize::normalize;
use crate::record::{Record, Roster};
use serde::{Deserialize, Serialize};

/// 合成列名の接頭辞。出力時に除外する
pub const SYNTHETIC_FIELD_PREFIX: &str = "__";

/// 2列結合時の合成氏名の列名
pub const SYNTHETIC_FULL_NAME: &str = "__full_name";

/// 内部で合成した列か
pub fn is_synthetic_field(name: &str) -> bool {
    name.starts_with(SYNTHETIC_FIELD_PREFIX)
}

/// 列の役割
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldRole {
    FullName,
    Family,
    Given,
    Fallback,
}

/// (キーワード, 役割, 重み)
const KEYWORDS: &[(&str, FieldRole, u8)] = &[
    ("full name", FieldRole::FullName, 100),
    ("fullname", FieldRole::FullName, 100),
    ("nom complet", FieldRole::FullName, 100),
    ("nomcomplet", FieldRole::FullName, 100),
    ("prenom", FieldRole::Given, 80),
    ("firstname", FieldRole::Given, 80),
    ("first name", FieldRole::Given, 80),
    ("given name", FieldRole::Given, 80),
    ("lastname", FieldRole::Family, 80),
    ("last name", FieldRole::Family, 80),
    ("surname", FieldRole::Family, 80),
    ("family name", FieldRole::Family, 80),
    ("nom", FieldRole::Family, 70),
    ("name", FieldRole::Fallback, 30),
    ("participant", FieldRole::Fallback, 20),
    ("invite", FieldRole::Fallback, 10),
];

/// 名の列を示す語。姓候補から除外するのに使う
const GIVEN_MARKERS: &[&str] = &["prenom", "firstname", "first name", "given name"];

/// 氏名の取り出し方
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum NameFieldSpec {
    /// 1列に氏名が入っている
    Single { field: String },
    /// 名 + " " + 姓 で合成する
    Paired { given: String, family: String },
}

impl NameFieldSpec {
    /// レコードの氏名を組み立てる
    pub fn full_name(&self, record: &Record) -> String {
        match self {
            NameFieldSpec::Single { field } => record.value(field).trim().to_string(),
            NameFieldSpec::Paired { given, family } => {
                let given = record.value(given).trim();
                let family = record.value(family).trim();
                format!("{} {}", given, family).trim().to_string()
            }
        }
    }

    /// 氏名の列名（2列結合時は合成列名）
    pub fn column_name(&self) -> &str {
        match self {
            NameFieldSpec::Single { field } => field,
            NameFieldSpec::Paired { .. } => SYNTHETIC_FULL_NAME,
        }
    }

    /// 指定した列が名簿に存在するか確認する
    pub fn validate(&self, roster: &Roster) -> Result<()> {
        let fields: Vec<&str> = match self {
            NameFieldSpec::Single { field } => vec![field],
            NameFieldSpec::Paired { given, family } => vec![given, family],
        };
        for field in fields {
            if !roster.has_field(field) {
                return Err(Error::UnknownField(field.to_string()));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for NameFieldSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NameFieldSpec::Single { field } => write!(f, "{}", field),
            NameFieldSpec::Paired { given, family } => write!(f, "{} + {}", given, family),
        }
    }
}

/// 列名から役割と重みを判定する（最も強い役割のみ）
fn classify(field_name: &str) -> Option<(FieldRole, u8)> {
    let normalized = normalize(field_name).replace('_', " ");
    let has_given_marker = GIVEN_MARKERS.iter().any(|m| normalized.contains(m));

    KEYWORDS
        .iter()
        .filter(|(keyword, _, _)| normalized.contains(keyword))
        .filter(|(_, role, _)| !(*role == FieldRole::Family && has_given_marker))
        .map(|(_, role, weight)| (*role, *weight))
        .max_by_key(|(role, weight)| (role_rank(*role), *weight))
}

fn role_rank(role: FieldRole) -> u8 {
    match role {
        FieldRole::FullName => 3,
        FieldRole::Given | FieldRole::Family => 2,
        FieldRole::Fallback => 1,
    }
}

/// 列名リストから氏名列を判定する
pub fn resolve_name_field<S: AsRef<str>>(field_names: &[S]) -> Result<NameFieldSpec> {
    let mut family: Option<(&str, u8)> = None;
    let mut given: Option<(&str, u8)> = None;
    let mut fallback: Option<(&str, u8)> = None;

    // 同じ役割では重みが最大のもの、同じ重みなら先に現れたもの
    fn keep_heaviest<'a>(slot: &mut Option<(&'a str, u8)>, name: &'a str, weight: u8) {
        if slot.map_or(true, |(_, w)| weight > w) {
            *slot = Some((name, weight));
        }
    }

    for name in field_names {
        let name = name.as_ref();
        if is_synthetic_field(name) {
            continue;
        }
        let Some((role, weight)) = classify(name) else {
            continue;
        };

        match role {
            FieldRole::FullName => {
                tracing::debug!(field = name, "氏名列を検出");
                return Ok(NameFieldSpec::Single { field: name.to_string() });
            }
            FieldRole::Family => keep_heaviest(&mut family, name, weight),
            FieldRole::Given => keep_heaviest(&mut given, name, weight),
            FieldRole::Fallback => keep_heaviest(&mut fallback, name, weight),
        }
    }

    if let (Some((given, _)), Some((family, _))) = (given, family) {
        tracing::debug!(given, family, "姓名の2列を検出");
        return Ok(NameFieldSpec::Paired {
            given: given.to_string(),
            family: family.to_string(),
        });
    }

    if let Some((field, _)) = fallback {
        tracing::debug!(field, "弱い候補を氏名列として採用");
        return Ok(NameFieldSpec::Single { field: field.to_string() });
    }

    Err(Error::AmbiguousNameField {
        fields: field_names.iter().map(|f| f.as_ref().to_string()).collect(),
    })
}
