//! 出欠台帳
//!
//! 出席状態の唯一の保持者。名簿の「出席」列は読み込み時の初期値としてのみ使う。
//! `mark` で書いた内容は UpdateOverlay にも記録し、名簿を読み直したときに
//! そのまま再適用できるようにする。

use crate::error::{Error, Result};
use crate::normalize::normalize;
use crate::ranker::MatchCandidate;
use crate::record::Roster;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 出席とみなす値（大文字小文字を区別しない）
const PRESENT_SYNONYMS: &[&str] = &["oui", "yes", "vrai", "true", "1", "✓", "✔"];

/// 出席列とみなす列名（正規化後）
const PRESENCE_FIELDS: &[&str] = &["present", "presente", "presence", "presents", "pointage"];

/// 1レコード分の出欠
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub present: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// 表示用の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceState {
    /// 未確認
    Unmarked,
    Present,
    /// 明示的に欠席とした
    Absent,
}

impl AttendanceRecord {
    pub fn state(&self) -> AttendanceState {
        match (self.present, self.confirmed_at) {
            (true, _) => AttendanceState::Present,
            (false, Some(_)) => AttendanceState::Absent,
            (false, None) => AttendanceState::Unmarked,
        }
    }
}

/// レコード番号 → 最後に書いた出欠
pub type UpdateOverlay = BTreeMap<usize, AttendanceRecord>;

/// 出欠の集計
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttendanceStats {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    /// 出席率（0.0〜1.0、名簿が空なら0.0）
    pub rate: f64,
}

/// 自動確定の結果
#[derive(Debug, Clone, PartialEq)]
pub struct AutoConfirmOutcome {
    /// 自動で出席にした候補
    pub confirmed: Option<MatchCandidate>,
    /// 手動確認に回す候補
    pub pending: Vec<MatchCandidate>,
}

/// 出欠台帳
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    records: Vec<AttendanceRecord>,
    overlay: UpdateOverlay,
}

impl Ledger {
    /// 全員未確認の台帳を作る
    pub fn new(len: usize) -> Self {
        Self {
            records: vec![AttendanceRecord::default(); len],
            overlay: UpdateOverlay::new(),
        }
    }

    /// 名簿の出席列を初期値にした台帳を作る
    pub fn seeded(roster: &Roster) -> Self {
        let mut ledger = Self::new(roster.len());
        ledger.reconcile_seed(roster);
        ledger
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&AttendanceRecord> {
        self.records.get(index)
    }

    pub fn is_present(&self, index: usize) -> bool {
        self.get(index).is_some_and(|r| r.present)
    }

    pub fn records(&self) -> &[AttendanceRecord] {
        &self.records
    }

    pub fn overlay(&self) -> &UpdateOverlay {
        &self.overlay
    }

    /// 出欠を記録する
    ///
    /// 同じ状態を繰り返し記録しても変わるのは時刻だけ。
    pub fn mark(&mut self, index: usize, present: bool, at: DateTime<Utc>) -> Result<()> {
        let len = self.records.len();
        let slot = self
            .records
            .get_mut(index)
            .ok_or(Error::InvalidRecordIndex { index, len })?;

        *slot = AttendanceRecord { present, confirmed_at: Some(at) };
        self.overlay.insert(index, *slot);
        tracing::info!(index, present, "出欠を記録");
        Ok(())
    }

    /// 全員を未確認に戻す
    pub fn reset_all(&mut self) {
        for (index, record) in self.records.iter_mut().enumerate() {
            *record = AttendanceRecord::default();
            self.overlay.insert(index, *record);
        }
        tracing::info!(total = self.records.len(), "出欠をリセット");
    }

    /// 名簿の出席列から初期状態を設定する（読み込み時のみ）
    ///
    /// 出席列がなければ全員未確認。
    pub fn reconcile_seed(&mut self, roster: &Roster) {
        self.records = vec![AttendanceRecord::default(); roster.len()];

        let Some(field) = find_presence_field(&roster.field_names) else {
            return;
        };

        for (record, row) in self.records.iter_mut().zip(&roster.records) {
            record.present = is_present_value(row.value(field));
        }
        tracing::debug!(field, present = self.present_count(), "出席列から初期化");
    }

    /// 記録済みの出欠を再適用する（範囲外の番号は捨てる）
    pub fn apply_overlay(&mut self, overlay: &UpdateOverlay) -> usize {
        let mut applied = 0;
        for (&index, record) in overlay {
            match self.records.get_mut(index) {
                Some(slot) => {
                    *slot = *record;
                    self.overlay.insert(index, *record);
                    applied += 1;
                }
                None => {
                    tracing::warn!(index, len = self.records.len(), "名簿外の記録を破棄");
                }
            }
        }
        applied
    }

    /// 最上位候補が `auto_threshold` 以上なら出席にする
    ///
    /// それ以外の候補は手動確認用に返す。
    pub fn auto_confirm(
        &mut self,
        ranked: &[MatchCandidate],
        auto_threshold: u8,
        at: DateTime<Utc>,
    ) -> Result<AutoConfirmOutcome> {
        match ranked.split_first() {
            Some((top, rest)) if top.score >= auto_threshold => {
                self.mark(top.record_index, true, at)?;
                tracing::info!(index = top.record_index, score = top.score, "自動確定");
                Ok(AutoConfirmOutcome {
                    confirmed: Some(top.clone()),
                    pending: rest.to_vec(),
                })
            }
            _ => Ok(AutoConfirmOutcome {
                confirmed: None,
                pending: ranked.to_vec(),
            }),
        }
    }

    fn present_count(&self) -> usize {
        self.records.iter().filter(|r| r.present).count()
    }

    /// 現在の状態から集計する
    pub fn stats(&self) -> AttendanceStats {
        let total = self.records.len();
        let present = self.present_count();
        let rate = if total == 0 { 0.0 } else { present as f64 / total as f64 };
        AttendanceStats {
            total,
            present,
            absent: total - present,
            rate,
        }
    }
}

/// 出席列を探す
pub fn find_presence_field(field_names: &[String]) -> Option<&str> {
    field_names
        .iter()
        .find(|name| PRESENCE_FIELDS.contains(&normalize(name).as_str()))
        .map(String::as_str)
}

/// 出席を表す値か
pub fn is_present_value(value: &str) -> bool {
    let cleaned: String = value
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| *c != '\u{fe0f}')
        .collect();
    PRESENT_SYNONYMS.contains(&cleaned.as_str())
}
