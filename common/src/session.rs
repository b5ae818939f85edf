//! 点呼セッション
//!
//! 名簿・氏名列・台帳・照合設定をまとめて保持する。
//! 各操作はこのオブジェクトを明示的に受け取って行う。

use crate::config::MatchConfig;
use crate::error::{Error, Result};
use crate::field::{is_synthetic_field, resolve_name_field, NameFieldSpec, SYNTHETIC_FULL_NAME};
use crate::ledger::{AttendanceStats, Ledger, UpdateOverlay};
use crate::outcome::{NoTranscriptionCause, RecognitionOutcome};
use crate::ranker::{rank, MatchCandidate};
use crate::record::Roster;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// 出力用の1行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceRow {
    pub index: usize,
    /// 元の列（合成列を除く、名簿の列順）
    pub fields: Vec<(String, String)>,
    pub display_name: String,
    pub present: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// 点呼セッション
#[derive(Debug, Clone)]
pub struct AttendanceSession {
    roster: Roster,
    name_field: Option<NameFieldSpec>,
    ledger: Ledger,
    config: MatchConfig,
}

impl AttendanceSession {
    /// 名簿を読み込み、氏名列を自動判定する
    ///
    /// 判定できない場合もセッションは作られる。`set_name_field` で指定するまで
    /// 照合は `AmbiguousNameField` を返す。
    pub fn load(roster: Roster, config: MatchConfig) -> Result<Self> {
        config.validate()?;

        let name_field = match resolve_name_field(&roster.field_names) {
            Ok(spec) => Some(spec),
            Err(Error::AmbiguousNameField { fields }) => {
                tracing::warn!(?fields, "氏名列を自動判定できません");
                None
            }
            Err(e) => return Err(e),
        };
        let ledger = Ledger::seeded(&roster);

        tracing::info!(records = roster.len(), name_field = ?name_field, "名簿を読み込み");
        let mut session = Self { roster, name_field, ledger, config };
        session.fill_full_name();
        Ok(session)
    }

    /// 氏名列を明示的に指定する
    pub fn set_name_field(&mut self, spec: NameFieldSpec) -> Result<()> {
        spec.validate(&self.roster)?;
        self.name_field = Some(spec);
        self.fill_full_name();
        Ok(())
    }

    /// 2列指定のとき、合成した氏名を `__full_name` 列に書き込む
    fn fill_full_name(&mut self) {
        let Some(spec @ NameFieldSpec::Paired { .. }) = &self.name_field else {
            return;
        };
        for record in &mut self.roster.records {
            let full_name = spec.full_name(record);
            record.insert(SYNTHETIC_FULL_NAME, &full_name);
        }
        if !self.roster.has_field(SYNTHETIC_FULL_NAME) {
            self.roster.field_names.push(SYNTHETIC_FULL_NAME.to_string());
        }
    }

    /// 名簿を読み直す。これまでの記録は再適用される
    ///
    /// 指定済みの氏名列が新しい名簿にもあればそのまま使う。
    pub fn reload(&mut self, roster: Roster) -> usize {
        let overlay = self.ledger.overlay().clone();

        let keep_field = self
            .name_field
            .as_ref()
            .is_some_and(|spec| spec.validate(&roster).is_ok());
        if !keep_field {
            self.name_field = resolve_name_field(&roster.field_names).ok();
        }

        self.ledger = Ledger::seeded(&roster);
        self.roster = roster;
        self.fill_full_name();
        self.ledger.apply_overlay(&overlay)
    }

    /// 保存済みの記録を適用する
    pub fn apply_overlay(&mut self, overlay: &UpdateOverlay) -> usize {
        self.ledger.apply_overlay(overlay)
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn name_field(&self) -> Option<&NameFieldSpec> {
        self.name_field.as_ref()
    }

    /// 氏名列（未確定なら AmbiguousNameField）
    pub fn require_name_field(&self) -> Result<&NameFieldSpec> {
        self.name_field.as_ref().ok_or_else(|| Error::AmbiguousNameField {
            fields: self.roster.field_names.clone(),
        })
    }

    /// レコードの表示名
    pub fn display_name(&self, index: usize) -> Option<String> {
        let spec = self.name_field.as_ref()?;
        self.roster.get(index).map(|record| spec.full_name(record))
    }

    /// 候補を順位付けする（台帳は変更しない）
    pub fn rank(&self, utterance: &str) -> Result<Vec<MatchCandidate>> {
        self.rank_with_threshold(utterance, self.config.threshold)
    }

    /// 閾値を指定して順位付けする
    pub fn rank_with_threshold(&self, utterance: &str, threshold: u8) -> Result<Vec<MatchCandidate>> {
        let spec = self.require_name_field()?;
        Ok(rank(utterance, &self.roster, spec, threshold, &self.config))
    }

    /// 候補がなければ NoMatch を返す
    pub fn find_matches(&self, utterance: &str) -> Result<Vec<MatchCandidate>> {
        let ranked = self.rank(utterance)?;
        if ranked.is_empty() {
            return Err(Error::NoMatch {
                text: utterance.to_string(),
                threshold: self.config.threshold,
            });
        }
        Ok(ranked)
    }

    /// 文字起こし結果を処理する
    ///
    /// 取得失敗（無音・認識不可）は台帳を変更せずに結果として返す。
    pub fn submit_transcription(
        &mut self,
        transcription: std::result::Result<String, NoTranscriptionCause>,
        at: DateTime<Utc>,
    ) -> Result<RecognitionOutcome> {
        match transcription {
            Ok(text) => self.submit(&text, at),
            Err(cause) => {
                tracing::info!(%cause, "音声を取得できず");
                Ok(RecognitionOutcome::from_cause(cause))
            }
        }
    }

    /// 発話を照合し、自動確定の条件を満たせば出席にする
    pub fn submit(&mut self, utterance: &str, at: DateTime<Utc>) -> Result<RecognitionOutcome> {
        let ranked = match self.find_matches(utterance) {
            Ok(ranked) => ranked,
            Err(Error::NoMatch { text, threshold }) => {
                return Ok(RecognitionOutcome::NoMatch { text, threshold });
            }
            Err(e) => return Err(e),
        };

        let outcome = self.ledger.auto_confirm(&ranked, self.config.auto_threshold, at)?;
        let text = utterance.to_string();
        Ok(match outcome.confirmed {
            Some(confirmed) => RecognitionOutcome::AutoConfirmed {
                text,
                confirmed,
                others: outcome.pending,
            },
            None => RecognitionOutcome::NeedsConfirmation {
                text,
                candidates: outcome.pending,
            },
        })
    }

    /// 手動で出席にする
    pub fn confirm(&mut self, index: usize, at: DateTime<Utc>) -> Result<()> {
        self.ledger.mark(index, true, at)
    }

    /// 手動で欠席にする
    pub fn reject(&mut self, index: usize, at: DateTime<Utc>) -> Result<()> {
        self.ledger.mark(index, false, at)
    }

    pub fn reset_all(&mut self) {
        self.ledger.reset_all();
    }

    pub fn stats(&self) -> AttendanceStats {
        self.ledger.stats()
    }

    /// 出力用の行を作る
    pub fn projection(&self) -> Vec<AttendanceRow> {
        let visible_fields: Vec<&String> = self
            .roster
            .field_names
            .iter()
            .filter(|f| !is_synthetic_field(f))
            .collect();

        self.roster
            .records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let attendance = self.ledger.get(index).copied().unwrap_or_default();
                AttendanceRow {
                    index,
                    fields: visible_fields
                        .iter()
                        .map(|f| (f.to_string(), record.value(f).to_string()))
                        .collect(),
                    display_name: self.display_name(index).unwrap_or_default(),
                    present: attendance.present,
                    confirmed_at: attendance.confirmed_at,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn roster() -> Roster {
        Roster::new(
            vec!["Nom".into(), "Prenom".into(), "Présent".into()],
            vec![
                Record::from_pairs([("Nom", "Dupont"), ("Prenom", "Jean"), ("Présent", "")]),
                Record::from_pairs([("Nom", "Martin"), ("Prenom", "Marie"), ("Présent", "oui")]),
            ],
        )
    }

    #[test]
    fn test_load_resolves_paired_field() {
        let session = AttendanceSession::load(roster(), MatchConfig::default()).unwrap();
        assert!(matches!(session.name_field(), Some(NameFieldSpec::Paired { .. })));
        assert_eq!(session.display_name(0).as_deref(), Some("Jean Dupont"));
        assert!(session.ledger().is_present(1));
    }

    #[test]
    fn test_load_rejects_invalid_config() {
        let config = MatchConfig::default().with_threshold(90).with_auto_threshold(50);
        assert!(AttendanceSession::load(roster(), config).is_err());
    }

    #[test]
    fn test_ambiguous_field_blocks_ranking() {
        let roster = Roster::new(
            vec!["Code".into()],
            vec![Record::from_pairs([("Code", "Jean Dupont")])],
        );
        let mut session = AttendanceSession::load(roster, MatchConfig::default()).unwrap();
        assert!(matches!(session.rank("Jean"), Err(Error::AmbiguousNameField { .. })));

        session
            .set_name_field(NameFieldSpec::Single { field: "Code".into() })
            .unwrap();
        assert_eq!(session.rank("Jean Dupont").unwrap()[0].score, 100);
    }

    #[test]
    fn test_set_unknown_field() {
        let mut session = AttendanceSession::load(roster(), MatchConfig::default()).unwrap();
        let result = session.set_name_field(NameFieldSpec::Single { field: "Email".into() });
        assert!(matches!(result, Err(Error::UnknownField(_))));
    }

    #[test]
    fn test_submit_auto_confirms() {
        let mut session = AttendanceSession::load(roster(), MatchConfig::default()).unwrap();
        let outcome = session.submit("Jean Dupont", at(1)).unwrap();
        assert!(outcome.mutated());
        assert!(session.ledger().is_present(0));
    }

    #[test]
    fn test_submit_no_match_does_not_mutate() {
        let mut session = AttendanceSession::load(roster(), MatchConfig::default()).unwrap();
        let before = session.ledger().clone();
        let outcome = session.submit("xyz qqq", at(1)).unwrap();
        assert_eq!(
            outcome,
            RecognitionOutcome::NoMatch { text: "xyz qqq".into(), threshold: 70 }
        );
        assert_eq!(session.ledger(), &before);
    }

    #[test]
    fn test_submit_transcription_failures() {
        let mut session = AttendanceSession::load(roster(), MatchConfig::default()).unwrap();
        let outcome = session
            .submit_transcription(Err(NoTranscriptionCause::Timeout), at(1))
            .unwrap();
        assert_eq!(outcome, RecognitionOutcome::NoInput);

        let outcome = session
            .submit_transcription(Err(NoTranscriptionCause::Unintelligible), at(1))
            .unwrap();
        assert_eq!(outcome, RecognitionOutcome::Unrecognized(NoTranscriptionCause::Unintelligible));
        assert_eq!(session.stats().present, 1);
    }

    #[test]
    fn test_reload_keeps_marks() {
        let mut session = AttendanceSession::load(roster(), MatchConfig::default()).unwrap();
        session.confirm(0, at(1)).unwrap();
        session.reject(1, at(2)).unwrap();
        let before = session.ledger().records().to_vec();

        let applied = session.reload(roster());
        assert_eq!(applied, 2);
        assert_eq!(session.ledger().records(), before.as_slice());
    }

    #[test]
    fn test_paired_fills_synthetic_column() {
        let session = AttendanceSession::load(roster(), MatchConfig::default()).unwrap();
        assert!(session.roster().has_field(SYNTHETIC_FULL_NAME));
        assert_eq!(session.roster().get(1).unwrap().get(SYNTHETIC_FULL_NAME), Some("Marie Martin"));
    }

    #[test]
    fn test_projection_excludes_synthetic_fields() {
        let roster = roster();
        let mut session = AttendanceSession::load(roster, MatchConfig::default()).unwrap();
        session.confirm(0, at(1)).unwrap();

        let rows = session.projection();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].fields.iter().all(|(name, _)| !is_synthetic_field(name)));
        assert_eq!(rows[0].display_name, "Jean Dupont");
        assert!(rows[0].present);
        assert_eq!(rows[0].confirmed_at, Some(at(1)));
    }
}
