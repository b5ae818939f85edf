//! 対話式点呼モジュール
//!
//! 発話を取得 → 照合 → 自動確定、または候補から操作者が選ぶ、を繰り返す。
//! 出欠を記録するたびにセッション記録を保存する。

use crate::capture::FallbackChain;
use crate::error::{EkhoError, Result};
use crate::store::SessionSnapshot;
use chrono::Utc;
use dialoguer::{Confirm, Select};
use ekho_common::{AttendanceSession, MatchCandidate, RecognitionOutcome};
use std::path::Path;

/// 文字起こしの失敗がこの回数続いたら点呼を打ち切る
pub const MAX_CONSECUTIVE_FAILURES: usize = 3;

/// 候補に対する操作
pub enum CandidateAction {
    /// 出席にする
    Confirm(usize),
    /// 欠席にする
    Reject(usize),
    /// 何もしない
    Skip,
    /// 保存して終了
    Quit,
}

/// 対話式で点呼する
pub async fn run_listen(
    roster_path: &Path,
    session: &mut AttendanceSession,
    chain: &FallbackChain,
) -> Result<()> {
    println!("🎙️ 文字起こし手段: {}", chain.names().join(" → "));
    println!("---");

    let mut failures = 0;
    loop {
        let stats = session.stats();
        println!("[出席 {}/{}] 氏名をどうぞ...", stats.present, stats.total);

        let transcription = chain.transcribe().await.map_err(|failure| {
            tracing::debug!(%failure, "全手段で文字起こし失敗");
            failure.cause()
        });

        let outcome = session.submit_transcription(transcription, Utc::now())?;
        if !matches!(outcome, RecognitionOutcome::Unrecognized(_)) {
            failures = 0;
        }
        let mut changed = outcome.mutated();
        let mut quit = false;

        match outcome {
            RecognitionOutcome::NoInput => {
                println!("  → 発話が検出されませんでした");
                quit = !prompt_continue()?;
            }
            RecognitionOutcome::Unrecognized(cause) => {
                failures += 1;
                if failures >= MAX_CONSECUTIVE_FAILURES {
                    println!("  ❌ {}（{}回連続）。文字起こしの設定を確認してください", cause, failures);
                    quit = true;
                } else {
                    println!("  ❌ {}、もう一度お願いします", cause);
                }
            }
            RecognitionOutcome::NoMatch { .. } => {
                if let Some(e) = outcome.error() {
                    println!("  ❌ {}、もう一度お願いします", e);
                }
            }
            RecognitionOutcome::AutoConfirmed { text, confirmed, others } => {
                println!("  🗣️ {}", text);
                println!("  ✅ {} を出席にしました（スコア: {}）", confirmed.display_name, confirmed.score);
                if !others.is_empty() {
                    let (c, q) = review_candidates(session, &others, true)?;
                    changed |= c;
                    quit = q;
                }
            }
            RecognitionOutcome::NeedsConfirmation { text, candidates } => {
                println!("  🗣️ {}", text);
                let (c, q) = review_candidates(session, &candidates, false)?;
                changed |= c;
                quit = q;
            }
        }

        if changed {
            SessionSnapshot::capture(session).save(roster_path)?;
        }
        println!();

        if quit {
            break;
        }
    }

    let stats = session.stats();
    println!(
        "✓ 出席 {} / 欠席 {} （出席率 {:.0}%）",
        stats.present,
        stats.absent,
        stats.rate * 100.0
    );
    Ok(())
}

/// 候補を確認してもらう。戻り値は (台帳を変更したか, 終了するか)
fn review_candidates(
    session: &mut AttendanceSession,
    candidates: &[MatchCandidate],
    optional: bool,
) -> Result<(bool, bool)> {
    if optional {
        println!("  他の候補:");
    } else {
        println!("  候補:");
    }

    match prompt_candidate_action(candidates)? {
        CandidateAction::Confirm(index) => {
            session.confirm(index, Utc::now())?;
            println!("  ✅ {} を出席にしました", display(session, index));
            Ok((true, false))
        }
        CandidateAction::Reject(index) => {
            session.reject(index, Utc::now())?;
            println!("  ✗ {} を欠席にしました", display(session, index));
            Ok((true, false))
        }
        CandidateAction::Skip => Ok((false, false)),
        CandidateAction::Quit => {
            println!("保存して終了します...");
            Ok((false, true))
        }
    }
}

fn display(session: &AttendanceSession, index: usize) -> String {
    session.display_name(index).unwrap_or_else(|| format!("#{}", index))
}

/// 候補選択プロンプト
fn prompt_candidate_action(candidates: &[MatchCandidate]) -> Result<CandidateAction> {
    let mut items: Vec<String> = candidates
        .iter()
        .map(|c| format!("{} (スコア: {}, #{})", c.display_name, c.score, c.record_index))
        .collect();
    items.push("スキップ".into());
    items.push("終了".into());

    let selected = Select::new()
        .with_prompt("該当者を選択")
        .items(&items)
        .default(0)
        .interact()
        .map_err(|e| EkhoError::Prompt(e.to_string()))?;

    if selected == candidates.len() {
        return Ok(CandidateAction::Skip);
    }
    if selected > candidates.len() {
        return Ok(CandidateAction::Quit);
    }

    let index = candidates[selected].record_index;
    let actions = ["出席", "欠席", "戻る"];
    let choice = Select::new()
        .with_prompt(candidates[selected].display_name.as_str())
        .items(&actions[..])
        .default(0)
        .interact()
        .map_err(|e| EkhoError::Prompt(e.to_string()))?;

    Ok(match choice {
        0 => CandidateAction::Confirm(index),
        1 => CandidateAction::Reject(index),
        _ => CandidateAction::Skip,
    })
}

fn prompt_continue() -> Result<bool> {
    Confirm::new()
        .with_prompt("続けますか？")
        .default(true)
        .interact()
        .map_err(|e| EkhoError::Prompt(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{Transcriber, TranscriptionFailure};
    use async_trait::async_trait;
    use ekho_common::{MatchConfig, Record, Roster};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// 常にサービス障害を返す手段
    struct Unreachable {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transcriber for Unreachable {
        fn name(&self) -> &str {
            "unreachable"
        }

        async fn transcribe(&self) -> std::result::Result<String, TranscriptionFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(TranscriptionFailure::ServiceFailure("接続できません".into()))
        }
    }

    #[tokio::test]
    async fn test_listen_stops_after_repeated_service_failures() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let roster_path = dir.path().join("liste.json");
        let roster = Roster::new(
            vec!["Nom complet".into()],
            vec![Record::from_pairs([("Nom complet", "Jean Dupont")])],
        );
        let mut session = AttendanceSession::load(roster, MatchConfig::default()).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let chain = FallbackChain::new().with(Unreachable { calls: Arc::clone(&calls) });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            run_listen(&roster_path, &mut session, &chain),
        )
        .await
        .expect("点呼が終わらない");

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_CONSECUTIVE_FAILURES);
        assert_eq!(session.stats().present, 0);
        assert!(!SessionSnapshot::snapshot_path(&roster_path).exists());
    }
}
