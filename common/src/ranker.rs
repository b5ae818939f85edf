//! 候補の順位付けと重複除去
//!
//! 発話から変種（元の文・語順反転・単語ごと）を作り、全レコードと照合する。
//! 同じレコードは最大スコアの1件にまとめ、スコア降順・名簿順で並べる。

use crate::config::MatchConfig;
use crate::field::NameFieldSpec;
use crate::normalize::{normalize, tokenize};
use crate::record::Roster;
use crate::similarity::{score_normalized, ScoreBreakdown};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 照合候補
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub record_index: usize,
    pub display_name: String,
    pub score: u8,
}

/// 発話の変種
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryVariant {
    /// 正規化済みの問い合わせ文字列
    pub text: String,
    /// この変種に適用する閾値
    pub threshold: u8,
}

/// 発話から変種を作る（重複する文字列は閾値の低い方を残す）
pub fn build_variants(utterance: &str, config: &MatchConfig) -> Vec<QueryVariant> {
    let canonical = normalize(utterance);
    let tokens = tokenize(&canonical);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut variants: Vec<QueryVariant> = Vec::new();
    let mut push = |text: String, threshold: u8| {
        match variants.iter_mut().find(|v| v.text == text) {
            Some(existing) => existing.threshold = existing.threshold.min(threshold),
            None => variants.push(QueryVariant { text, threshold }),
        }
    };

    push(tokens.join(" "), config.threshold);

    let reversed: Vec<&str> = tokens.iter().rev().copied().collect();
    push(reversed.join(" "), config.threshold);

    let token_threshold = config.single_token_threshold();
    for token in &tokens {
        if token.chars().count() >= config.min_token_chars {
            push(token.to_string(), token_threshold);
        }
    }

    variants
}

/// 発話に対する候補を順位付けする
///
/// `threshold` は `config.threshold` を上書きする。
pub fn rank(
    utterance: &str,
    roster: &Roster,
    name_field: &NameFieldSpec,
    threshold: u8,
    config: &MatchConfig,
) -> Vec<MatchCandidate> {
    let config = config.clone().with_threshold(threshold);
    let names: Vec<String> = roster
        .records
        .iter()
        .map(|record| name_field.full_name(record))
        .collect();
    rank_names(utterance, &names, &config)
}

/// 氏名リストに対して順位付けする（添字がレコード番号）
pub fn rank_names<S: AsRef<str>>(
    utterance: &str,
    names: &[S],
    config: &MatchConfig,
) -> Vec<MatchCandidate> {
    let variants = build_variants(utterance, config);
    if variants.is_empty() {
        return Vec::new();
    }

    let normalized_names: Vec<String> = names.iter().map(|n| normalize(n.as_ref())).collect();
    let mut best: HashMap<usize, u8> = HashMap::new();

    for variant in &variants {
        for (index, candidate) in normalized_names.iter().enumerate() {
            let score = score_normalized(&variant.text, candidate, config).total;
            if score < variant.threshold {
                continue;
            }
            tracing::debug!(variant = %variant.text, index, score, "候補");
            best.entry(index)
                .and_modify(|s| *s = (*s).max(score))
                .or_insert(score);
        }
    }

    let mut ranked: Vec<MatchCandidate> = best
        .into_iter()
        .map(|(record_index, score)| MatchCandidate {
            record_index,
            display_name: names[record_index].as_ref().trim().to_string(),
            score,
        })
        .collect();

    // 同点は名簿順
    ranked.sort_by(|a, b| b.score.cmp(&a.score).then(a.record_index.cmp(&b.record_index)));
    ranked
}

/// 候補のスコアを決めた変種とその内訳（閾値を超える変種がなければ None）
///
/// `rank` が返すスコアと一致する。同点なら先に作られた変種を返す。
pub fn explain(
    utterance: &str,
    candidate_name: &str,
    config: &MatchConfig,
) -> Option<(QueryVariant, ScoreBreakdown)> {
    let candidate = normalize(candidate_name);
    let mut best: Option<(QueryVariant, ScoreBreakdown)> = None;

    for variant in build_variants(utterance, config) {
        let breakdown = score_normalized(&variant.text, &candidate, config);
        if breakdown.total < variant.threshold {
            continue;
        }
        if best.as_ref().map_or(true, |(_, b)| breakdown.total > b.total) {
            best = Some((variant, breakdown));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<&'static str> {
        vec!["Jean Dupont", "Marie Martin"]
    }

    #[test]
    fn test_build_variants() {
        let config = MatchConfig::default();
        let variants = build_variants("Jean Dupont", &config);
        let texts: Vec<&str> = variants.iter().map(|v| v.text.as_str()).collect();
        assert_eq!(texts, vec!["jean dupont", "dupont jean", "jean", "dupont"]);
        assert_eq!(variants[0].threshold, 70);
        assert_eq!(variants[2].threshold, 50);
    }

    #[test]
    fn test_build_variants_skips_short_tokens() {
        let config = MatchConfig::default();
        let variants = build_variants("Li Wu", &config);
        let texts: Vec<&str> = variants.iter().map(|v| v.text.as_str()).collect();
        assert_eq!(texts, vec!["li wu", "wu li"]);
    }

    #[test]
    fn test_build_variants_single_token_merges() {
        let config = MatchConfig::default();
        let variants = build_variants("Dupont", &config);
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].threshold, 50);
    }

    #[test]
    fn test_build_variants_empty() {
        assert!(build_variants("   ", &MatchConfig::default()).is_empty());
    }

    #[test]
    fn test_rank_exact_match() {
        let ranked = rank_names("Jean Dupont", &names(), &MatchConfig::default());
        assert_eq!(ranked[0].record_index, 0);
        assert_eq!(ranked[0].score, 100);
        assert_eq!(ranked[0].display_name, "Jean Dupont");
    }

    #[test]
    fn test_rank_deduplicates() {
        let ranked = rank_names("Jean Dupont", &names(), &MatchConfig::default());
        let zero_count = ranked.iter().filter(|c| c.record_index == 0).count();
        assert_eq!(zero_count, 1);
    }

    #[test]
    fn test_rank_sorted_and_ties_in_roster_order() {
        let roster = vec!["Jean Dupont", "Jean Dupont", "Jean Durand"];
        let ranked = rank_names("Jean Dupont", &roster, &MatchConfig::default());
        assert_eq!(ranked[0].record_index, 0);
        assert_eq!(ranked[1].record_index, 1);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_rank_no_match() {
        let ranked = rank_names("xyz qqq", &names(), &MatchConfig::default());
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_rank_empty_utterance() {
        assert!(rank_names("", &names(), &MatchConfig::default()).is_empty());
    }

    #[test]
    fn test_explain_matches_ranked_score() {
        let config = MatchConfig::default();
        let ranked = rank_names("Dupont Jxx", &["Jean Dupont"], &config);
        let (variant, breakdown) = explain("Dupont Jxx", "Jean Dupont", &config).unwrap();

        assert_eq!(breakdown.total, ranked[0].score);
        assert_eq!(variant.text, "dupont");
        assert!(explain("xyz qqq", "Jean Dupont", &config).is_none());
    }

    #[test]
    fn test_rank_deterministic() {
        let roster = vec!["Jean Dupont", "Jeanne Dupond", "Jean Dupuis", "Marie Martin"];
        let config = MatchConfig::default();
        let first = rank_names("jean dupon", &roster, &config);
        for _ in 0..10 {
            assert_eq!(rank_names("jean dupon", &roster, &config), first);
        }
    }
}
