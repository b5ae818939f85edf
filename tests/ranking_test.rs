//! 照合スコアと順位付けのテスト

use ekho_common::ranker::build_variants;
use ekho_common::{normalize, rank_names, score, score_detailed, score_with, MatchConfig};

const ROSTER: &[&str] = &[
    "Jean Dupont",
    "Marie Martin",
    "Hélène Lefèvre",
    "Jean-Pierre Durand",
    "Anne-Sophie Moreau",
];

/// スコアは常に0〜100
#[test]
fn test_score_bounds() {
    let utterances = ["Jean", "jean dupont dupont jean", "x", "hélène", "Moreau Anne Sophie", "!!!"];
    for utterance in utterances {
        for name in ROSTER {
            let s = score(utterance, name);
            assert!(s <= 100, "{} / {} = {}", utterance, name, s);
        }
    }
}

/// 同じ文字列は100
#[test]
fn test_score_identity() {
    for name in ROSTER {
        assert_eq!(score(name, name), 100, "{}", name);
    }
}

/// 空の候補は0
#[test]
fn test_score_empty_candidate() {
    assert_eq!(score("Jean Dupont", ""), 0);
    assert_eq!(score("", "Jean Dupont"), 0);
    assert_eq!(score("Jean", "   "), 0);
}

/// 加点しても100を超えない
#[test]
fn test_bonuses_are_capped() {
    let breakdown = score_detailed("Jean Dupont", "Jean Dupont", &MatchConfig::default());
    assert_eq!(breakdown.base(), 100);
    assert!(breakdown.coverage_bonus > 0);
    assert_eq!(breakdown.total, 100);
}

/// 先頭一致の加点は上限まで
#[test]
fn test_prefix_bonus_cap() {
    let breakdown = score_detailed("dupont dupont dupont", "dupont", &MatchConfig::default());
    assert_eq!(breakdown.prefix_bonus, 20);
}

/// 加点の値は設定で変えられる
#[test]
fn test_bonus_configurable() {
    let no_bonus = MatchConfig {
        coverage_bonus: 0,
        prefix_bonus: 0,
        ..MatchConfig::default()
    };
    let breakdown = score_detailed("jean dupon", "Jean Dupont", &no_bonus);
    assert_eq!(breakdown.coverage_bonus, 0);
    assert_eq!(breakdown.prefix_bonus, 0);
    assert_eq!(breakdown.total, breakdown.base());

    let with_bonus = score_with("jean dupon", "Jean Dupont", &MatchConfig::default());
    assert!(with_bonus >= breakdown.total);
}

/// アクセント・大文字・記号は無視
#[test]
fn test_accent_and_case_folding() {
    assert_eq!(normalize("  Hélène LEFÈVRE! "), "helene lefevre");
    assert_eq!(score("helene lefevre", "Hélène Lefèvre"), 100);
}

/// 複合名の一部だけでも候補になる
#[test]
fn test_single_token_variant_finds_record() {
    let ranked = rank_names("Durand", ROSTER, &MatchConfig::default());
    assert_eq!(ranked[0].record_index, 3);
}

/// スコア降順・同点は名簿順
#[test]
fn test_rank_order() {
    let roster = ["Jean Dupont", "Jean Dupond", "Jean Dupont"];
    let ranked = rank_names("Jean Dupont", &roster, &MatchConfig::default());

    assert!(ranked.windows(2).all(|w| {
        w[0].score > w[1].score || (w[0].score == w[1].score && w[0].record_index < w[1].record_index)
    }));
    assert_eq!(ranked[0].record_index, 0);
}

/// 閾値未満は返さない
#[test]
fn test_rank_respects_threshold() {
    let config = MatchConfig::default();
    let ranked = rank_names("jean", ROSTER, &config);
    assert!(ranked.iter().all(|c| c.score >= config.single_token_threshold()));
    assert!(ranked.iter().any(|c| c.record_index == 0));
}

/// 変種ごとにスコアが違うとき、残るのは最大値
#[test]
fn test_dedup_keeps_best_variant_score() {
    let config = MatchConfig::default();
    let utterance = "Dupont Jxx";
    let name = "Jean Dupont";

    let variant_scores: Vec<u8> = build_variants(utterance, &config)
        .iter()
        .map(|v| score_with(&v.text, name, &config))
        .collect();
    let best = *variant_scores.iter().max().unwrap();
    let first = variant_scores[0];
    assert!(first < best, "変種のスコアが同じ: {:?}", variant_scores);

    let ranked = rank_names(utterance, &[name], &config);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].score, best);
}
