//! 発話と候補氏名の類似度スコア（0〜100）
//!
//! ## 計算
//! 1. 両方を正規化・トークン化
//! 2. 4指標の最大値を基礎点とする
//!    - ratio: 全体の一致率（挿入・削除ベース）
//!    - partial_ratio: 短い方を長い方の部分文字列と比べた最大値
//!    - token_sort_ratio: トークンを並べ替えてから ratio
//!    - token_set_ratio: 共通トークンと差分で組み立てた文字列の ratio
//! 3. 網羅ボーナス: 発話の全トークンが候補のいずれかと部分一致する
//! 4. 先頭一致ボーナス: 先頭数文字が一致するトークン組ごとに加点（上限あり）
//! 5. 合計を100で打ち切る

use crate::config::MatchConfig;
use crate::normalize::{normalize, tokenize};
use std::collections::BTreeSet;

/// スコアの内訳
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub ratio: u8,
    pub partial: u8,
    pub token_sort: u8,
    pub token_set: u8,
    pub coverage_bonus: u8,
    pub prefix_bonus: u8,
    pub total: u8,
}

impl ScoreBreakdown {
    /// 4指標の最大値
    pub fn base(&self) -> u8 {
        self.ratio.max(self.partial).max(self.token_sort).max(self.token_set)
    }
}

/// 既定の設定でスコアを計算する
pub fn score(utterance: &str, candidate_name: &str) -> u8 {
    score_with(utterance, candidate_name, &MatchConfig::default())
}

/// 設定を指定してスコアを計算する
pub fn score_with(utterance: &str, candidate_name: &str, config: &MatchConfig) -> u8 {
    score_detailed(utterance, candidate_name, config).total
}

/// 内訳付きでスコアを計算する
pub fn score_detailed(utterance: &str, candidate_name: &str, config: &MatchConfig) -> ScoreBreakdown {
    let query = normalize(utterance);
    let candidate = normalize(candidate_name);
    score_normalized(&query, &candidate, config)
}

/// 正規化済みの文字列同士でスコアを計算する
pub(crate) fn score_normalized(query: &str, candidate: &str, config: &MatchConfig) -> ScoreBreakdown {
    if query.is_empty() || candidate.is_empty() {
        return ScoreBreakdown::default();
    }

    let mut breakdown = ScoreBreakdown {
        ratio: ratio(query, candidate),
        partial: partial_ratio(query, candidate),
        token_sort: token_sort_ratio(query, candidate),
        token_set: token_set_ratio(query, candidate),
        ..Default::default()
    };

    let query_tokens = tokenize(query);
    let candidate_tokens = tokenize(candidate);

    if covers_all_tokens(&query_tokens, &candidate_tokens, config.token_partial_min) {
        breakdown.coverage_bonus = config.coverage_bonus;
    }

    let prefix_pairs = query_tokens
        .iter()
        .flat_map(|q| candidate_tokens.iter().map(move |c| (*q, *c)))
        .filter(|(q, c)| shares_prefix(q, c, config.prefix_len))
        .count();
    let prefix_total = (prefix_pairs as u32).saturating_mul(config.prefix_bonus as u32);
    breakdown.prefix_bonus = prefix_total.min(config.prefix_bonus_cap as u32) as u8;

    let total = breakdown.base() as u32
        + breakdown.coverage_bonus as u32
        + breakdown.prefix_bonus as u32;
    breakdown.total = total.min(100) as u8;

    breakdown
}

/// 発話の全トークンに、部分一致スコアが `min` を超える候補トークンがあるか
fn covers_all_tokens(query_tokens: &[&str], candidate_tokens: &[&str], min: u8) -> bool {
    !query_tokens.is_empty()
        && query_tokens
            .iter()
            .all(|q| candidate_tokens.iter().any(|c| partial_ratio(q, c) > min))
}

/// どちらかの先頭 `len` 文字がもう一方の先頭と一致するか
///
/// `len` 文字に満たないトークンは先頭として使わない。
fn shares_prefix(a: &str, b: &str, len: usize) -> bool {
    let is_prefix_of = |short: &str, long: &str| -> bool {
        if short.chars().count() < len {
            return false;
        }
        let head: String = short.chars().take(len).collect();
        long.starts_with(&head)
    };
    is_prefix_of(a, b) || is_prefix_of(b, a)
}

/// 全体の一致率: 2 × LCS / (len_a + len_b) を0〜100に丸める
pub fn ratio(a: &str, b: &str) -> u8 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    ratio_chars(&a_chars, &b_chars)
}

fn ratio_chars(a: &[char], b: &[char]) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let common = lcs_length(a, b);
    to_percent(2.0 * common as f64 / (a.len() + b.len()) as f64)
}

/// 最長共通部分列の長さ（2行DP）
fn lcs_length(a: &[char], b: &[char]) -> usize {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let mut prev = vec![0usize; short.len() + 1];
    let mut curr = vec![0usize; short.len() + 1];

    for lc in long {
        for (i, sc) in short.iter().enumerate() {
            curr[i + 1] = if sc == lc {
                prev[i] + 1
            } else {
                prev[i + 1].max(curr[i])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[short.len()]
}

/// 短い方を長い方の同じ長さの区間すべてと比べた最大値
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (short, long) = if a_chars.len() <= b_chars.len() {
        (a_chars, b_chars)
    } else {
        (b_chars, a_chars)
    };

    if short.is_empty() {
        return 0;
    }
    if short.len() == long.len() {
        return ratio_chars(&short, &long);
    }

    let mut best = 0;
    for window in long.windows(short.len()) {
        best = best.max(ratio_chars(&short, window));
        if best == 100 {
            break;
        }
    }
    best
}

/// トークンを並べ替えてから比較する（語順の違いを吸収）
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn sorted_tokens(text: &str) -> String {
    let mut tokens = tokenize(text);
    tokens.sort_unstable();
    tokens.join(" ")
}

/// 共通トークン集合と差分で比較する（重複・余分な語を吸収）
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    let a_set: BTreeSet<&str> = tokenize(a).into_iter().collect();
    let b_set: BTreeSet<&str> = tokenize(b).into_iter().collect();

    let common = join(a_set.intersection(&b_set));
    let only_a = join(a_set.difference(&b_set));
    let only_b = join(b_set.difference(&a_set));

    let combined_a = format!("{} {}", common, only_a).trim().to_string();
    let combined_b = format!("{} {}", common, only_b).trim().to_string();

    ratio(&common, &combined_a)
        .max(ratio(&common, &combined_b))
        .max(ratio(&combined_a, &combined_b))
}

fn join<'a>(tokens: impl Iterator<Item = &'a &'a str>) -> String {
    tokens.copied().collect::<Vec<_>>().join(" ")
}

fn to_percent(value: f64) -> u8 {
    (value * 100.0).round().clamp(0.0, 100.0) as u8
}
