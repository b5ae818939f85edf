//! 照合パラメータ

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// 照合・自動確定の設定
///
/// ボーナス値は経験的に決めたもの。調整できるよう設定に出している。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// 候補として残す最低スコア
    pub threshold: u8,
    /// 最上位候補を自動で出席にするスコア
    pub auto_threshold: u8,
    /// 発話の全トークンが候補に含まれるときの加点
    pub coverage_bonus: u8,
    /// トークン同士を「含まれる」とみなす部分一致スコア（これを超えること）
    pub token_partial_min: u8,
    /// 先頭一致に使う文字数
    pub prefix_len: usize,
    /// 先頭一致1組あたりの加点
    pub prefix_bonus: u8,
    /// 先頭一致加点の上限
    pub prefix_bonus_cap: u8,
    /// 単語単位の変種で閾値から下げる幅
    pub single_token_drop: u8,
    /// 単語単位の変種の閾値の下限
    pub single_token_floor: u8,
    /// 単語単位の変種にする最小文字数
    pub min_token_chars: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 70,
            auto_threshold: 95,
            coverage_bonus: 15,
            token_partial_min: 80,
            prefix_len: 3,
            prefix_bonus: 10,
            prefix_bonus_cap: 20,
            single_token_drop: 20,
            single_token_floor: 50,
            min_token_chars: 3,
        }
    }
}

impl MatchConfig {
    /// 閾値を差し替えた設定を返す
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_auto_threshold(mut self, auto_threshold: u8) -> Self {
        self.auto_threshold = auto_threshold;
        self
    }

    /// 単語単位の変種に使う閾値: max(threshold - drop, floor)
    pub fn single_token_threshold(&self) -> u8 {
        self.threshold
            .saturating_sub(self.single_token_drop)
            .max(self.single_token_floor)
    }

    pub fn validate(&self) -> Result<()> {
        if self.threshold > 100 || self.auto_threshold > 100 {
            return Err(Error::Config(format!(
                "閾値は0〜100で指定してください（threshold: {}, auto_threshold: {}）",
                self.threshold, self.auto_threshold
            )));
        }
        if self.auto_threshold < self.threshold {
            return Err(Error::Config(format!(
                "自動確定の閾値({})は照合の閾値({})以上にしてください",
                self.auto_threshold, self.threshold
            )));
        }
        if self.prefix_len == 0 {
            return Err(Error::Config("prefix_len は1以上にしてください".into()));
        }
        Ok(())
    }
}
