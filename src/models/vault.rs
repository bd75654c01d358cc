use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::score::{ManualScores, ScoreWeights};

/// 本地持久化的「投资金库」：产业分组 + 人工评分 + 权重
/// 兼容旧版只有 sectors / user_scores 两个字段的文件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vault {
    #[serde(default)]
    pub sectors: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub user_scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub policy_scores: BTreeMap<String, u8>,
    #[serde(default)]
    pub moat_scores: BTreeMap<String, u8>,
    #[serde(default)]
    pub weights: ScoreWeights,
    /// 产业专属权重，优先于全局 weights
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sector_weights: BTreeMap<String, ScoreWeights>,
}

impl Vault {
    pub fn manual_scores(&self, symbol: &str) -> ManualScores {
        ManualScores {
            user: self.user_scores.get(symbol).copied(),
            policy: self.policy_scores.get(symbol).copied(),
            moat: self.moat_scores.get(symbol).copied(),
        }
    }

    pub fn tickers(&self, sector: &str) -> Option<&[String]> {
        self.sectors.get(sector).map(|v| v.as_slice())
    }

    pub fn weights_for(&self, sector: &str) -> &ScoreWeights {
        self.sector_weights.get(sector).unwrap_or(&self.weights)
    }

    /// 股票所属的全部产业
    pub fn sectors_of(&self, symbol: &str) -> Vec<&str> {
        self.sectors
            .iter()
            .filter(|(_, list)| list.iter().any(|s| s == symbol))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
