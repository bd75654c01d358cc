use serde::{Deserialize, Serialize};

use super::fundamentals::TickerFundamentals;

/// 合成分数各指标权重（缺值时按实际出现的权重重新归一）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    #[serde(default = "default_user_w")]
    pub user: f64,           // 人工评分 0-10
    #[serde(default)]
    pub policy: f64,         // 政策面 0-100
    #[serde(default)]
    pub moat: f64,           // 护城河 0-100
    #[serde(default = "default_pe_w")]
    pub pe: f64,             // PE 越低越好
    #[serde(default = "default_roe_w")]
    pub roe: f64,
    #[serde(default = "default_growth_w")]
    pub revenue_growth: f64,
    #[serde(default = "default_cap_w")]
    pub market_cap: f64,     // 对数市值
    #[serde(default)]
    pub peg: f64,            // PEG 越低越好，默认不计入
}

fn default_user_w() -> f64 { 0.30 }
fn default_pe_w() -> f64 { 0.20 }
fn default_roe_w() -> f64 { 0.25 }
fn default_growth_w() -> f64 { 0.15 }
fn default_cap_w() -> f64 { 0.10 }

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            user: 0.30,
            policy: 0.0,
            moat: 0.0,
            pe: 0.20,
            roe: 0.25,
            revenue_growth: 0.15,
            market_cap: 0.10,
            peg: 0.0,
        }
    }
}

impl ScoreWeights {
    /// 负权重、NaN 一律视为非法
    pub fn validate(&self) -> Result<(), String> {
        let all = [
            ("user", self.user),
            ("policy", self.policy),
            ("moat", self.moat),
            ("pe", self.pe),
            ("roe", self.roe),
            ("revenue_growth", self.revenue_growth),
            ("market_cap", self.market_cap),
            ("peg", self.peg),
        ];
        for (name, w) in all {
            if !w.is_finite() || w < 0.0 {
                return Err(format!("权重 {} 非法: {}", name, w));
            }
        }
        Ok(())
    }
}

/// 缺失指标的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MissingMetric {
    /// 去掉该项权重，其余重新归一
    #[default]
    #[serde(rename = "skip")]
    Skip,
    /// 以中性分 50 代入
    #[serde(rename = "neutral")]
    Neutral,
}

/// 各指标线性映射的上下界
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringProfile {
    #[serde(default = "default_pe_min")]
    pub pe_min: f64,
    #[serde(default = "default_pe_max")]
    pub pe_max: f64,
    #[serde(default = "default_roe_min")]
    pub roe_min: f64,
    #[serde(default = "default_roe_max")]
    pub roe_max: f64,
    #[serde(default = "default_growth_min")]
    pub growth_min: f64,
    #[serde(default = "default_growth_max")]
    pub growth_max: f64,
    #[serde(default = "default_log_cap_min")]
    pub log_cap_min: f64,    // log10(市值)
    #[serde(default = "default_log_cap_max")]
    pub log_cap_max: f64,
    #[serde(default = "default_peg_min")]
    pub peg_min: f64,
    #[serde(default = "default_peg_max")]
    pub peg_max: f64,
    /// 设置后 ROE 改用「达标比例」计分：roe / target * 100
    #[serde(default)]
    pub roe_target: Option<f64>,
    #[serde(default)]
    pub growth_target: Option<f64>,
    #[serde(default)]
    pub missing: MissingMetric,
    #[serde(default = "default_fcf_penalty")]
    pub fcf_penalty: f64,    // 自由现金流为负时的乘数
}

fn default_pe_min() -> f64 { 5.0 }
fn default_pe_max() -> f64 { 200.0 }
fn default_roe_min() -> f64 { -0.5 }
fn default_roe_max() -> f64 { 0.6 }
fn default_growth_min() -> f64 { -1.0 }
fn default_growth_max() -> f64 { 2.0 }
fn default_log_cap_min() -> f64 { 7.0 }
fn default_log_cap_max() -> f64 { 12.0 }
fn default_peg_min() -> f64 { 0.5 }
fn default_peg_max() -> f64 { 3.0 }
fn default_fcf_penalty() -> f64 { 0.8 }

impl Default for ScoringProfile {
    fn default() -> Self {
        Self {
            pe_min: 5.0,
            pe_max: 200.0,
            roe_min: -0.5,
            roe_max: 0.6,
            growth_min: -1.0,
            growth_max: 2.0,
            log_cap_min: 7.0,
            log_cap_max: 12.0,
            peg_min: 0.5,
            peg_max: 3.0,
            roe_target: None,
            growth_target: None,
            missing: MissingMetric::Skip,
            fcf_penalty: 0.8,
        }
    }
}

/// 单只股票的人工输入
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualScores {
    pub user: Option<f64>,   // 0-10
    pub policy: Option<u8>,  // 0-100
    pub moat: Option<u8>,    // 0-100
}

/// 各分项得分（0-100，None = 无数据）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub user_score: Option<f64>,
    pub policy_score: Option<f64>,
    pub moat_score: Option<f64>,
    pub pe_score: Option<f64>,
    pub roe_score: Option<f64>,
    pub growth_score: Option<f64>,
    pub market_cap_score: Option<f64>,
    #[serde(default)]
    pub peg_score: Option<f64>,
    pub combined: f64,
    #[serde(default)]
    pub fcf_penalised: bool,
}

/// 产业比较表中的一行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredTicker {
    pub symbol: String,
    pub fundamentals: Option<TickerFundamentals>,
    pub manual: ManualScores,
    pub breakdown: ScoreBreakdown,
    #[serde(default)]
    pub summary: String,
}

impl ScoredTicker {
    pub fn name(&self) -> &str {
        self.fundamentals
            .as_ref()
            .map(|f| f.display_name())
            .unwrap_or("N/A")
    }
}

/// 产业分析结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorReport {
    pub sector: String,
    pub rows: Vec<ScoredTicker>,
    pub failed: Vec<String>,
    pub generated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_partial_json_uses_defaults() {
        let w: ScoreWeights = serde_json::from_str(r#"{"moat": 0.4}"#).unwrap();
        assert_eq!(w.moat, 0.4);
        assert_eq!(w.user, 0.30);
        assert_eq!(w.policy, 0.0);
        assert_eq!(w.peg, 0.0);
    }

    #[test]
    fn test_weights_reject_negative() {
        let w = ScoreWeights { pe: -0.1, ..Default::default() };
        assert!(w.validate().is_err());
        assert!(ScoreWeights::default().validate().is_ok());
    }

    #[test]
    fn test_missing_metric_serde_names() {
        let json = serde_json::to_string(&MissingMetric::Neutral).unwrap();
        assert_eq!(json, "\"neutral\"");
        let p: ScoringProfile = serde_json::from_str(r#"{"missing":"neutral"}"#).unwrap();
        assert_eq!(p.missing, MissingMetric::Neutral);
        assert_eq!(p.pe_max, 200.0);
        assert_eq!((p.peg_min, p.peg_max), (0.5, 3.0));
    }
}
