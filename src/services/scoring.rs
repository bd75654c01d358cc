use std::cmp::Ordering;

use crate::models::fundamentals::TickerFundamentals;
use crate::models::score::{
    ManualScores, MissingMetric, ScoreBreakdown, ScoreWeights, ScoredTicker, ScoringProfile,
};

/// 完全没有可用指标时的中性分
pub const NEUTRAL_SCORE: f64 = 50.0;

pub struct ScoreEngine;

impl ScoreEngine {
    /// 计算单只股票的合成分数（0-100，越高越好）
    /// 缺值按 profile.missing 处理：Skip 降权重新归一，Neutral 以 50 代入
    pub fn compute(
        info: Option<&TickerFundamentals>,
        manual: &ManualScores,
        weights: &ScoreWeights,
        profile: &ScoringProfile,
    ) -> ScoreBreakdown {
        let mut detail = Self::sub_scores(info, manual, profile);

        let parts = [
            (detail.user_score, weights.user),
            (detail.policy_score, weights.policy),
            (detail.moat_score, weights.moat),
            (detail.pe_score, weights.pe),
            (detail.roe_score, weights.roe),
            (detail.growth_score, weights.revenue_growth),
            (detail.market_cap_score, weights.market_cap),
            (detail.peg_score, weights.peg),
        ];

        let mut total = 0.0;
        let mut weight_sum = 0.0;
        for (score, w) in parts {
            if !w.is_finite() || w <= 0.0 {
                continue;
            }
            let s = match (score, profile.missing) {
                (Some(s), _) => s,
                (None, MissingMetric::Neutral) => NEUTRAL_SCORE,
                (None, MissingMetric::Skip) => continue,
            };
            total += s * w;
            weight_sum += w;
        }

        if weight_sum <= 0.0 {
            detail.combined = NEUTRAL_SCORE;
            return detail;
        }

        let mut combined = total / weight_sum;

        // 自由现金流为负：整体打折
        if info.map(|f| f.has_negative_fcf()).unwrap_or(false) {
            combined *= profile.fcf_penalty.clamp(0.0, 1.0);
            detail.fcf_penalised = true;
        }

        detail.combined = round2(combined.clamp(0.0, 100.0));
        detail
    }

    /// 按合成分数降序；同分按代号升序，保证输出稳定
    pub fn rank(rows: &mut [ScoredTicker]) {
        rows.sort_by(|a, b| {
            b.breakdown
                .combined
                .partial_cmp(&a.breakdown.combined)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
    }

    fn sub_scores(
        info: Option<&TickerFundamentals>,
        manual: &ManualScores,
        p: &ScoringProfile,
    ) -> ScoreBreakdown {
        let user_score = manual
            .user
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 10.0) * 10.0);
        let policy_score = manual.policy.map(|v| (v as f64).min(100.0));
        let moat_score = manual.moat.map(|v| (v as f64).min(100.0));

        let mut detail = ScoreBreakdown {
            user_score,
            policy_score,
            moat_score,
            ..Default::default()
        };

        let Some(info) = info else {
            return detail;
        };

        // PE 超出区间的按边界计分
        detail.pe_score = info
            .pe()
            .and_then(|pe| lower_is_better(pe, p.pe_min, p.pe_max));

        // 0 是有效数据，不当作缺值（旧版以真值判断，会把 ROE/增长为 0 的股票降权）
        detail.roe_score = finite(info.return_on_equity).and_then(|roe| match p.roe_target {
            Some(target) => higher_is_better(roe, target),
            None => range_score(roe, p.roe_min, p.roe_max),
        });

        detail.growth_score = finite(info.revenue_growth).and_then(|g| match p.growth_target {
            Some(target) => higher_is_better(g, target),
            None => range_score(g, p.growth_min, p.growth_max),
        });

        detail.market_cap_score = finite(info.market_cap)
            .filter(|mc| *mc > 0.0)
            .and_then(|mc| log_range_score(mc, p.log_cap_min, p.log_cap_max));

        // PEG <= 0（盈利下滑）无意义，视为缺值
        detail.peg_score = finite(info.peg_ratio)
            .filter(|peg| *peg > 0.0)
            .and_then(|peg| lower_is_better(peg, p.peg_min, p.peg_max));

        detail
    }
}

/// 越低越好：lo 得 100，hi 得 0
pub fn lower_is_better(value: f64, lo: f64, hi: f64) -> Option<f64> {
    if !value.is_finite() || !valid_range(lo, hi) {
        return None;
    }
    Some(((hi - value) / (hi - lo) * 100.0).clamp(0.0, 100.0))
}

/// 越高越好：达到 target 即满分
pub fn higher_is_better(value: f64, target: f64) -> Option<f64> {
    if !value.is_finite() || target <= 0.0 {
        return None;
    }
    Some((value / target * 100.0).clamp(0.0, 100.0))
}

/// min-max 线性映射：lo 得 0，hi 得 100
pub fn range_score(value: f64, lo: f64, hi: f64) -> Option<f64> {
    if !value.is_finite() || !valid_range(lo, hi) {
        return None;
    }
    let v = value.clamp(lo, hi);
    Some((v - lo) / (hi - lo) * 100.0)
}

/// 对数尺度映射，lo/hi 为 log10 边界
pub fn log_range_score(value: f64, lo: f64, hi: f64) -> Option<f64> {
    if value <= 0.0 {
        return None;
    }
    range_score(value.log10(), lo, hi)
}

fn valid_range(lo: f64, hi: f64) -> bool {
    lo.is_finite() && hi.is_finite() && hi > lo
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_with(pe: Option<f64>, roe: Option<f64>, growth: Option<f64>, cap: Option<f64>) -> TickerFundamentals {
        TickerFundamentals {
            symbol: "TEST".to_string(),
            short_name: Some("Test Corp".to_string()),
            forward_pe: pe,
            return_on_equity: roe,
            revenue_growth: growth,
            market_cap: cap,
            ..Default::default()
        }
    }

    #[test]
    fn test_pe_score_monotonic_and_bounded() {
        let (lo, hi) = (5.0, 200.0);
        let mut prev = f64::INFINITY;
        let mut p = lo;
        while p <= hi {
            let s = lower_is_better(p, lo, hi).unwrap();
            assert!((0.0..=100.0).contains(&s), "pe={} score={}", p, s);
            assert!(s <= prev, "score 应随 PE 单调不增: pe={}", p);
            prev = s;
            p += 0.5;
        }
        assert_eq!(lower_is_better(lo, lo, hi), Some(100.0));
        assert_eq!(lower_is_better(hi, lo, hi), Some(0.0));
    }

    #[test]
    fn test_outside_bounds_is_clamped() {
        assert_eq!(lower_is_better(1.0, 5.0, 50.0), Some(100.0));
        assert_eq!(lower_is_better(500.0, 5.0, 50.0), Some(0.0));
        assert_eq!(higher_is_better(0.5, 0.2), Some(100.0));
        assert_eq!(higher_is_better(-0.1, 0.2), Some(0.0));
        assert_eq!(range_score(9.0, 0.0, 1.0), Some(100.0));
    }

    #[test]
    fn test_degenerate_ranges() {
        assert_eq!(lower_is_better(10.0, 5.0, 5.0), None);
        assert_eq!(higher_is_better(0.1, 0.0), None);
        assert_eq!(range_score(f64::NAN, 0.0, 1.0), None);
        assert_eq!(log_range_score(0.0, 7.0, 12.0), None);
    }

    #[test]
    fn test_no_metrics_returns_neutral() {
        let b = ScoreEngine::compute(None, &ManualScores::default(), &ScoreWeights::default(), &ScoringProfile::default());
        assert_eq!(b.combined, NEUTRAL_SCORE);

        let empty = TickerFundamentals::new("EMPTY");
        let b = ScoreEngine::compute(Some(&empty), &ManualScores::default(), &ScoreWeights::default(), &ScoringProfile::default());
        assert_eq!(b.combined, NEUTRAL_SCORE);
    }

    #[test]
    fn test_all_zero_weights_returns_neutral() {
        let w = ScoreWeights { user: 0.0, policy: 0.0, moat: 0.0, pe: 0.0, roe: 0.0, revenue_growth: 0.0, market_cap: 0.0, peg: 0.0 };
        let info = info_with(Some(10.0), Some(0.3), Some(0.1), Some(1e11));
        let b = ScoreEngine::compute(Some(&info), &ManualScores::default(), &w, &ScoringProfile::default());
        assert_eq!(b.combined, NEUTRAL_SCORE);
    }

    #[test]
    fn test_missing_weights_are_renormalised() {
        // 只有 PE：合成分数 = PE 分数本身
        let info = info_with(Some(5.0), None, None, None);
        let b = ScoreEngine::compute(Some(&info), &ManualScores::default(), &ScoreWeights::default(), &ScoringProfile::default());
        assert_eq!(b.pe_score, Some(100.0));
        assert_eq!(b.combined, 100.0);
    }

    #[test]
    fn test_neutral_mode_substitutes_fifty() {
        let info = info_with(Some(5.0), None, None, None);
        let profile = ScoringProfile { missing: MissingMetric::Neutral, ..Default::default() };
        let b = ScoreEngine::compute(Some(&info), &ManualScores::default(), &ScoreWeights::default(), &profile);
        // PE 0.20 * 100 + 其余 0.80 * 50 = 60
        assert_eq!(b.combined, 60.0);
    }

    #[test]
    fn test_weighted_combination() {
        let info = info_with(Some(24.5), Some(0.05), Some(0.5), Some(1e12));
        let manual = ManualScores { user: Some(7.5), ..Default::default() };
        let b = ScoreEngine::compute(Some(&info), &manual, &ScoreWeights::default(), &ScoringProfile::default());

        let pe = (200.0 - 24.5) / 195.0 * 100.0;  // 90.0
        let roe = (0.05 + 0.5) / 1.1 * 100.0;      // 50.0
        let growth = (0.5 + 1.0) / 3.0 * 100.0;    // 50.0
        let cap = 100.0;
        let expected = (75.0 * 0.30 + pe * 0.20 + roe * 0.25 + growth * 0.15 + cap * 0.10) / 1.0;
        assert!((b.combined - round2(expected)).abs() < 1e-9, "got {}", b.combined);
    }

    #[test]
    fn test_user_score_clamped() {
        let manual = ManualScores { user: Some(42.0), ..Default::default() };
        let b = ScoreEngine::compute(None, &manual, &ScoreWeights::default(), &ScoringProfile::default());
        assert_eq!(b.user_score, Some(100.0));
        assert_eq!(b.combined, 100.0);
    }

    #[test]
    fn test_zero_roe_counts_as_data() {
        let info = info_with(None, Some(0.0), None, None);
        let b = ScoreEngine::compute(Some(&info), &ManualScores::default(), &ScoreWeights::default(), &ScoringProfile::default());
        assert!(b.roe_score.is_some());
    }

    #[test]
    fn test_negative_fcf_penalty() {
        let mut info = info_with(Some(5.0), None, None, None);
        info.free_cash_flow = Some(-1.0e9);
        let b = ScoreEngine::compute(Some(&info), &ManualScores::default(), &ScoreWeights::default(), &ScoringProfile::default());
        assert!(b.fcf_penalised);
        assert_eq!(b.combined, 80.0);
    }

    #[test]
    fn test_policy_and_moat_weights() {
        let w = ScoreWeights { user: 0.0, policy: 0.5, moat: 0.5, pe: 0.0, roe: 0.0, revenue_growth: 0.0, market_cap: 0.0, peg: 0.0 };
        let manual = ManualScores { user: None, policy: Some(80), moat: Some(40) };
        let b = ScoreEngine::compute(None, &manual, &w, &ScoringProfile::default());
        assert_eq!(b.combined, 60.0);
    }

    #[test]
    fn test_target_mode_for_roe() {
        let info = info_with(None, Some(0.10), None, None);
        let profile = ScoringProfile { roe_target: Some(0.20), ..Default::default() };
        let b = ScoreEngine::compute(Some(&info), &ManualScores::default(), &ScoreWeights::default(), &profile);
        assert_eq!(b.roe_score, Some(50.0));
    }

    #[test]
    fn test_target_mode_for_growth() {
        let info = info_with(None, None, Some(0.30), None);
        let profile = ScoringProfile { growth_target: Some(0.20), ..Default::default() };
        let b = ScoreEngine::compute(Some(&info), &ManualScores::default(), &ScoreWeights::default(), &profile);
        assert_eq!(b.growth_score, Some(100.0));
    }

    #[test]
    fn test_peg_scored_only_when_weighted() {
        let mut info = info_with(None, None, None, None);
        info.peg_ratio = Some(1.75);
        let b = ScoreEngine::compute(Some(&info), &ManualScores::default(), &ScoreWeights::default(), &ScoringProfile::default());
        // 默认 PEG 权重为 0：子分数有值但不计入
        assert_eq!(b.peg_score, Some(50.0));
        assert_eq!(b.combined, NEUTRAL_SCORE);

        let w = ScoreWeights { peg: 0.5, ..Default::default() };
        let b = ScoreEngine::compute(Some(&info), &ManualScores::default(), &w, &ScoringProfile::default());
        assert_eq!(b.combined, 50.0);

        info.peg_ratio = Some(0.5);
        let b = ScoreEngine::compute(Some(&info), &ManualScores::default(), &w, &ScoringProfile::default());
        assert_eq!(b.combined, 100.0);

        info.peg_ratio = Some(-2.0);
        let b = ScoreEngine::compute(Some(&info), &ManualScores::default(), &w, &ScoringProfile::default());
        assert_eq!(b.peg_score, None);
    }

    #[test]
    fn test_rank_desc_then_symbol() {
        let row = |sym: &str, combined: f64| ScoredTicker {
            symbol: sym.to_string(),
            fundamentals: None,
            manual: ManualScores::default(),
            breakdown: ScoreBreakdown { combined, ..Default::default() },
            summary: String::new(),
        };
        let mut rows = vec![row("B", 50.0), row("C", 90.0), row("A", 50.0)];
        ScoreEngine::rank(&mut rows);
        let order: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(order, vec!["C", "A", "B"]);
    }
}
