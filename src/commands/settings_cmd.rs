use anyhow::{bail, Result};
use clap::{Subcommand, ValueEnum};

use crate::models::score::MissingMetric;
use crate::models::settings::AppSettings;
use crate::AppState;

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    Show,
    /// 基本面缓存有效期（秒），0 = 不使用缓存
    SetTtl { secs: u64 },
    /// 两次请求之间的间隔（毫秒）
    SetDelay { ms: u64 },
    /// 单次请求超时（秒）
    SetTimeout { secs: u64 },
    SetBaseUrl { url: String },
    /// 默认金库路径
    SetVault { path: String },
    /// 缺值处理：skip 降权 / neutral 以 50 代入
    SetMissing { mode: MissingArg },
    /// PE 映射区间
    SetPeRange {
        #[arg(allow_negative_numbers = true)]
        min: f64,
        #[arg(allow_negative_numbers = true)]
        max: f64,
    },
    /// ROE 映射区间（小数，如 -0.5 0.6）
    SetRoeRange {
        #[arg(allow_negative_numbers = true)]
        min: f64,
        #[arg(allow_negative_numbers = true)]
        max: f64,
    },
    /// 营收增长映射区间（小数）
    SetGrowthRange {
        #[arg(allow_negative_numbers = true)]
        min: f64,
        #[arg(allow_negative_numbers = true)]
        max: f64,
    },
    /// 市值映射区间（log10，如 7 12）
    SetCapRange { min: f64, max: f64 },
    /// PEG 映射区间
    SetPegRange { min: f64, max: f64 },
    /// ROE 达标值，roe / target * 100 计分；省略则改回区间计分
    SetRoeTarget { target: Option<f64> },
    /// 营收增长达标值；省略则改回区间计分
    SetGrowthTarget { target: Option<f64> },
    /// 自由现金流为负时的乘数（0-1）
    SetFcfPenalty { factor: f64 },
    Reset,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// 清空基本面缓存
    Purge,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum MissingArg {
    Skip,
    Neutral,
}

impl From<MissingArg> for MissingMetric {
    fn from(m: MissingArg) -> Self {
        match m {
            MissingArg::Skip => MissingMetric::Skip,
            MissingArg::Neutral => MissingMetric::Neutral,
        }
    }
}

/// 修改设置并持久化，返回修改后的设置
pub fn apply(settings: &AppSettings, action: &SettingsAction) -> Result<AppSettings> {
    let mut s = settings.clone();
    match action {
        SettingsAction::Show => {}
        SettingsAction::SetTtl { secs } => s.cache_ttl_secs = *secs,
        SettingsAction::SetDelay { ms } => s.request_delay_ms = *ms,
        SettingsAction::SetTimeout { secs } => {
            if *secs == 0 {
                bail!("超时必须大于 0");
            }
            s.timeout_secs = *secs;
        }
        SettingsAction::SetBaseUrl { url } => {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("URL 需以 http:// 或 https:// 开头: {}", url);
            }
            s.yahoo_base_url = url.trim_end_matches('/').to_string();
        }
        SettingsAction::SetVault { path } => {
            if path.trim().is_empty() {
                bail!("金库路径不能为空");
            }
            s.vault_path = path.trim().to_string();
        }
        SettingsAction::SetMissing { mode } => s.profile.missing = (*mode).into(),
        SettingsAction::SetPeRange { min, max } => {
            check_range("PE", *min, *max)?;
            s.profile.pe_min = *min;
            s.profile.pe_max = *max;
        }
        SettingsAction::SetRoeRange { min, max } => {
            check_range("ROE", *min, *max)?;
            s.profile.roe_min = *min;
            s.profile.roe_max = *max;
        }
        SettingsAction::SetGrowthRange { min, max } => {
            check_range("营收增长", *min, *max)?;
            s.profile.growth_min = *min;
            s.profile.growth_max = *max;
        }
        SettingsAction::SetCapRange { min, max } => {
            check_range("市值", *min, *max)?;
            s.profile.log_cap_min = *min;
            s.profile.log_cap_max = *max;
        }
        SettingsAction::SetPegRange { min, max } => {
            check_range("PEG", *min, *max)?;
            s.profile.peg_min = *min;
            s.profile.peg_max = *max;
        }
        SettingsAction::SetRoeTarget { target } => {
            s.profile.roe_target = check_target("ROE", *target)?;
        }
        SettingsAction::SetGrowthTarget { target } => {
            s.profile.growth_target = check_target("营收增长", *target)?;
        }
        SettingsAction::SetFcfPenalty { factor } => {
            if !(0.0..=1.0).contains(factor) {
                bail!("乘数请介于 0-1: {}", factor);
            }
            s.profile.fcf_penalty = *factor;
        }
        SettingsAction::Reset => s = AppSettings::default(),
    }
    Ok(s)
}

fn check_range(label: &str, min: f64, max: f64) -> Result<()> {
    if !(min.is_finite() && max.is_finite() && max > min) {
        bail!("{} 区间不合法: {} - {}", label, min, max);
    }
    Ok(())
}

fn check_target(label: &str, target: Option<f64>) -> Result<Option<f64>> {
    match target {
        Some(t) if !(t.is_finite() && t > 0.0) => bail!("{} 达标值需大于 0: {}", label, t),
        other => Ok(other),
    }
}

pub fn run(state: &mut AppState, action: SettingsAction) -> Result<()> {
    if !matches!(action, SettingsAction::Show) {
        let updated = apply(&state.settings, &action)?;
        state.db.save_settings(&updated)?;
        state.settings = updated;
        log::info!("设置已更新");
    }
    println!("{}", serde_json::to_string_pretty(&state.settings)?);
    Ok(())
}

pub fn run_cache(state: &AppState, action: CacheAction) -> Result<()> {
    match action {
        CacheAction::Purge => {
            let n = state.db.purge_cache()?;
            println!("已清除 {} 条缓存。", n);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_validates() {
        let base = AppSettings::default();
        assert!(apply(&base, &SettingsAction::SetPeRange { min: 50.0, max: 15.0 }).is_err());
        assert!(apply(&base, &SettingsAction::SetFcfPenalty { factor: 1.5 }).is_err());
        assert!(apply(&base, &SettingsAction::SetBaseUrl { url: "ftp://x".into() }).is_err());

        let s = apply(&base, &SettingsAction::SetPeRange { min: 15.0, max: 50.0 }).unwrap();
        assert_eq!((s.profile.pe_min, s.profile.pe_max), (15.0, 50.0));

        let s = apply(&base, &SettingsAction::SetMissing { mode: MissingArg::Neutral }).unwrap();
        assert_eq!(s.profile.missing, MissingMetric::Neutral);
    }

    #[test]
    fn test_apply_metric_ranges() {
        let base = AppSettings::default();
        assert!(apply(&base, &SettingsAction::SetRoeRange { min: 0.6, max: -0.5 }).is_err());
        assert!(apply(&base, &SettingsAction::SetGrowthRange { min: f64::NAN, max: 1.0 }).is_err());
        assert!(apply(&base, &SettingsAction::SetCapRange { min: 9.0, max: 9.0 }).is_err());
        assert!(apply(&base, &SettingsAction::SetPegRange { min: 1.0, max: f64::INFINITY }).is_err());

        let s = apply(&base, &SettingsAction::SetRoeRange { min: -0.2, max: 0.4 }).unwrap();
        assert_eq!((s.profile.roe_min, s.profile.roe_max), (-0.2, 0.4));
        let s = apply(&s, &SettingsAction::SetGrowthRange { min: -0.5, max: 1.0 }).unwrap();
        assert_eq!((s.profile.growth_min, s.profile.growth_max), (-0.5, 1.0));
        let s = apply(&s, &SettingsAction::SetCapRange { min: 8.0, max: 13.0 }).unwrap();
        assert_eq!((s.profile.log_cap_min, s.profile.log_cap_max), (8.0, 13.0));
        let s = apply(&s, &SettingsAction::SetPegRange { min: 0.8, max: 2.5 }).unwrap();
        assert_eq!((s.profile.peg_min, s.profile.peg_max), (0.8, 2.5));
        // 其他区间不受影响
        assert_eq!(s.profile.roe_min, -0.2);
    }

    #[test]
    fn test_apply_targets_set_and_clear() {
        let base = AppSettings::default();
        assert!(apply(&base, &SettingsAction::SetRoeTarget { target: Some(0.0) }).is_err());
        assert!(apply(&base, &SettingsAction::SetGrowthTarget { target: Some(-0.1) }).is_err());
        assert!(apply(&base, &SettingsAction::SetRoeTarget { target: Some(f64::NAN) }).is_err());

        let s = apply(&base, &SettingsAction::SetRoeTarget { target: Some(0.2) }).unwrap();
        assert_eq!(s.profile.roe_target, Some(0.2));
        let s = apply(&s, &SettingsAction::SetGrowthTarget { target: Some(0.15) }).unwrap();
        assert_eq!(s.profile.growth_target, Some(0.15));

        let s = apply(&s, &SettingsAction::SetRoeTarget { target: None }).unwrap();
        assert_eq!(s.profile.roe_target, None);
        assert_eq!(s.profile.growth_target, Some(0.15));
    }
}
