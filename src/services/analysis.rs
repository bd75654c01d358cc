use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::models::fundamentals::TickerFundamentals;
use crate::models::score::{ScoredTicker, ScoringProfile, SectorReport};
use crate::models::vault::Vault;
use crate::services::batch::{batch_fetch, BatchOptions};
use crate::services::provider::FundamentalsProvider;
use crate::services::scoring::ScoreEngine;
use crate::services::summary::generate_summary;
use crate::AppState;

/// 抓取产业内全部股票 → 计算合成分数 → 降序排名
pub async fn analyze_sector(
    state: &AppState,
    provider: &dyn FundamentalsProvider,
    sector: &str,
) -> Result<SectorReport> {
    let vault = state.vault.load()?;
    let tickers = vault
        .tickers(sector)
        .ok_or_else(|| anyhow!("产业不存在: {}", sector))?
        .to_vec();

    if tickers.is_empty() {
        log::warn!("产业 {} 尚无股票", sector);
    }

    let opts = BatchOptions {
        cache_ttl_secs: state.settings.cache_ttl_secs,
        request_delay: Duration::from_millis(state.settings.request_delay_ms),
    };
    let outcome = batch_fetch(provider, Some(&state.db), &tickers, &opts).await;
    if !outcome.failed.is_empty() {
        log::warn!("下列代号抓取失败：{}（可能无效代号或被限流）", outcome.failed.join(", "));
    }

    let rows = score_tickers(&vault, sector, &tickers, &outcome.infos, &state.settings.profile);
    log::info!(
        "产业 {} 分析完成：{} 只，失败 {}，缓存命中 {}",
        sector,
        rows.len(),
        outcome.failed.len(),
        outcome.cache_hits
    );

    Ok(SectorReport {
        sector: sector.to_string(),
        rows,
        failed: outcome.failed,
        generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    })
}

/// 抓取失败的股票仍参与排名（只用人工评分，或回落到中性分）
/// 产业设有专属权重时优先使用
pub fn score_tickers(
    vault: &Vault,
    sector: &str,
    tickers: &[String],
    infos: &BTreeMap<String, TickerFundamentals>,
    profile: &ScoringProfile,
) -> Vec<ScoredTicker> {
    let weights = vault.weights_for(sector);
    let mut rows: Vec<ScoredTicker> = tickers
        .iter()
        .map(|symbol| {
            let info = infos.get(symbol);
            let manual = vault.manual_scores(symbol);
            let breakdown = ScoreEngine::compute(info, &manual, weights, profile);
            ScoredTicker {
                symbol: symbol.clone(),
                fundamentals: info.cloned(),
                manual,
                breakdown,
                summary: generate_summary(symbol, info, &manual),
            }
        })
        .collect();

    ScoreEngine::rank(&mut rows);
    rows
}
