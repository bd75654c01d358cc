use std::collections::BTreeSet;

use anyhow::{bail, Result};
use clap::Subcommand;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::db::vault_store::normalize_symbol;
use crate::models::score::ScoreWeights;
use crate::utils::format::NA;
use crate::AppState;

#[derive(Subcommand, Debug)]
pub enum ScoreAction {
    /// 设置人工评分 0-10
    Set { symbol: String, score: f64 },
    /// 清除人工评分；--all 连同政策面/护城河一起清除
    Clear {
        symbol: String,
        #[arg(long)]
        all: bool,
    },
    /// 设置政策面分数 0-100
    Policy { symbol: String, score: u8 },
    /// 设置护城河分数 0-100
    Moat { symbol: String, score: u8 },
    /// 查看人工输入（不指定代号则列出全部）
    Show { symbol: Option<String> },
}

#[derive(Subcommand, Debug)]
pub enum WeightsAction {
    /// 指定 --sector 时显示该产业实际使用的权重
    Show {
        #[arg(long)]
        sector: Option<String>,
    },
    /// 只修改给出的项；带 --sector 则写入产业专属权重
    Set {
        #[arg(long)]
        sector: Option<String>,
        #[arg(long)]
        user: Option<f64>,
        #[arg(long)]
        policy: Option<f64>,
        #[arg(long)]
        moat: Option<f64>,
        #[arg(long)]
        pe: Option<f64>,
        #[arg(long)]
        roe: Option<f64>,
        #[arg(long)]
        revenue_growth: Option<f64>,
        #[arg(long)]
        market_cap: Option<f64>,
        #[arg(long)]
        peg: Option<f64>,
    },
    /// 恢复默认权重；带 --sector 则删除该产业的专属权重
    Reset {
        #[arg(long)]
        sector: Option<String>,
    },
}

#[derive(Tabled)]
struct ManualRow {
    #[tabled(rename = "代号")]
    symbol: String,
    #[tabled(rename = "人工评分 (0-10)")]
    user: String,
    #[tabled(rename = "政策面")]
    policy: String,
    #[tabled(rename = "护城河")]
    moat: String,
    #[tabled(rename = "所属产业")]
    sectors: String,
}

pub fn run(state: &AppState, action: ScoreAction) -> Result<()> {
    match action {
        ScoreAction::Set { symbol, score } => {
            let saved = state.vault.set_user_score(&symbol, score)?;
            println!("{} 的分数已储存：{}", normalize_symbol(&symbol)?, saved);
        }
        ScoreAction::Clear { symbol, all } => {
            let sym = normalize_symbol(&symbol)?;
            if all {
                state.vault.clear_manual_scores(&sym)?;
                println!("{} 的人工输入已全部清除。", sym);
            } else if state.vault.clear_user_score(&sym)? {
                println!("{} 的分数已清除。", sym);
            } else {
                println!("{} 原本就没有分数。", sym);
            }
        }
        ScoreAction::Policy { symbol, score } => {
            state.vault.set_policy_score(&symbol, score)?;
            println!("{} 政策面：{}", normalize_symbol(&symbol)?, score);
        }
        ScoreAction::Moat { symbol, score } => {
            state.vault.set_moat_score(&symbol, score)?;
            println!("{} 护城河：{}", normalize_symbol(&symbol)?, score);
        }
        ScoreAction::Show { symbol } => {
            let vault = state.vault.load()?;
            let symbols: BTreeSet<String> = match symbol {
                Some(s) => BTreeSet::from([normalize_symbol(&s)?]),
                None => vault
                    .user_scores
                    .keys()
                    .chain(vault.policy_scores.keys())
                    .chain(vault.moat_scores.keys())
                    .cloned()
                    .collect(),
            };
            if symbols.is_empty() {
                println!("尚无任何人工评分。");
                return Ok(());
            }
            let rows: Vec<ManualRow> = symbols
                .into_iter()
                .map(|s| {
                    let m = vault.manual_scores(&s);
                    ManualRow {
                        user: m.user.map(|v| v.to_string()).unwrap_or_else(|| NA.to_string()),
                        policy: m.policy.map(|v| v.to_string()).unwrap_or_else(|| NA.to_string()),
                        moat: m.moat.map(|v| v.to_string()).unwrap_or_else(|| NA.to_string()),
                        sectors: vault.sectors_of(&s).join(", "),
                        symbol: s,
                    }
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::modern()));
        }
    }
    Ok(())
}

pub fn run_weights(state: &AppState, action: WeightsAction) -> Result<()> {
    match action {
        WeightsAction::Show { sector } => {
            let vault = state.vault.load()?;
            match sector.as_deref().map(str::trim) {
                Some(name) => {
                    if vault.tickers(name).is_none() {
                        bail!("产业不存在: {}", name);
                    }
                    let source = if vault.sector_weights.contains_key(name) { "专属" } else { "全局" };
                    println!("产业 {}（{}权重）：", name, source);
                    print_weights(vault.weights_for(name));
                }
                None => {
                    print_weights(&vault.weights);
                    for name in vault.sector_weights.keys() {
                        println!("  产业 {} 另有专属权重", name);
                    }
                }
            }
        }
        WeightsAction::Set { sector, user, policy, moat, pe, roe, revenue_growth, market_cap, peg } => {
            let vault = state.vault.load()?;
            let mut w = match sector.as_deref() {
                Some(name) => vault.weights_for(name.trim()).clone(),
                None => vault.weights.clone(),
            };
            if let Some(v) = user { w.user = v; }
            if let Some(v) = policy { w.policy = v; }
            if let Some(v) = moat { w.moat = v; }
            if let Some(v) = pe { w.pe = v; }
            if let Some(v) = roe { w.roe = v; }
            if let Some(v) = revenue_growth { w.revenue_growth = v; }
            if let Some(v) = market_cap { w.market_cap = v; }
            if let Some(v) = peg { w.peg = v; }
            match sector.as_deref() {
                Some(name) => {
                    state.vault.set_sector_weights(name, w.clone())?;
                    println!("产业 {} 的专属权重已更新：", name.trim());
                }
                None => {
                    state.vault.set_weights(w.clone())?;
                    println!("权重已更新：");
                }
            }
            print_weights(&w);
        }
        WeightsAction::Reset { sector: Some(name) } => {
            if state.vault.clear_sector_weights(&name)? {
                println!("产业 {} 已改回使用全局权重。", name.trim());
            } else {
                println!("产业 {} 原本就没有专属权重。", name.trim());
            }
        }
        WeightsAction::Reset { sector: None } => {
            state.vault.set_weights(ScoreWeights::default())?;
            println!("权重已恢复默认。");
            print_weights(&ScoreWeights::default());
        }
    }
    Ok(())
}

fn print_weights(w: &ScoreWeights) {
    println!("  人工评分    {:.2}", w.user);
    println!("  政策面      {:.2}", w.policy);
    println!("  护城河      {:.2}", w.moat);
    println!("  PE          {:.2}", w.pe);
    println!("  ROE         {:.2}", w.roe);
    println!("  营收成长    {:.2}", w.revenue_growth);
    println!("  市值        {:.2}", w.market_cap);
    println!("  PEG         {:.2}", w.peg);
    println!("  （缺值项会自动降权并重新归一）");
}
