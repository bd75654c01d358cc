pub mod analyze_cmd;
pub mod score_cmd;
pub mod sector_cmd;
pub mod settings_cmd;
pub mod stock_cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::services::yahoo::YahooFinanceService;
use crate::AppState;

#[derive(Parser, Debug)]
#[command(name = "stock-vault", author, version, about = "产业股票基本面合成评分工具", long_about = None)]
pub struct Cli {
    /// 数据目录（SQLite 设置与缓存）
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// 金库 JSON 路径，覆盖设置中的 vault_path
    #[arg(long, global = true)]
    pub vault: Option<PathBuf>,

    /// -v 输出 debug 日志
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 产业与股票管理
    #[command(subcommand)]
    Sector(sector_cmd::SectorAction),
    /// 人工评分（0-10）与政策面/护城河（0-100）
    #[command(subcommand)]
    Score(score_cmd::ScoreAction),
    /// 合成分数权重
    #[command(subcommand)]
    Weights(score_cmd::WeightsAction),
    /// 最新价与涨跌幅
    Quote { symbol: String },
    /// 主要基本面指标
    Fundamentals { symbol: String },
    /// 抓取产业内股票并按合成分数排序
    Analyze {
        sector: String,
        /// 以 JSON 输出完整结果
        #[arg(long)]
        json: bool,
        /// 不输出每只股票的文字摘要
        #[arg(long)]
        no_summary: bool,
    },
    /// 输出金库 JSON
    Export,
    /// 查看或修改设置
    #[command(subcommand)]
    Settings(settings_cmd::SettingsAction),
    /// 基本面缓存
    #[command(subcommand)]
    Cache(settings_cmd::CacheAction),
}

pub async fn execute(state: &mut AppState, command: Command) -> Result<()> {
    match command {
        Command::Sector(action) => sector_cmd::run(state, action),
        Command::Score(action) => score_cmd::run(state, action),
        Command::Weights(action) => score_cmd::run_weights(state, action),
        Command::Quote { symbol } => {
            let provider = YahooFinanceService::new(&state.settings)?;
            stock_cmd::quote(state, &provider, &symbol).await
        }
        Command::Fundamentals { symbol } => {
            let provider = YahooFinanceService::new(&state.settings)?;
            stock_cmd::fundamentals(state, &provider, &symbol).await
        }
        Command::Analyze { sector, json, no_summary } => {
            let provider = YahooFinanceService::new(&state.settings)?;
            analyze_cmd::run(state, &provider, &sector, json, !no_summary).await
        }
        Command::Export => {
            let vault = state.vault.load()?;
            println!("{}", serde_json::to_string_pretty(&vault)?);
            Ok(())
        }
        Command::Settings(action) => settings_cmd::run(state, action),
        Command::Cache(action) => settings_cmd::run_cache(state, action),
    }
}
