use anyhow::Result;
use clap::Subcommand;

use crate::AppState;

#[derive(Subcommand, Debug)]
pub enum SectorAction {
    /// 列出全部产业
    List,
    /// 新增产业
    Add { name: String },
    /// 删除产业（含内部股票列表）
    Remove { name: String },
    /// 新增股票，逗号或空格分隔可一次多个
    AddTickers { sector: String, tickers: Vec<String> },
    /// 从产业中移除股票
    RemoveTicker { sector: String, symbol: String },
}

pub fn run(state: &AppState, action: SectorAction) -> Result<()> {
    match action {
        SectorAction::List => {
            let vault = state.vault.load()?;
            if vault.sectors.is_empty() {
                println!("目前没有任何产业，请先用 `sector add` 新增。");
            }
            for (name, tickers) in &vault.sectors {
                let list = if tickers.is_empty() { "（尚无股票）".to_string() } else { tickers.join(", ") };
                println!("{} [{}]: {}", name, tickers.len(), list);
            }
        }
        SectorAction::Add { name } => {
            state.vault.add_sector(&name)?;
            println!("已新增产业：{}", name.trim());
        }
        SectorAction::Remove { name } => {
            let removed = state.vault.remove_sector(&name)?;
            println!("已删除产业 {}（{} 只股票）", name, removed.len());
        }
        SectorAction::AddTickers { sector, tickers } => {
            let added = state.vault.add_tickers(&sector, &tickers.join(","))?;
            if added.is_empty() {
                println!("股票均已在 {} 中，无变更。", sector);
            } else {
                println!("已新增到 {}：{}", sector, added.join(", "));
            }
        }
        SectorAction::RemoveTicker { sector, symbol } => {
            state.vault.remove_ticker(&sector, &symbol)?;
            println!("已从 {} 移除 {}", sector, symbol.trim().to_uppercase());
        }
    }
    Ok(())
}
