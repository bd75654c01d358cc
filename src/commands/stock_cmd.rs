use anyhow::Result;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::db::vault_store::normalize_symbol;
use crate::models::fundamentals::{PriceQuote, TickerFundamentals};
use crate::services::provider::FundamentalsProvider;
use crate::utils::format::{fmt_billions, fmt_num, fmt_pct};
use crate::AppState;

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "指标")]
    name: &'static str,
    #[tabled(rename = "数值")]
    value: String,
}

async fn fetch_fresh(state: &AppState, provider: &dyn FundamentalsProvider, symbol: &str) -> Result<TickerFundamentals> {
    let symbol = normalize_symbol(symbol)?;
    let info = provider.fetch(&symbol).await?;
    if let Err(e) = state.db.save_fundamentals(&info) {
        log::warn!("写入 {} 缓存失败: {}", symbol, e);
    }
    Ok(info)
}

pub async fn quote(state: &AppState, provider: &dyn FundamentalsProvider, symbol: &str) -> Result<()> {
    let info = fetch_fresh(state, provider, symbol).await?;
    let q = PriceQuote::from(&info);
    println!(
        "{} ({})  价格 {}  涨跌 {}",
        info.display_name(),
        q.symbol,
        fmt_num(q.price),
        fmt_pct(q.change_pct)
    );
    Ok(())
}

pub async fn fundamentals(state: &AppState, provider: &dyn FundamentalsProvider, symbol: &str) -> Result<()> {
    let info = fetch_fresh(state, provider, symbol).await?;
    println!("{} ({})", info.display_name(), info.symbol);
    println!("{}", Table::new(metric_rows(&info)).with(Style::modern()));
    Ok(())
}

fn metric_rows(f: &TickerFundamentals) -> Vec<MetricRow> {
    vec![
        MetricRow { name: "股价", value: fmt_num(f.current_price) },
        MetricRow { name: "PE", value: fmt_num(f.trailing_pe) },
        MetricRow { name: "Forward PE", value: fmt_num(f.forward_pe) },
        MetricRow { name: "PEG", value: fmt_num(f.peg_ratio) },
        MetricRow { name: "EPS", value: fmt_num(f.trailing_eps) },
        MetricRow { name: "ROE", value: fmt_pct(f.return_on_equity) },
        MetricRow { name: "营收成长", value: fmt_pct(f.revenue_growth) },
        MetricRow { name: "市值", value: fmt_billions(f.market_cap) },
        MetricRow { name: "FCF", value: fmt_billions(f.free_cash_flow) },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_rows_mark_missing() {
        let mut f = TickerFundamentals::new("AAPL");
        f.trailing_pe = Some(31.234);
        let rows = metric_rows(&f);
        assert_eq!(rows.len(), 9);
        assert_eq!(rows[1].value, "31.23");
        assert!(rows.iter().filter(|r| r.value == "N/A").count() == 8);
    }
}
