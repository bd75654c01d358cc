use anyhow::Result;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::models::score::{ScoredTicker, SectorReport};
use crate::services::analysis::analyze_sector;
use crate::services::provider::FundamentalsProvider;
use crate::utils::format::{fmt_billions, fmt_num, fmt_pct, NA};
use crate::AppState;

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "排名")]
    rank: usize,
    #[tabled(rename = "代号")]
    symbol: String,
    #[tabled(rename = "公司名称")]
    name: String,
    #[tabled(rename = "PE")]
    pe: String,
    #[tabled(rename = "ROE %")]
    roe: String,
    #[tabled(rename = "营收增长 %")]
    growth: String,
    #[tabled(rename = "市值 (B)")]
    market_cap: String,
    #[tabled(rename = "人工评分")]
    user: String,
    #[tabled(rename = "合成分数 (0-100)")]
    combined: String,
}

fn to_row(rank: usize, t: &ScoredTicker) -> ReportRow {
    let f = t.fundamentals.as_ref();
    let mut combined = format!("{:.2}", t.breakdown.combined);
    if t.breakdown.fcf_penalised {
        combined.push_str(" *");
    }
    ReportRow {
        rank,
        symbol: t.symbol.clone(),
        name: t.name().to_string(),
        pe: fmt_num(f.and_then(|f| f.pe())),
        roe: fmt_pct(f.and_then(|f| f.return_on_equity)),
        growth: fmt_pct(f.and_then(|f| f.revenue_growth)),
        market_cap: fmt_billions(f.and_then(|f| f.market_cap)),
        user: t.manual.user.map(|v| v.to_string()).unwrap_or_else(|| NA.to_string()),
        combined,
    }
}

pub fn render_report(report: &SectorReport, with_summary: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!("产业：{}（{}）\n", report.sector, report.generated_at));

    let rows: Vec<ReportRow> = report
        .rows
        .iter()
        .enumerate()
        .map(|(i, t)| to_row(i + 1, t))
        .collect();
    out.push_str(&Table::new(rows).with(Style::modern()).to_string());
    out.push('\n');

    if report.rows.iter().any(|r| r.breakdown.fcf_penalised) {
        out.push_str("* 自由现金流为负，合成分数已打折\n");
    }
    if !report.failed.is_empty() {
        out.push_str(&format!(
            "下列代号抓取失败：{}（可能无效代号或被限流）\n",
            report.failed.join(", ")
        ));
    }

    if with_summary {
        for t in &report.rows {
            out.push_str(&format!("\n{} — 合成分数：{:.2}\n", t.symbol, t.breakdown.combined));
            out.push_str(&t.summary);
            out.push('\n');
        }
    }
    out
}

pub async fn run(
    state: &AppState,
    provider: &dyn FundamentalsProvider,
    sector: &str,
    json: bool,
    with_summary: bool,
) -> Result<()> {
    let report = analyze_sector(state, provider, sector).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report, with_summary));
    }
    Ok(())
}
