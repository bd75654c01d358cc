use crate::models::fundamentals::TickerFundamentals;
use crate::models::score::ManualScores;
use crate::utils::format::{fmt_billions, fmt_num, fmt_pct};

/// 规则式解读，返回命中的结论短句
pub fn interpret(info: &TickerFundamentals) -> Vec<&'static str> {
    let mut out = Vec::new();

    if let Some(pe) = info.pe() {
        if pe < 15.0 {
            out.push("估值相对低（PE < 15）");
        } else if pe > 40.0 {
            out.push("估值偏高（PE > 40）");
        }
    }

    if let Some(roe) = info.return_on_equity {
        if roe > 0.15 {
            out.push("ROE 高，资本回报佳");
        } else if roe < 0.0 {
            out.push("ROE 为负，需注意获利能力");
        }
    }

    if let Some(g) = info.revenue_growth {
        if g > 0.2 {
            out.push("营收强劲成长");
        } else if g < -0.1 {
            out.push("营收衰退明显");
        }
    }

    if info.has_negative_fcf() {
        out.push("自由现金流为负");
    }

    out
}

/// 生成单只股票的文字摘要，并标注每项数据来源
pub fn generate_summary(symbol: &str, info: Option<&TickerFundamentals>, manual: &ManualScores) -> String {
    let mut lines = Vec::new();

    let Some(info) = info else {
        lines.push(format!("公司：N/A ({})", symbol));
        lines.push("- 无 Yahoo Finance 数据（抓取失败或代号错误）".to_string());
        push_manual_lines(&mut lines, manual);
        return lines.join("\n");
    };

    lines.push(format!("公司：{} ({})", info.display_name(), symbol));

    if info.pe().is_some() {
        lines.push(format!("- 本益比 (PE)：{}（来源 Yahoo Finance）", fmt_num(info.pe())));
    }
    if info.return_on_equity.is_some() {
        lines.push(format!("- ROE：{}（来源 Yahoo Finance）", fmt_pct(info.return_on_equity)));
    }
    if info.revenue_growth.is_some() {
        lines.push(format!("- 营收成长率：{}（来源 Yahoo Finance）", fmt_pct(info.revenue_growth)));
    }
    if info.market_cap.is_some() {
        lines.push(format!("- 市值：{}（来源 Yahoo Finance）", fmt_billions(info.market_cap)));
    }
    if info.free_cash_flow.is_some() {
        lines.push(format!("- 自由现金流：{}（来源 Yahoo Finance）", fmt_billions(info.free_cash_flow)));
    }
    push_manual_lines(&mut lines, manual);

    let notes = interpret(info);
    if notes.is_empty() {
        lines.push("- 小结：资讯不足或指标中性，建议查看更多财报细节。".to_string());
    } else {
        lines.push(format!("- 小结：{}。", notes.join("；")));
    }

    lines.join("\n")
}

fn push_manual_lines(lines: &mut Vec<String>, manual: &ManualScores) {
    if let Some(u) = manual.user {
        lines.push(format!("- 人工评分：{} / 10（来源 本地金库）", u));
    }
    if let Some(p) = manual.policy {
        lines.push(format!("- 政策面：{} / 100（来源 本地金库）", p));
    }
    if let Some(m) = manual.moat {
        lines.push(format!("- 护城河：{} / 100（来源 本地金库）", m));
    }
}
