//! 表格与摘要共用的数值格式化，缺值统一显示 "N/A"

pub const NA: &str = "N/A";

pub fn fmt_num(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{:.2}", x),
        _ => NA.to_string(),
    }
}

/// 小数 → 百分比（0.153 → "15.30%"）
pub fn fmt_pct(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{:.2}%", x * 100.0),
        _ => NA.to_string(),
    }
}

/// 金额 → 十亿（B）
pub fn fmt_billions(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => format!("${:.2}B", x / 1e9),
        _ => NA.to_string(),
    }
}
