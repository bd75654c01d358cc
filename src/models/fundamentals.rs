use serde::{Deserialize, Serialize};

/// 单只股票基本面快照（来自 Yahoo Finance quoteSummary）
/// 数据源字段时有时无，所有指标一律为 Option，不做额外校验
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickerFundamentals {
    pub symbol: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub long_name: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub change_pct: Option<f64>,        // 当日涨跌幅（小数，0.012 = 1.2%）
    #[serde(default)]
    pub trailing_pe: Option<f64>,
    #[serde(default)]
    pub forward_pe: Option<f64>,
    #[serde(default)]
    pub trailing_eps: Option<f64>,
    #[serde(default)]
    pub return_on_equity: Option<f64>,  // 小数
    #[serde(default)]
    pub free_cash_flow: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub revenue_growth: Option<f64>,    // 小数
    #[serde(default)]
    pub peg_ratio: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub fetched_at: String,
}

impl TickerFundamentals {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            fetched_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            ..Default::default()
        }
    }

    /// 公司名称：短名 → 全名 → 代号
    pub fn display_name(&self) -> &str {
        self.short_name
            .as_deref()
            .or(self.long_name.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.symbol)
    }

    /// 优先前瞻 PE，其次历史 PE；非正值视为无效
    pub fn pe(&self) -> Option<f64> {
        self.forward_pe
            .filter(|v| v.is_finite() && *v > 0.0)
            .or_else(|| self.trailing_pe.filter(|v| v.is_finite() && *v > 0.0))
    }

    /// 至少有代号或名称才算有效数据
    pub fn has_identity(&self) -> bool {
        !self.symbol.is_empty()
            && (self.short_name.is_some() || self.long_name.is_some() || self.current_price.is_some())
    }

    /// 自由现金流为负
    pub fn has_negative_fcf(&self) -> bool {
        matches!(self.free_cash_flow, Some(v) if v < 0.0)
    }
}

/// 简易行情（price_fundamental 的 get_price）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuote {
    pub symbol: String,
    pub price: Option<f64>,
    pub change_pct: Option<f64>,
}

impl From<&TickerFundamentals> for PriceQuote {
    fn from(f: &TickerFundamentals) -> Self {
        Self {
            symbol: f.symbol.clone(),
            price: f.current_price,
            change_pct: f.change_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pe_prefers_forward() {
        let mut f = TickerFundamentals::new("AAPL");
        f.trailing_pe = Some(30.0);
        f.forward_pe = Some(25.0);
        assert_eq!(f.pe(), Some(25.0));

        f.forward_pe = Some(-3.0);
        assert_eq!(f.pe(), Some(30.0));

        f.trailing_pe = Some(0.0);
        assert_eq!(f.pe(), None);
    }

    #[test]
    fn test_display_name_fallback() {
        let mut f = TickerFundamentals::new("MSFT");
        assert_eq!(f.display_name(), "MSFT");
        f.long_name = Some("Microsoft Corporation".to_string());
        assert_eq!(f.display_name(), "Microsoft Corporation");
        f.short_name = Some("Microsoft".to_string());
        assert_eq!(f.display_name(), "Microsoft");
    }

    #[test]
    fn test_identity_requires_name_or_price() {
        let mut f = TickerFundamentals::new("XYZ");
        assert!(!f.has_identity());
        f.current_price = Some(1.0);
        assert!(f.has_identity());
    }
}
