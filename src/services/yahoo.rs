use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::models::fundamentals::TickerFundamentals;
use crate::models::settings::{AppSettings, DEFAULT_YAHOO_BASE_URL};
use crate::services::provider::{FetchError, FundamentalsProvider};
use crate::utils::http::build_yahoo_client;

const YAHOO_COOKIE_URL: &str = "https://fc.yahoo.com";
const QUOTE_SUMMARY_MODULES: &str = "price,summaryDetail,defaultKeyStatistics,financialData";

pub struct YahooFinanceService {
    client: reqwest::Client,
    base_url: String,
    crumb: Mutex<Option<String>>,
}

impl YahooFinanceService {
    pub fn new(settings: &AppSettings) -> Result<Self> {
        Ok(Self {
            client: build_yahoo_client(settings.timeout_secs)?,
            base_url: settings.yahoo_base_url.trim_end_matches('/').to_string(),
            crumb: Mutex::new(None),
        })
    }

    /// 取得 crumb（首次调用时先访问 fc.yahoo.com 拿 cookie）
    async fn ensure_crumb(&self) -> Result<String, FetchError> {
        let mut guard = self.crumb.lock().await;
        if let Some(c) = guard.as_ref() {
            return Ok(c.clone());
        }

        if self.base_url == DEFAULT_YAHOO_BASE_URL {
            // 该地址通常返回 404，只要 Set-Cookie 即可
            if let Err(e) = self.client.get(YAHOO_COOKIE_URL).send().await {
                log::debug!("获取 Yahoo cookie 失败（忽略）: {}", e);
            }
        }

        let url = format!("{}/v1/test/getcrumb", self.base_url);
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        let crumb = resp.text().await?.trim().to_string();
        if crumb.is_empty() || crumb.contains('<') {
            return Err(FetchError::Parse("crumb 无效".to_string()));
        }
        *guard = Some(crumb.clone());
        Ok(crumb)
    }

    async fn invalidate_crumb(&self) {
        *self.crumb.lock().await = None;
    }
}

#[async_trait]
impl FundamentalsProvider for YahooFinanceService {
    async fn fetch(&self, symbol: &str) -> Result<TickerFundamentals, FetchError> {
        let crumb = self.ensure_crumb().await?;
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules={}&crumb={}",
            self.base_url,
            urlencoding::encode(symbol),
            QUOTE_SUMMARY_MODULES,
            urlencoding::encode(&crumb)
        );

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if crumb_expired(status) {
            // 下次重新获取
            self.invalidate_crumb().await;
        }
        if let Some(err) = status_error(status, symbol) {
            return Err(err);
        }

        let body: Value = resp.json().await?;
        parse_quote_summary(symbol, &body)
    }
}

/// 非成功状态码 → FetchError；成功返回 None
fn status_error(status: StatusCode, symbol: &str) -> Option<FetchError> {
    match status {
        StatusCode::TOO_MANY_REQUESTS => Some(FetchError::RateLimited),
        StatusCode::NOT_FOUND => Some(FetchError::NotFound(symbol.to_string())),
        s if !s.is_success() => Some(FetchError::Http(s.as_u16())),
        _ => None,
    }
}

fn crumb_expired(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// 解析 quoteSummary 响应
/// 数值字段可能是 {"raw": 1.2, "fmt": "1.20"}、裸数字或空对象
pub fn parse_quote_summary(symbol: &str, body: &Value) -> Result<TickerFundamentals, FetchError> {
    let qs = &body["quoteSummary"];
    if let Some(err) = qs.get("error").filter(|e| !e.is_null()) {
        let code = err["code"].as_str().unwrap_or_default();
        if code.eq_ignore_ascii_case("Not Found") {
            return Err(FetchError::NotFound(symbol.to_string()));
        }
        let desc = err["description"].as_str().unwrap_or(code);
        return Err(FetchError::Parse(desc.to_string()));
    }

    let result = qs["result"]
        .as_array()
        .and_then(|a| a.first())
        .ok_or_else(|| FetchError::NotFound(symbol.to_string()))?;

    let price = &result["price"];
    let detail = &result["summaryDetail"];
    let stats = &result["defaultKeyStatistics"];
    let fin = &result["financialData"];

    let mut f = TickerFundamentals::new(symbol);
    f.short_name = text(&price["shortName"]);
    f.long_name = text(&price["longName"]);
    f.current_price = num(&fin["currentPrice"]).or_else(|| num(&price["regularMarketPrice"]));
    f.change_pct = num(&price["regularMarketChangePercent"]);
    f.trailing_pe = num(&detail["trailingPE"]);
    f.forward_pe = num(&detail["forwardPE"]).or_else(|| num(&stats["forwardPE"]));
    f.trailing_eps = num(&stats["trailingEps"]);
    f.return_on_equity = num(&fin["returnOnEquity"]);
    f.free_cash_flow = num(&fin["freeCashflow"]);
    f.market_cap = num(&price["marketCap"]).or_else(|| num(&detail["marketCap"]));
    f.revenue_growth = num(&fin["revenueGrowth"]);
    f.peg_ratio = num(&stats["pegRatio"]);
    f.currency = text(&price["currency"]).or_else(|| text(&fin["financialCurrency"]));

    if !f.has_identity() {
        return Err(FetchError::Empty(symbol.to_string()));
    }
    Ok(f)
}

fn num(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::Object(o) => o.get("raw").and_then(|r| r.as_f64()),
        _ => None,
    };
    n.filter(|x| x.is_finite())
}

fn text(v: &Value) -> Option<String> {
    v.as_str().map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_string)
}
