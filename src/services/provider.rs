use async_trait::async_trait;
use thiserror::Error;

use crate::models::fundamentals::TickerFundamentals;

/// 行情/基本面抓取错误
/// 区分可重试（限流、网络、5xx）与永久失败（代号不存在、数据为空）
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("请求被限流 (HTTP 429)")]
    RateLimited,
    #[error("代号不存在: {0}")]
    NotFound(String),
    #[error("HTTP 状态异常: {0}")]
    Http(u16),
    #[error("网络错误: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("响应解析失败: {0}")]
    Parse(String),
    #[error("{0} 返回数据为空")]
    Empty(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::RateLimited | FetchError::Transport(_) => true,
            FetchError::Http(code) => *code >= 500,
            _ => false,
        }
    }
}

#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    async fn fetch(&self, symbol: &str) -> Result<TickerFundamentals, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::RateLimited.is_transient());
        assert!(FetchError::Http(503).is_transient());
        assert!(!FetchError::Http(404).is_transient());
        assert!(!FetchError::NotFound("ZZZZ".into()).is_transient());
        assert!(!FetchError::Empty("ZZZZ".into()).is_transient());
    }
}
