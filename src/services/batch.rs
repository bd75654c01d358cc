use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::sleep;

use crate::db::database::Database;
use crate::models::fundamentals::TickerFundamentals;
use crate::services::provider::FundamentalsProvider;

/// 批量抓取结果：成功的按代号存放，失败的只记代号
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub infos: BTreeMap<String, TickerFundamentals>,
    pub failed: Vec<String>,
    pub cache_hits: usize,
}

pub struct BatchOptions {
    pub cache_ttl_secs: u64,
    pub request_delay: Duration,
}

/// 逐只抓取基本面
/// 1. TTL 内的缓存直接使用，不发请求
/// 2. 两次外部请求之间固定间隔，避免被限流
/// 3. 单只失败只记录，不中断整个批次
pub async fn batch_fetch(
    provider: &dyn FundamentalsProvider,
    cache: Option<&Database>,
    symbols: &[String],
    opts: &BatchOptions,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    let total = symbols.len();
    let mut requested = false;

    for (i, symbol) in symbols.iter().enumerate() {
        if let Some(db) = cache {
            match db.get_cached_fundamentals(symbol, opts.cache_ttl_secs) {
                Ok(Some(info)) => {
                    log::debug!("{} 命中缓存", symbol);
                    outcome.cache_hits += 1;
                    outcome.infos.insert(symbol.clone(), info);
                    continue;
                }
                Ok(None) => {}
                Err(e) => log::warn!("读取 {} 缓存失败: {}", symbol, e),
            }
        }

        if requested && !opts.request_delay.is_zero() {
            sleep(opts.request_delay).await;
        }
        requested = true;

        log::info!("抓取 {} ({}/{})...", symbol, i + 1, total);
        match provider.fetch(symbol).await {
            Ok(info) => {
                if let Some(db) = cache {
                    if let Err(e) = db.save_fundamentals(&info) {
                        log::warn!("写入 {} 缓存失败: {}", symbol, e);
                    }
                }
                outcome.infos.insert(symbol.clone(), info);
            }
            Err(e) => {
                if e.is_transient() {
                    log::warn!("抓取 {} 暂时失败（可稍后重试）: {}", symbol, e);
                } else {
                    log::error!("抓取 {} 失败: {}", symbol, e);
                }
                outcome.failed.push(symbol.clone());
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::provider::FetchError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FundamentalsProvider for StubProvider {
        async fn fetch(&self, symbol: &str) -> Result<TickerFundamentals, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match symbol {
                "LIMIT" => Err(FetchError::RateLimited),
                "GONE" => Err(FetchError::NotFound(symbol.to_string())),
                _ => {
                    let mut f = TickerFundamentals::new(symbol);
                    f.short_name = Some(format!("{} Inc.", symbol));
                    f.forward_pe = Some(20.0);
                    Ok(f)
                }
            }
        }
    }

    fn opts() -> BatchOptions {
        BatchOptions {
            cache_ttl_secs: 300,
            request_delay: Duration::from_millis(500),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_abort_batch() {
        let provider = StubProvider { calls: AtomicUsize::new(0) };
        let symbols: Vec<String> = ["AAPL", "LIMIT", "GONE", "MSFT"].iter().map(|s| s.to_string()).collect();

        let out = batch_fetch(&provider, None, &symbols, &opts()).await;
        assert_eq!(out.infos.len(), 2);
        assert!(out.infos.contains_key("AAPL"));
        assert!(out.infos.contains_key("MSFT"));
        assert_eq!(out.failed, vec!["LIMIT", "GONE"]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_skips_request() {
        let provider = StubProvider { calls: AtomicUsize::new(0) };
        let db = Database::open_in_memory().unwrap();
        let symbols = vec!["AAPL".to_string(), "NVDA".to_string()];

        let first = batch_fetch(&provider, Some(&db), &symbols, &opts()).await;
        assert_eq!(first.cache_hits, 0);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

        let second = batch_fetch(&provider, Some(&db), &symbols, &opts()).await;
        assert_eq!(second.cache_hits, 2);
        assert_eq!(second.infos.len(), 2);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_symbols() {
        let provider = StubProvider { calls: AtomicUsize::new(0) };
        let out = batch_fetch(&provider, None, &[], &opts()).await;
        assert!(out.infos.is_empty());
        assert!(out.failed.is_empty());
    }
}
