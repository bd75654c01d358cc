use anyhow::{bail, Context, Result};
use regex::Regex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::NamedTempFile;

use crate::models::score::ScoreWeights;
use crate::models::vault::Vault;

/// 美股/港股/指数代号：AAPL、BRK.B、0700.HK、^GSPC
const SYMBOL_PATTERN: &str = r"^[A-Z0-9^][A-Z0-9.\-=^]{0,14}$";

fn symbol_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SYMBOL_PATTERN).expect("SYMBOL_PATTERN 为合法正则"))
}

/// 去空白、转大写并校验
pub fn normalize_symbol(raw: &str) -> Result<String> {
    let s = raw.trim().to_uppercase();
    if !symbol_regex().is_match(&s) {
        bail!("股票代号不合法: {:?}", raw.trim());
    }
    Ok(s)
}

/// 解析「AAPL, msft  nvda」这类输入：逗号或空白分隔，去重且保持顺序
pub fn parse_ticker_list(input: &str) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for part in input.split(|c: char| c == ',' || c.is_whitespace()) {
        if part.trim().is_empty() {
            continue;
        }
        let sym = normalize_symbol(part)?;
        if !out.contains(&sym) {
            out.push(sym);
        }
    }
    Ok(out)
}

/// 金库 JSON 文件的读写
/// 每次修改都是「读取 → 只改目标键 → 原子写回」，不会把其他股票的分数覆盖掉
pub struct VaultStore {
    path: PathBuf,
}

impl VaultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 文件不存在时写入空金库；文件损坏直接报错，不做覆盖
    pub fn load(&self) -> Result<Vault> {
        if !self.path.exists() {
            let vault = Vault::default();
            self.save(&vault)?;
            log::info!("已创建新的金库文件: {}", self.path.display());
            return Ok(vault);
        }
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("读取金库失败: {}", self.path.display()))?;
        let vault: Vault = serde_json::from_str(&text)
            .with_context(|| format!("金库文件格式错误: {}", self.path.display()))?;
        Ok(vault)
    }

    /// 同目录临时文件写完后 rename，避免写一半损坏
    pub fn save(&self, vault: &Vault) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, vault)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("写入金库失败: {}", self.path.display()))?;
        Ok(())
    }

    fn update<R>(&self, f: impl FnOnce(&mut Vault) -> Result<R>) -> Result<R> {
        let mut vault = self.load()?;
        let out = f(&mut vault)?;
        self.save(&vault)?;
        Ok(out)
    }

    // ====== 产业 ======

    pub fn add_sector(&self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("产业名称不能为空");
        }
        self.update(|v| {
            if v.sectors.contains_key(name) {
                bail!("产业已存在: {}", name);
            }
            v.sectors.insert(name.to_string(), Vec::new());
            Ok(())
        })
    }

    /// 删除产业及其股票列表（人工评分按代号保存，不随之删除）
    pub fn remove_sector(&self, name: &str) -> Result<Vec<String>> {
        let name = name.trim();
        self.update(|v| match v.sectors.remove(name) {
            Some(list) => {
                v.sector_weights.remove(name);
                Ok(list)
            }
            None => bail!("产业不存在: {}", name),
        })
    }

    /// 返回实际新增的代号
    pub fn add_tickers(&self, sector: &str, input: &str) -> Result<Vec<String>> {
        let sector = sector.trim();
        let symbols = parse_ticker_list(input)?;
        if symbols.is_empty() {
            bail!("未输入任何股票代号");
        }
        self.update(|v| {
            let Some(list) = v.sectors.get_mut(sector) else {
                bail!("产业不存在: {}", sector);
            };
            let mut added = Vec::new();
            for s in symbols {
                if !list.contains(&s) {
                    list.push(s.clone());
                    added.push(s);
                }
            }
            Ok(added)
        })
    }

    pub fn remove_ticker(&self, sector: &str, symbol: &str) -> Result<()> {
        let sector = sector.trim();
        let symbol = normalize_symbol(symbol)?;
        self.update(|v| {
            let Some(list) = v.sectors.get_mut(sector) else {
                bail!("产业不存在: {}", sector);
            };
            let before = list.len();
            list.retain(|s| s != &symbol);
            if list.len() == before {
                bail!("{} 不在产业 {} 中", symbol, sector);
            }
            Ok(())
        })
    }

    // ====== 人工评分 ======

    /// 人工评分 0-10，保留两位小数
    pub fn set_user_score(&self, symbol: &str, score: f64) -> Result<f64> {
        let symbol = normalize_symbol(symbol)?;
        if !score.is_finite() || !(0.0..=10.0).contains(&score) {
            bail!("评分请介于 0-10: {}", score);
        }
        let rounded = (score * 100.0).round() / 100.0;
        self.update(|v| {
            v.user_scores.insert(symbol, rounded);
            Ok(rounded)
        })
    }

    /// 返回是否真的删除了分数
    pub fn clear_user_score(&self, symbol: &str) -> Result<bool> {
        let symbol = normalize_symbol(symbol)?;
        self.update(|v| Ok(v.user_scores.remove(&symbol).is_some()))
    }

    pub fn set_policy_score(&self, symbol: &str, score: u8) -> Result<()> {
        let symbol = normalize_symbol(symbol)?;
        check_percent(score)?;
        self.update(|v| {
            v.policy_scores.insert(symbol, score);
            Ok(())
        })
    }

    pub fn set_moat_score(&self, symbol: &str, score: u8) -> Result<()> {
        let symbol = normalize_symbol(symbol)?;
        check_percent(score)?;
        self.update(|v| {
            v.moat_scores.insert(symbol, score);
            Ok(())
        })
    }

    /// 清除某只股票的全部人工输入
    pub fn clear_manual_scores(&self, symbol: &str) -> Result<()> {
        let symbol = normalize_symbol(symbol)?;
        self.update(|v| {
            v.user_scores.remove(&symbol);
            v.policy_scores.remove(&symbol);
            v.moat_scores.remove(&symbol);
            Ok(())
        })
    }

    pub fn set_weights(&self, weights: ScoreWeights) -> Result<()> {
        weights.validate().map_err(anyhow::Error::msg)?;
        self.update(|v| {
            v.weights = weights;
            Ok(())
        })
    }

    pub fn set_sector_weights(&self, sector: &str, weights: ScoreWeights) -> Result<()> {
        let sector = sector.trim();
        weights.validate().map_err(anyhow::Error::msg)?;
        self.update(|v| {
            if !v.sectors.contains_key(sector) {
                bail!("产业不存在: {}", sector);
            }
            v.sector_weights.insert(sector.to_string(), weights);
            Ok(())
        })
    }

    /// 删除产业专属权重，回到全局权重；返回是否原本存在
    pub fn clear_sector_weights(&self, sector: &str) -> Result<bool> {
        let sector = sector.trim();
        self.update(|v| Ok(v.sector_weights.remove(sector).is_some()))
    }
}

fn check_percent(score: u8) -> Result<()> {
    if score > 100 {
        bail!("分数请介于 0-100: {}", score);
    }
    Ok(())
}
