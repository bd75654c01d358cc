use anyhow::{anyhow, Result};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::models::fundamentals::TickerFundamentals;
use crate::models::settings::AppSettings;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)?;
        let db_path = data_dir.join("stock_vault.db");
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("数据库连接锁已失效"))
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS settings (
                id TEXT PRIMARY KEY DEFAULT 'default',
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS fundamentals_cache (
                symbol TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                fetched_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_fundamentals_fetched ON fundamentals_cache(fetched_at);
            ",
        )?;
        Ok(())
    }

    pub fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        let conn = self.conn()?;
        let data = serde_json::to_string(settings)?;
        conn.execute(
            "INSERT OR REPLACE INTO settings (id, data, updated_at) VALUES ('default', ?1, datetime('now'))",
            rusqlite::params![data],
        )?;
        Ok(())
    }

    pub fn load_settings(&self) -> Result<AppSettings> {
        let conn = self.conn()?;
        let result = conn.query_row(
            "SELECT data FROM settings WHERE id = 'default'",
            [],
            |row| {
                let data: String = row.get(0)?;
                Ok(data)
            },
        );
        match result {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                let default = AppSettings::default();
                drop(conn);
                self.save_settings(&default)?;
                Ok(default)
            }
            Err(e) => Err(e.into()),
        }
    }

    // ====== Fundamentals Cache ======

    pub fn save_fundamentals(&self, info: &TickerFundamentals) -> Result<()> {
        self.save_fundamentals_at(info, chrono::Utc::now().timestamp())
    }

    pub fn save_fundamentals_at(&self, info: &TickerFundamentals, fetched_at: i64) -> Result<()> {
        let conn = self.conn()?;
        let data = serde_json::to_string(info)?;
        conn.execute(
            "INSERT OR REPLACE INTO fundamentals_cache (symbol, data, fetched_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![info.symbol, data, fetched_at],
        )?;
        Ok(())
    }

    /// 仅返回 ttl 秒内抓取的缓存
    pub fn get_cached_fundamentals(&self, symbol: &str, ttl_secs: u64) -> Result<Option<TickerFundamentals>> {
        if ttl_secs == 0 {
            return Ok(None);
        }
        let conn = self.conn()?;
        let cutoff = chrono::Utc::now().timestamp() - ttl_secs as i64;
        let result = conn.query_row(
            "SELECT data FROM fundamentals_cache WHERE symbol = ?1 AND fetched_at >= ?2",
            rusqlite::params![symbol, cutoff],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(data) => Ok(Some(serde_json::from_str(&data)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 清除缓存，返回删除条数
    pub fn purge_cache(&self) -> Result<usize> {
        let conn = self.conn()?;
        let n = conn.execute("DELETE FROM fundamentals_cache", [])?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default_created_once() {
        let db = Database::open_in_memory().unwrap();
        let s = db.load_settings().unwrap();
        assert_eq!(s, AppSettings::default());

        let mut changed = s.clone();
        changed.cache_ttl_secs = 60;
        db.save_settings(&changed).unwrap();
        assert_eq!(db.load_settings().unwrap().cache_ttl_secs, 60);
    }

    #[test]
    fn test_cache_respects_ttl() {
        let db = Database::open_in_memory().unwrap();
        let mut info = TickerFundamentals::new("AAPL");
        info.forward_pe = Some(28.0);

        db.save_fundamentals(&info).unwrap();
        let hit = db.get_cached_fundamentals("AAPL", 300).unwrap();
        assert_eq!(hit.and_then(|f| f.forward_pe), Some(28.0));
        assert!(db.get_cached_fundamentals("AAPL", 0).unwrap().is_none());

        let stale = chrono::Utc::now().timestamp() - 3600;
        db.save_fundamentals_at(&info, stale).unwrap();
        assert!(db.get_cached_fundamentals("AAPL", 300).unwrap().is_none());

        assert_eq!(db.purge_cache().unwrap(), 1);
    }
}
