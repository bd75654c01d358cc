pub mod models;
pub mod services;
pub mod commands;
pub mod db;
pub mod utils;

use std::path::PathBuf;

use anyhow::Result;

use db::database::Database;
use db::vault_store::VaultStore;
use models::settings::AppSettings;

pub const DEFAULT_DATA_DIR: &str = ".stock_vault";

pub struct AppState {
    pub db: Database,
    pub vault: VaultStore,
    pub settings: AppSettings,
}

impl AppState {
    /// 打开数据目录并加载设置；vault_override 优先于设置中的 vault_path
    pub fn open(data_dir: Option<PathBuf>, vault_override: Option<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let db = Database::new(data_dir)?;
        let settings = db.load_settings().unwrap_or_else(|e| {
            log::warn!("设置读取失败，使用默认值: {}", e);
            AppSettings::default()
        });
        let vault_path = vault_override.unwrap_or_else(|| PathBuf::from(&settings.vault_path));
        log::debug!("金库路径: {}", vault_path.display());

        Ok(Self {
            db,
            vault: VaultStore::new(vault_path),
            settings,
        })
    }
}

pub async fn run(cli: commands::Cli) -> Result<()> {
    let mut state = AppState::open(cli.data_dir, cli.vault)?;
    commands::execute(&mut state, cli.command).await
}
