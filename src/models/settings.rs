use serde::{Deserialize, Serialize};
use super::score::ScoringProfile;

pub const DEFAULT_VAULT_FILE: &str = "investment_vault_2026.json";
pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_vault_path")]
    pub vault_path: String,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_base_url")]
    pub yahoo_base_url: String,
    #[serde(default)]
    pub profile: ScoringProfile,
}

fn default_vault_path() -> String { DEFAULT_VAULT_FILE.to_string() }
fn default_cache_ttl() -> u64 { 300 }
fn default_request_delay() -> u64 { 600 }
fn default_timeout() -> u64 { 10 }
fn default_base_url() -> String { DEFAULT_YAHOO_BASE_URL.to_string() }

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            vault_path: default_vault_path(),
            cache_ttl_secs: 300,
            request_delay_ms: 600,
            timeout_secs: 10,
            yahoo_base_url: default_base_url(),
            profile: ScoringProfile::default(),
        }
    }
}
