use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use crate::codec::StoreSchema;
use crate::store::{get_default_store_path, SearchStore};

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

const SETUP_HELP: &str = "To fix this, create ~/.config/trendtracker/.env with:\n  \
    TAVILY_API_KEY=your_key_here\n  \
    GEMINI_API_KEY=your_key_here\n\n\
    Get a Tavily API key from: https://tavily.com/\n\
    Get a Gemini API key from: https://aistudio.google.com/";

/// Where and how search history is stored
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub csv_path: PathBuf,
    pub schema: StoreSchema,
}

impl StoreConfig {
    /// Read `CSV_PATH` and `TREND_STORE_EXTENDED`. Needs no API keys.
    pub fn from_env() -> Result<Self> {
        try_load_dotenv();

        let csv_path = match env::var("CSV_PATH") {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path.trim()),
            _ => get_default_store_path()?,
        };

        let schema = match env::var("TREND_STORE_EXTENDED") {
            Ok(value) if parse_flag(&value) => StoreSchema::Extended,
            _ => StoreSchema::Standard,
        };

        Ok(Self { csv_path, schema })
    }

    pub fn open(&self) -> SearchStore {
        SearchStore::new(&self.csv_path).with_schema(self.schema)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub tavily_api_key: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    /// Domain allowlist for searches; empty means no restriction
    pub search_domains: Vec<String>,
    pub store: StoreConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let store = StoreConfig::from_env()?;

        let tavily_api_key = required_var("TAVILY_API_KEY")?;
        let gemini_api_key = required_var("GEMINI_API_KEY")?;

        let gemini_model = env::var("GEMINI_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

        let search_domains = env::var("SEARCH_DOMAINS")
            .map(|raw| parse_domains(&raw))
            .unwrap_or_default();

        Ok(Self {
            tavily_api_key,
            gemini_api_key,
            gemini_model,
            search_domains,
            store,
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("{} not found.\n\n{}", name, SETUP_HELP))
}

fn parse_domains(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// `.env` files searched in order; the first one that loads wins
fn dotenv_candidates() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(".env")];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("trendtracker").join(".env"));
    }
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".env"));
    }
    paths
}

/// Variables already set in the environment are never overridden
fn try_load_dotenv() {
    for path in dotenv_candidates() {
        if path.is_file() && dotenvy::from_path(&path).is_ok() {
            tracing::debug!(path = %path.display(), "Loaded environment file");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_domains() {
        assert_eq!(
            parse_domains(" bbc.com, ,reuters.com ,"),
            vec!["bbc.com".to_string(), "reuters.com".to_string()]
        );
        assert!(parse_domains("").is_empty());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag(" TRUE "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("nope"));
    }
}
