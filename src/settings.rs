use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

pub const DEFAULT_WIKI_BASE: &str = "https://battlefordreamisland.fandom.com/wiki";
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Runtime settings: built-in defaults, then `scraper.toml`, then
/// `TRANSCRIPTS_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub wiki_base: String,
    pub db_path: PathBuf,
    /// Saved page snapshots checked before fetching.
    pub html_dir: PathBuf,
    /// Replaces the built-in episode list when set.
    pub catalog_path: Option<PathBuf>,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub min_body_bytes: usize,
    pub min_render_bytes: usize,
    pub backoff_step_ms: u64,
    pub retry_jitter_min_ms: u64,
    pub retry_jitter_max_ms: u64,
    pub episode_delay_ms: u64,
    pub episode_jitter_min_ms: u64,
    pub episode_jitter_max_ms: u64,
    #[serde(default)]
    pub extra_speakers: Vec<String>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::builder()?
            .add_source(File::with_name("scraper").required(false))
            .add_source(
                Environment::with_prefix("TRANSCRIPTS")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("extra_speakers"),
            )
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            .set_default("wiki_base", DEFAULT_WIKI_BASE)?
            .set_default("db_path", "data/transcripts.sqlite")?
            .set_default("html_dir", "html")?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .set_default("timeout_secs", 30)?
            .set_default("max_retries", 5)?
            .set_default("min_body_bytes", 4000)?
            .set_default("min_render_bytes", 2000)?
            .set_default("backoff_step_ms", 5000)?
            .set_default("retry_jitter_min_ms", 1000)?
            .set_default("retry_jitter_max_ms", 3000)?
            .set_default("episode_delay_ms", 4000)?
            .set_default("episode_jitter_min_ms", 1000)?
            .set_default("episode_jitter_max_ms", 3000)?
            .set_default("extra_speakers", Vec::<String>::new())?)
    }

    /// Defaults only, ignoring files and environment.
    #[cfg(test)]
    pub fn defaults() -> Result<Self> {
        Self::builder()?
            .build()
            .context("Failed to build default settings")?
            .try_deserialize()
            .context("Invalid default settings")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_source_tolerances() {
        let s = Settings::defaults().unwrap();
        assert_eq!(s.wiki_base, DEFAULT_WIKI_BASE);
        assert_eq!(s.max_retries, 5);
        assert_eq!(s.min_body_bytes, 4000);
        assert_eq!(s.min_render_bytes, 2000);
        assert_eq!(s.episode_delay_ms, 4000);
        assert!(s.catalog_path.is_none());
        assert!(s.extra_speakers.is_empty());
    }
}
