use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use tracing::debug;

use crate::chatbot::DEFAULT_MODEL;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Root of the static content tree (`data/`, `blogs/`, `locales/`).
    pub content_dir: PathBuf,
    /// sqlx URL; empty means the SQLite file in the user data directory.
    pub database_url: Option<String>,
    /// Language used when no preference has been saved.
    pub language: Option<String>,
    pub leaderboard: LeaderboardConfig,
    pub chatbot: ChatbotConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LeaderboardConfig {
    pub owner: String,
    pub repo: String,
    pub token: Option<String>,
    pub ttl_secs: i64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatbotConfig {
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("content"),
            database_url: None,
            language: None,
            leaderboard: LeaderboardConfig::default(),
            chatbot: ChatbotConfig::default(),
        }
    }
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            owner: "chandansgowda".to_string(),
            repo: "engineering-in-kannada".to_string(),
            token: None,
            ttl_secs: 60 * 60,
        }
    }
}

impl Default for ChatbotConfig {
    fn default() -> Self { Self { api_key: None, model: DEFAULT_MODEL.to_string() } }
}

impl Config {
    /// Read `path` if given, else the platform config file if it exists, else
    /// defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };
        let mut cfg = match file {
            Some(p) => {
                let text = std::fs::read_to_string(&p).with_context(|| format!("reading config {}", p.display()))?;
                debug!(path = %p.display(), "loaded config");
                Self::from_toml(&text).with_context(|| format!("parsing config {}", p.display()))?
            }
            None => Self::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    pub fn from_toml(text: &str) -> Result<Self> { Ok(toml::from_str(text)?) }

    /// `CATALOG_*` overrides. Unparseable numbers are ignored.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("CATALOG_CONTENT_DIR") { self.content_dir = PathBuf::from(v); }
        if let Some(v) = var("CATALOG_DATABASE_URL") { self.database_url = Some(v); }
        if let Some(v) = var("CATALOG_LANGUAGE") { self.language = Some(v); }
        if let Some(v) = var("CATALOG_GITHUB_TOKEN") { self.leaderboard.token = Some(v); }
        if let Some(v) = var("CATALOG_GEMINI_API_KEY") { self.chatbot.api_key = Some(v); }
        if let Some(v) = var("CATALOG_LEADERBOARD_TTL_SECS").and_then(|s| s.parse().ok()) { self.leaderboard.ttl_secs = v; }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "course-catalog", "course-catalog").map(|p| p.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = Config::from_toml(
            r#"
            content_dir = "/srv/content"
            [leaderboard]
            ttl_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(cfg.content_dir, PathBuf::from("/srv/content"));
        assert_eq!(cfg.leaderboard.ttl_secs, 30);
        assert_eq!(cfg.leaderboard.repo, "engineering-in-kannada");
        assert_eq!(cfg.chatbot.model, DEFAULT_MODEL);
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CATALOG_GITHUB_TOKEN", "ghp_x"),
            ("CATALOG_LEADERBOARD_TTL_SECS", "nope"),
            ("CATALOG_LANGUAGE", "kn"),
        ]);
        let mut cfg = Config::default();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.leaderboard.token.as_deref(), Some("ghp_x"));
        assert_eq!(cfg.leaderboard.ttl_secs, 3600);
        assert_eq!(cfg.language.as_deref(), Some("kn"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        assert!(Config::load(Some(Path::new("/definitely/not/here.toml"))).is_err());
    }
}
