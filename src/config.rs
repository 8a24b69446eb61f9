//! Configuration management for speed-reader-rs.
//!
//! Loads config from YAML files in standard locations. Every section falls
//! back to its defaults, so a partial or missing file is fine.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// evdev key name that opens and closes the reader.
    pub activate: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            activate: "KEY_F3".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub min_wpm: u32,
    pub max_wpm: u32,
    pub speed_step: u32,
    pub settings_path: Option<PathBuf>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            min_wpm: 50,
            max_wpm: 1500,
            speed_step: 25,
            settings_path: None,
        }
    }
}

impl ReaderConfig {
    /// Where the persisted reading speed lives.
    pub fn settings_path(&self) -> PathBuf {
        self.settings_path.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .map(|d| d.join("speed-reader"))
                .unwrap_or_else(|| PathBuf::from("."))
                .join("settings.json")
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub host: String,
    pub model: String,
    pub api_key_env: String,
    pub credentials_file: Option<PathBuf>,
    pub max_input_chars: usize,
    pub timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            host: "https://api.openai.com".into(),
            model: "gpt-4o-mini".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            credentials_file: None,
            max_input_chars: 6000,
            timeout_secs: 30,
        }
    }
}

impl SummarizerConfig {
    pub fn credentials_path(&self) -> Option<PathBuf> {
        self.credentials_file
            .clone()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config/speed-reader/credentials.env")))
    }

    /// Resolve the provider key: environment first, then the credential file.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Ok(key) = std::env::var(&self.api_key_env) {
            if !key.trim().is_empty() {
                return Some(key.trim().to_string());
            }
        }

        let path = self.credentials_path()?;
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                debug!("No credential file at {}: {e}", path.display());
                return None;
            }
        };
        lookup_credential(&contents, &self.api_key_env)
    }
}

/// Find `name` in `KEY=VALUE` lines. Blank values count as absent.
fn lookup_credential(contents: &str, name: &str) -> Option<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            line.split_once('=')
        })
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub notifications: bool,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            notifications: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hotkey: HotkeyConfig,
    pub reader: ReaderConfig,
    pub summarizer: SummarizerConfig,
    pub feedback: FeedbackConfig,
}

impl Config {
    /// Load configuration from YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. ~/.config/speed-reader/config.yaml
    /// 3. /etc/speed-reader/config.yaml
    pub fn load(path: Option<&Path>) -> Self {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("config.yaml")),
                dirs::home_dir().map(|h| h.join(".config/speed-reader/config.yaml")),
                Some(PathBuf::from("/etc/speed-reader/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", config_path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", config_path.display());
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(contents)
    }
}
