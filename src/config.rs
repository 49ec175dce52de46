use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::viewport::{
    TrackerConfig, DEFAULT_SCROLL_TIMEOUT, DEFAULT_SETTLE_INTERVAL, DEFAULT_VISIBILITY_THRESHOLD,
};

const DEFAULT_ENV_PREFIX: &str = "REEL_FEED";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub player: PlayerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f64,
    #[serde(default = "default_settle_interval", with = "humantime_serde")]
    pub settle_interval: Duration,
    #[serde(default = "default_scroll_timeout", with = "humantime_serde")]
    pub scroll_timeout: Duration,
    #[serde(default = "default_scroll_step")]
    pub scroll_step: u16,
    #[serde(default = "default_snap")]
    pub snap: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: default_visibility_threshold(),
            settle_interval: default_settle_interval(),
            scroll_timeout: default_scroll_timeout(),
            scroll_step: default_scroll_step(),
            snap: default_snap(),
        }
    }
}

impl FeedConfig {
    /// A threshold of zero would let every reel cross on every observation,
    /// so non-positive values fall back to the default.
    pub fn tracker(&self) -> TrackerConfig {
        let threshold = if self.visibility_threshold > 0.0 {
            self.visibility_threshold.min(1.0)
        } else {
            DEFAULT_VISIBILITY_THRESHOLD
        };
        TrackerConfig {
            visibility_threshold: threshold,
            settle_interval: self.settle_interval,
            scroll_timeout: self.scroll_timeout,
            snap: self.snap,
        }
    }
}

fn default_visibility_threshold() -> f64 {
    DEFAULT_VISIBILITY_THRESHOLD
}

fn default_settle_interval() -> Duration {
    DEFAULT_SETTLE_INTERVAL
}

fn default_scroll_timeout() -> Duration {
    DEFAULT_SCROLL_TIMEOUT
}

fn default_scroll_step() -> u16 {
    3
}

fn default_snap() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    /// Base URL of the reel service. Empty means the built-in catalogue.
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub athlete_id: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            user_agent: default_user_agent(),
            athlete_id: None,
        }
    }
}

fn default_user_agent() -> String {
    format!("reel-feed/{}", crate::VERSION)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_mpv_path")]
    pub mpv_path: String,
    #[serde(default = "default_start_muted")]
    pub start_muted: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mpv_path: default_mpv_path(),
            start_muted: default_start_muted(),
        }
    }
}

fn default_mpv_path() -> String {
    "mpv".into()
}

fn default_start_muted() -> bool {
    true
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if other.feed.visibility_threshold > 0.0 {
        base.feed.visibility_threshold = other.feed.visibility_threshold;
    }
    base.feed.settle_interval = other.feed.settle_interval;
    base.feed.scroll_timeout = other.feed.scroll_timeout;
    if other.feed.scroll_step != 0 {
        base.feed.scroll_step = other.feed.scroll_step;
    }
    base.feed.snap = other.feed.snap;

    if !other.source.base_url.is_empty() {
        base.source.base_url = other.source.base_url;
    }
    if !other.source.user_agent.is_empty() {
        base.source.user_agent = other.source.user_agent;
    }
    if other.source.athlete_id.is_some() {
        base.source.athlete_id = other.source.athlete_id;
    }

    base.player.enabled = other.player.enabled;
    if !other.player.mpv_path.is_empty() {
        base.player.mpv_path = other.player.mpv_path;
    }
    base.player.start_muted = other.player.start_muted;

    base
}

/// Environment values are applied over the file values one key at a time,
/// so an unset variable never resets a file setting.
fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "feed.visibility_threshold" => {
            match value.parse::<f64>() {
                Ok(parsed) if parsed > 0.0 => cfg.feed.visibility_threshold = parsed,
                _ => {}
            }
        }
        "feed.settle_interval" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.feed.settle_interval = duration;
            }
        }
        "feed.scroll_timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.feed.scroll_timeout = duration;
            }
        }
        "feed.scroll_step" => {
            if let Ok(parsed) = value.parse::<u16>() {
                cfg.feed.scroll_step = parsed;
            }
        }
        "feed.snap" => cfg.feed.snap = parse_bool(&value),
        "source.base_url" => cfg.source.base_url = value,
        "source.user_agent" => cfg.source.user_agent = value,
        "source.athlete_id" => {
            let trimmed = value.trim();
            cfg.source.athlete_id = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }
        "player.enabled" => cfg.player.enabled = parse_bool(&value),
        "player.mpv_path" => cfg.player.mpv_path = value,
        "player.start_muted" => cfg.player.start_muted = parse_bool(&value),
        _ => {}
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "True" | "yes")
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("reel-feed").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn isolated() -> LoadOptions {
        LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/reel-feed.yaml")),
            env_prefix: Some("REEL_FEED_TEST_NONE".into()),
        }
    }

    #[test]
    fn load_defaults_without_files() {
        let cfg = load(isolated()).unwrap();
        assert_eq!(cfg.feed.scroll_step, 3);
        assert_eq!(cfg.feed.visibility_threshold, 0.7);
        assert_eq!(cfg.feed.settle_interval, Duration::from_millis(250));
        assert!(cfg.source.base_url.is_empty());
        assert!(!cfg.player.enabled);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "feed:\n  visibility_threshold: 0.5\n  settle_interval: 400ms\nsource:\n  base_url: http://127.0.0.1:3000\nplayer:\n  enabled: true\n",
        )
        .unwrap();

        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("REEL_FEED_TEST_NONE".into()),
        })
        .unwrap();

        assert_eq!(cfg.feed.visibility_threshold, 0.5);
        assert_eq!(cfg.feed.settle_interval, Duration::from_millis(400));
        assert_eq!(cfg.feed.scroll_timeout, DEFAULT_SCROLL_TIMEOUT);
        assert_eq!(cfg.source.base_url, "http://127.0.0.1:3000");
        assert!(cfg.player.enabled);
        assert_eq!(cfg.player.mpv_path, "mpv");
    }

    #[test]
    fn env_overrides() {
        env::set_var("REEL_FEED_TEST_ENV_PLAYER__MPV_PATH", "/opt/mpv/bin/mpv");
        env::set_var("REEL_FEED_TEST_ENV_FEED__SETTLE_INTERVAL", "1s");
        let cfg = load(LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/reel-feed.yaml")),
            env_prefix: Some("REEL_FEED_TEST_ENV".into()),
        })
        .unwrap();
        assert_eq!(cfg.player.mpv_path, "/opt/mpv/bin/mpv");
        assert_eq!(cfg.feed.settle_interval, Duration::from_secs(1));
        env::remove_var("REEL_FEED_TEST_ENV_PLAYER__MPV_PATH");
        env::remove_var("REEL_FEED_TEST_ENV_FEED__SETTLE_INTERVAL");
    }

    #[test]
    fn tracker_config_clamps_threshold() {
        let feed = FeedConfig {
            visibility_threshold: 1.4,
            ..FeedConfig::default()
        };
        assert_eq!(feed.tracker().visibility_threshold, 1.0);
    }

    #[test]
    fn non_positive_threshold_falls_back_to_default() {
        for value in [0.0, -0.3, f64::NAN] {
            let feed = FeedConfig {
                visibility_threshold: value,
                ..FeedConfig::default()
            };
            assert_eq!(
                feed.tracker().visibility_threshold,
                DEFAULT_VISIBILITY_THRESHOLD
            );
        }
    }

    #[test]
    fn env_rejects_zero_threshold() {
        env::set_var("REEL_FEED_TEST_ZERO_FEED__VISIBILITY_THRESHOLD", "0");
        let cfg = load(LoadOptions {
            config_file: Some(PathBuf::from("/nonexistent/reel-feed.yaml")),
            env_prefix: Some("REEL_FEED_TEST_ZERO".into()),
        })
        .unwrap();
        env::remove_var("REEL_FEED_TEST_ZERO_FEED__VISIBILITY_THRESHOLD");
        assert_eq!(cfg.feed.visibility_threshold, DEFAULT_VISIBILITY_THRESHOLD);
    }
}
