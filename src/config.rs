use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_API_BASE;
use crate::model::{CefrLevel, FilterSet, SpeechSpeed};

const DEFAULT_ENV_PREFIX: &str = "LINGOFEED";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub exercises: ExerciseConfig,
    #[serde(default)]
    pub filters: FilterSet,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Defaults to `forms_index.json` under `base_url`.
    #[serde(default)]
    pub word_index_url: Option<String>,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            word_index_url: None,
            timeout: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl ApiConfig {
    pub fn word_index_url(&self) -> String {
        self.word_index_url
            .clone()
            .unwrap_or_else(|| format!("{}/forms_index.json", self.base_url.trim_end_matches('/')))
    }
}

fn default_base_url() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_user_agent() -> String {
    format!("lingofeed/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_load_more_threshold")]
    pub load_more_threshold: usize,
    #[serde(default = "default_activation_ratio")]
    pub activation_ratio: f64,
    #[serde(default = "default_subtitle_grace")]
    pub subtitle_grace: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            load_more_threshold: default_load_more_threshold(),
            activation_ratio: default_activation_ratio(),
            subtitle_grace: default_subtitle_grace(),
        }
    }
}

fn default_page_size() -> usize {
    20
}

fn default_load_more_threshold() -> usize {
    3
}

fn default_activation_ratio() -> f64 {
    crate::tracker::ACTIVATION_RATIO
}

fn default_subtitle_grace() -> f64 {
    crate::transcript::DEFAULT_GRACE
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExerciseConfig {
    #[serde(default = "default_word_limit")]
    pub word_limit: usize,
    #[serde(default = "default_exercise_limit")]
    pub exercise_limit: usize,
    #[serde(default = "default_advance_delay", with = "humantime_serde")]
    pub advance_delay: Duration,
    /// How far back from the playback position on-screen subtitles count.
    #[serde(default = "default_window", with = "humantime_serde")]
    pub window: Duration,
}

impl Default for ExerciseConfig {
    fn default() -> Self {
        Self {
            word_limit: default_word_limit(),
            exercise_limit: default_exercise_limit(),
            advance_delay: default_advance_delay(),
            window: default_window(),
        }
    }
}

fn default_word_limit() -> usize {
    crate::exercise::DEFAULT_WORD_LIMIT
}

fn default_exercise_limit() -> usize {
    10
}

fn default_advance_delay() -> Duration {
    crate::exercise::DEFAULT_ADVANCE_DELAY
}

fn default_window() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = match options.config_file.clone().or_else(default_config_path) {
        Some(path) if path.exists() => read_config_file(&path)?,
        _ => Config::default(),
    };

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);
    validate(&cfg)?;

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn validate(cfg: &Config) -> Result<()> {
    anyhow::ensure!(!cfg.api.base_url.trim().is_empty(), "config: api.base_url is required");
    anyhow::ensure!(cfg.feed.page_size > 0, "config: feed.page_size must be positive");
    anyhow::ensure!(
        (0.0..=1.0).contains(&cfg.feed.activation_ratio),
        "config: feed.activation_ratio must be between 0 and 1"
    );
    anyhow::ensure!(
        cfg.feed.subtitle_grace >= 0.0,
        "config: feed.subtitle_grace must not be negative"
    );
    Ok(())
}

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
        "api.base_url" => cfg.api.base_url = value,
        "api.word_index_url" => cfg.api.word_index_url = Some(value).filter(|v| !v.is_empty()),
        "api.user_agent" => cfg.api.user_agent = value,
        "api.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.api.timeout = duration;
            }
        }
        "feed.page_size" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.feed.page_size = parsed;
            }
        }
        "feed.load_more_threshold" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.feed.load_more_threshold = parsed;
            }
        }
        "feed.activation_ratio" => {
            if let Ok(parsed) = value.parse::<f64>() {
                cfg.feed.activation_ratio = parsed;
            }
        }
        "feed.subtitle_grace" => {
            if let Ok(parsed) = value.parse::<f64>() {
                cfg.feed.subtitle_grace = parsed;
            }
        }
        "exercises.word_limit" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.exercises.word_limit = parsed;
            }
        }
        "exercises.exercise_limit" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.exercises.exercise_limit = parsed;
            }
        }
        "exercises.advance_delay" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.exercises.advance_delay = duration;
            }
        }
        "exercises.window" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.exercises.window = duration;
            }
        }
        "filters.cefr_levels" => {
            let levels: Vec<CefrLevel> = value.split(',').filter_map(CefrLevel::parse).collect();
            cfg.filters.cefr_levels = Some(levels).filter(|l| !l.is_empty());
        }
        "filters.speech_speeds" => {
            let speeds: Vec<SpeechSpeed> =
                value.split(',').filter_map(SpeechSpeed::parse).collect();
            cfg.filters.speech_speeds = Some(speeds).filter(|s| !s.is_empty());
        }
        "filters.show_english_subtitles" => cfg.filters.show_english_subtitles = parse_flag(&value),
        "filters.show_russian_subtitles" => cfg.filters.show_russian_subtitles = parse_flag(&value),
        "filters.show_adult_content" => cfg.filters.show_adult_content = parse_flag(&value),
        _ => {}
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "True" | "yes")
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lingofeed").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    #[test]
    fn load_defaults_without_files() {
        let dir = tempdir().unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(dir.path().join("missing.yaml")),
            env_prefix: Some("LINGOFEED_TEST_DEFAULTS".into()),
        })
        .unwrap();
        assert_eq!(cfg.feed.page_size, 20);
        assert_eq!(cfg.feed.load_more_threshold, 3);
        assert_eq!(cfg.exercises.advance_delay, Duration::from_millis(1200));
        assert_eq!(
            cfg.api.word_index_url(),
            format!("{DEFAULT_API_BASE}/forms_index.json")
        );
    }

    #[test]
    fn file_values_and_humantime_durations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            concat!(
                "api:\n  base_url: http://localhost:3000/api\n  timeout: 5s\n",
                "feed:\n  page_size: 10\n",
                "exercises:\n  advance_delay: 800ms\n",
                "filters:\n  cefr_levels: [B1, B2]\n",
            ),
        )
        .unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("LINGOFEED_TEST_FILE".into()),
        })
        .unwrap();
        assert_eq!(cfg.api.base_url, "http://localhost:3000/api");
        assert_eq!(cfg.api.timeout, Duration::from_secs(5));
        assert_eq!(cfg.feed.page_size, 10);
        assert_eq!(cfg.feed.load_more_threshold, 3);
        assert_eq!(cfg.exercises.advance_delay, Duration::from_millis(800));
        assert_eq!(
            cfg.filters.cefr_levels,
            Some(vec![CefrLevel::B1, CefrLevel::B2])
        );
    }

    #[test]
    fn env_overrides() {
        env::set_var("LINGOFEED_TEST_ENV_FEED__PAGE_SIZE", "5");
        env::set_var("LINGOFEED_TEST_ENV_FILTERS__CEFR_LEVELS", "a1, c2");
        let dir = tempdir().unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(dir.path().join("missing.yaml")),
            env_prefix: Some("LINGOFEED_TEST_ENV".into()),
        })
        .unwrap();
        assert_eq!(cfg.feed.page_size, 5);
        assert_eq!(cfg.filters.cefr_levels, Some(vec![CefrLevel::A1, CefrLevel::C2]));
        env::remove_var("LINGOFEED_TEST_ENV_FEED__PAGE_SIZE");
        env::remove_var("LINGOFEED_TEST_ENV_FILTERS__CEFR_LEVELS");
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "feed:\n  page_size: 0\n").unwrap();
        let err = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("LINGOFEED_TEST_ZERO".into()),
        })
        .unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }
}
