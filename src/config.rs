use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::{Companion, EntryKind, SidebarEntry, Theme, default_catalog};

/// 定时参数（毫秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub sun_rise_ms: u64,
    pub reveal_cards_ms: u64,
    pub reply_delay_ms: u64,
    pub breath_half_period_ms: u64,
    pub frame_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            sun_rise_ms: 100,
            reveal_cards_ms: 2000,
            reply_delay_ms: 1200,
            breath_half_period_ms: 5000,
            frame_ms: 50,
        }
    }
}

impl Timing {
    pub fn sun_rise(&self) -> Duration {
        Duration::from_millis(self.sun_rise_ms)
    }

    pub fn reveal_cards(&self) -> Duration {
        Duration::from_millis(self.reveal_cards_ms)
    }

    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }

    pub fn breath_half_period(&self) -> Duration {
        Duration::from_millis(self.breath_half_period_ms)
    }

    pub fn frame(&self) -> Duration {
        Duration::from_millis(self.frame_ms.max(1))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Appearance {
    pub theme: Theme,
}

/// 侧边栏预置条目，时间格式 "HH:MM"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySeed {
    pub label: String,
    pub at: String,
    #[serde(default)]
    pub kind: EntryKind,
}

/// config.toml 文件结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub appearance: Appearance,
    #[serde(default = "default_catalog")]
    pub companions: Vec<Companion>,
    #[serde(default = "default_history")]
    pub history: Vec<HistorySeed>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timing: Timing::default(),
            appearance: Appearance::default(),
            companions: default_catalog(),
            history: default_history(),
        }
    }
}

fn default_history() -> Vec<HistorySeed> {
    [
        ("Morning Reflection", "10:00", EntryKind::Chat),
        ("Stress Relief Talk", "00:00", EntryKind::Chat),
        ("Focus Session", "00:00", EntryKind::Focus),
    ]
    .into_iter()
    .map(|(label, at, kind)| HistorySeed {
        label: label.to_string(),
        at: at.to_string(),
        kind,
    })
    .collect()
}

impl Config {
    /// 解析 TOML 字符串并校验
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timing;
        if t.reveal_cards_ms <= t.sun_rise_ms {
            return Err(ConfigError::Invalid(format!(
                "timing.reveal_cards_ms ({}) must be greater than timing.sun_rise_ms ({})",
                t.reveal_cards_ms, t.sun_rise_ms
            )));
        }
        if t.breath_half_period_ms == 0 {
            return Err(ConfigError::Invalid(
                "timing.breath_half_period_ms must be positive".to_string(),
            ));
        }
        if self.companions.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one companion is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for companion in &self.companions {
            if companion.id.trim().is_empty() {
                return Err(ConfigError::Invalid("companion id is empty".to_string()));
            }
            if !seen.insert(companion.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate companion id `{}`",
                    companion.id
                )));
            }
        }

        for seed in &self.history {
            parse_time(&seed.at)?;
        }
        Ok(())
    }

    /// 预置的侧边栏历史
    pub fn history_entries(&self) -> Result<Vec<SidebarEntry>, ConfigError> {
        self.history
            .iter()
            .map(|seed| -> Result<SidebarEntry, ConfigError> {
                Ok(SidebarEntry::new(seed.label.clone(), parse_time(&seed.at)?, seed.kind))
            })
            .collect()
    }
}

fn parse_time(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|e| ConfigError::Invalid(format!("bad history time `{value}`: {e}")))
}

/// 配置文件路径 (~/.config/solace/config.toml)，可用 SOLACE_CONFIG 覆盖
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("SOLACE_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("solace").join("config.toml"))
}

/// 从文件加载配置，文件不存在时使用默认值
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Config::from_toml(&content, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<Config, ConfigError> {
        Config::from_toml(content, Path::new("config.toml"))
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.timing.reply_delay(), Duration::from_millis(1200));
        assert_eq!(config.history_entries().unwrap().len(), 3);
    }

    #[test]
    fn test_default_history_times() {
        let labels: Vec<String> = Config::default()
            .history_entries()
            .unwrap()
            .iter()
            .map(|e| e.time_label())
            .collect();
        assert_eq!(labels, ["10 am", "12 am", "12 am"]);
    }

    #[test]
    fn test_partial_timing_and_theme() {
        let config = parse(
            r#"
            [timing]
            reply_delay_ms = 300

            [appearance]
            theme = "dark"
            "#,
        )
        .unwrap();
        assert_eq!(config.timing.reply_delay_ms, 300);
        assert_eq!(config.timing.sun_rise_ms, 100);
        assert_eq!(config.appearance.theme, Theme::Dark);
    }

    #[test]
    fn test_custom_catalog() {
        let config = parse(
            r##"
            [[companions]]
            id = "pip"
            display_name = "Pip"
            theme_accent = "#FFCC00"
            "##,
        )
        .unwrap();
        assert_eq!(config.companions.len(), 1);
        assert_eq!(config.companions[0].display_name, "Pip");
        assert!(config.companions[0].greeting.is_empty());
    }

    #[test]
    fn test_reveal_must_follow_sun_rise() {
        let err = parse("[timing]\nsun_rise_ms = 3000\nreveal_cards_ms = 2000\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_duplicate_companion_rejected() {
        let err = parse(
            r##"
            [[companions]]
            id = "pip"
            display_name = "Pip"
            theme_accent = "#FFCC00"

            [[companions]]
            id = "pip"
            display_name = "Pip Again"
            theme_accent = "#FFCC00"
            "##,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate companion id `pip`"));
    }

    #[test]
    fn test_bad_history_time_rejected() {
        let err = parse("[[history]]\nlabel = \"x\"\nat = \"ten\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = parse("[timing\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_defaults() {
        let config = load_config(Path::new("/nonexistent/solace/config.toml")).unwrap();
        assert_eq!(config.companions, default_catalog());
    }
}
