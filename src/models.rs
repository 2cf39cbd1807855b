use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 伙伴目录条目（只读）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Companion {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_ref: String,
    #[serde(default)]
    pub media_ref: String,
    pub theme_accent: String,
    #[serde(default)]
    pub greeting: String,
}

impl Companion {
    /// 开场白，未配置时按名字生成
    pub fn greeting_text(&self) -> String {
        if self.greeting.trim().is_empty() {
            format!("Hi, I'm {}. How are you feeling today?", self.display_name)
        } else {
            self.greeting.clone()
        }
    }
}

/// 默认目录：两只猫
pub fn default_catalog() -> Vec<Companion> {
    vec![
        Companion {
            id: "mochi".to_string(),
            display_name: "Mochi".to_string(),
            avatar_ref: "/cat1.png".to_string(),
            media_ref: "/cat1-meditation.png".to_string(),
            theme_accent: "#E8C6BF".to_string(),
            greeting: "Mrrp! I'm Mochi. Curl up here and tell me about your day.".to_string(),
        },
        Companion {
            id: "biscuit".to_string(),
            display_name: "Biscuit".to_string(),
            avatar_ref: "/cat2.png".to_string(),
            media_ref: "/cat2-meditation.png".to_string(),
            theme_accent: "#B6C2D6".to_string(),
            greeting: "Hello, friend. I'm Biscuit. What's on your mind?".to_string(),
        },
    ]
}

pub type MessageId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Companion,
}

/// 对话记录中的一条消息
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    pub sent_at: DateTime<Local>,
}

impl Message {
    pub fn new(id: MessageId, text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id,
            text: text.into(),
            sender,
            sent_at: Local::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn flipped(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// 呼吸练习的两个阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreathPhase {
    In,
    Out,
}

impl BreathPhase {
    /// 根据进入练习后经过的时间计算当前阶段，总是从 In 开始
    pub fn at(elapsed: Duration, half_period: Duration) -> Self {
        let half = half_period.as_millis();
        if half == 0 || (elapsed.as_millis() / half) % 2 == 0 {
            BreathPhase::In
        } else {
            BreathPhase::Out
        }
    }

    /// 当前阶段已完成的比例 (0.0..1.0)
    pub fn progress(elapsed: Duration, half_period: Duration) -> f64 {
        let half = half_period.as_millis();
        if half == 0 {
            return 0.0;
        }
        (elapsed.as_millis() % half) as f64 / half as f64
    }

    pub fn label(self) -> &'static str {
        match self {
            BreathPhase::In => "Breathe In",
            BreathPhase::Out => "Breathe Out",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    Chat,
    Focus,
}

/// 侧边栏中的历史会话
#[derive(Debug, Clone, PartialEq)]
pub struct SidebarEntry {
    pub id: Uuid,
    pub label: String,
    pub at: NaiveTime,
    pub kind: EntryKind,
}

impl SidebarEntry {
    pub fn new(label: impl Into<String>, at: NaiveTime, kind: EntryKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            at,
            kind,
        }
    }

    /// 侧边栏显示的时间，例如 "10 am"
    pub fn time_label(&self) -> String {
        self.at.format("%-I %P").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breath_phase_starts_breathing_in() {
        let half = Duration::from_millis(5000);
        assert_eq!(BreathPhase::at(Duration::ZERO, half), BreathPhase::In);
        assert_eq!(BreathPhase::at(Duration::from_millis(4999), half), BreathPhase::In);
        assert_eq!(BreathPhase::at(Duration::from_millis(5000), half), BreathPhase::Out);
        assert_eq!(BreathPhase::at(Duration::from_millis(10_000), half), BreathPhase::In);
        assert_eq!(BreathPhase::In.label(), "Breathe In");
        assert_eq!(BreathPhase::Out.label(), "Breathe Out");
    }

    #[test]
    fn test_breath_progress() {
        let half = Duration::from_millis(5000);
        assert_eq!(BreathPhase::progress(Duration::from_millis(2500), half), 0.5);
        assert_eq!(BreathPhase::progress(Duration::from_millis(7500), half), 0.5);
        assert_eq!(BreathPhase::progress(Duration::from_millis(1), Duration::ZERO), 0.0);
    }

    #[test]
    fn test_greeting_fallback() {
        let mut cat = default_catalog().remove(0);
        assert!(cat.greeting_text().starts_with("Mrrp"));
        cat.greeting = "  ".to_string();
        assert_eq!(cat.greeting_text(), "Hi, I'm Mochi. How are you feeling today?");
    }

    #[test]
    fn test_default_catalog_ids_unique() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 2);
        assert_ne!(catalog[0].id, catalog[1].id);
    }

    #[test]
    fn test_sidebar_time_label() {
        let at = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let entry = SidebarEntry::new("Morning Reflection", at, EntryKind::Chat);
        assert_eq!(entry.time_label(), "10 am");
        assert_eq!(Theme::Light.flipped(), Theme::Dark);
    }
}
