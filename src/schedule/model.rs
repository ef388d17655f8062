use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::platform::{Notice, NotificationPermission};
use crate::repeat::RepeatTiming;
use crate::time_of_day::TimeOfDay;

pub const DEFAULT_PLAY_TIME: TimeOfDay = TimeOfDay::new(10, 0);
pub const INITIAL_CUSTOM_TIME: TimeOfDay = TimeOfDay::new(9, 55);
pub const DEFAULT_AUDIO_FILE: &str = "music.mp3";
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMode {
    #[default]
    Default,
    Custom,
}

impl ScheduleMode {
    pub fn toggled(self) -> Self {
        match self {
            ScheduleMode::Default => ScheduleMode::Custom,
            ScheduleMode::Custom => ScheduleMode::Default,
        }
    }
}

impl fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleMode::Default => f.write_str("default"),
            ScheduleMode::Custom => f.write_str("custom"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub default_time: TimeOfDay,
    pub custom_time: TimeOfDay,
    pub mode: ScheduleMode,
    pub audio: PathBuf,
    pub retry_delay: Duration,
    pub repeat: RepeatTiming,
    pub notification: NotificationSettings,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            default_time: DEFAULT_PLAY_TIME,
            custom_time: INITIAL_CUSTOM_TIME,
            mode: ScheduleMode::Default,
            audio: PathBuf::from(DEFAULT_AUDIO_FILE),
            retry_delay: DEFAULT_RETRY_DELAY,
            repeat: RepeatTiming::default(),
            notification: NotificationSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NotificationSettings {
    pub permission: NotificationPermission,
    pub notice: Notice,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            permission: NotificationPermission::Default,
            notice: Notice {
                title: default_notice_title(),
                body: default_notice_body(),
                icon: default_notice_icon(),
            },
        }
    }
}

pub fn load_schedule_config(path: &Path) -> Result<ScheduleConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config file {}", path.display()))?;
    parse_schedule_config_text(&content)
}

pub fn parse_schedule_config_text(content: &str) -> Result<ScheduleConfig> {
    let raw = serde_json::from_str::<ScheduleConfigFile>(content).map_err(|err| {
        let line = err.line();
        let column = err.column();
        anyhow::anyhow!("invalid JSON at line {line}, column {column}: {err}")
    })?;

    if raw.version != 1 {
        bail!(
            "unsupported config version {}; expected version 1",
            raw.version
        );
    }
    if raw.retry_delay_ms == 0 {
        bail!("retry_delay_ms must be greater than zero");
    }
    if raw.repeat.interval_ms == 0 {
        bail!("repeat.interval_ms must be greater than zero");
    }

    let defaults = ScheduleConfig::default();
    Ok(ScheduleConfig {
        default_time: raw
            .default_time
            .as_deref()
            .map(TimeOfDay::parse_lenient)
            .unwrap_or(defaults.default_time),
        custom_time: raw
            .custom_time
            .as_deref()
            .map(TimeOfDay::parse_lenient)
            .unwrap_or(defaults.custom_time),
        mode: raw.mode,
        audio: raw.audio.unwrap_or(defaults.audio),
        retry_delay: Duration::from_millis(raw.retry_delay_ms),
        repeat: RepeatTiming {
            arm_delay: Duration::from_millis(raw.repeat.delay_ms),
            interval: Duration::from_millis(raw.repeat.interval_ms),
        },
        notification: NotificationSettings {
            permission: raw.notification.permission,
            notice: Notice {
                title: raw.notification.title,
                body: raw.notification.body,
                icon: raw.notification.icon,
            },
        },
    })
}

#[derive(Debug, Deserialize)]
struct ScheduleConfigFile {
    version: u32,
    #[serde(default)]
    default_time: Option<String>,
    #[serde(default)]
    custom_time: Option<String>,
    #[serde(default)]
    mode: ScheduleMode,
    #[serde(default)]
    audio: Option<PathBuf>,
    #[serde(default = "default_retry_delay_ms")]
    retry_delay_ms: u64,
    #[serde(default)]
    repeat: RepeatFile,
    #[serde(default)]
    notification: NotificationFile,
}

#[derive(Debug, Deserialize)]
struct RepeatFile {
    #[serde(default = "default_repeat_delay_ms")]
    delay_ms: u64,
    #[serde(default = "default_repeat_interval_ms")]
    interval_ms: u64,
}

impl Default for RepeatFile {
    fn default() -> Self {
        Self {
            delay_ms: default_repeat_delay_ms(),
            interval_ms: default_repeat_interval_ms(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NotificationFile {
    #[serde(default)]
    permission: NotificationPermission,
    #[serde(default = "default_notice_title")]
    title: String,
    #[serde(default = "default_notice_body")]
    body: String,
    #[serde(default = "default_notice_icon")]
    icon: String,
}

impl Default for NotificationFile {
    fn default() -> Self {
        Self {
            permission: NotificationPermission::Default,
            title: default_notice_title(),
            body: default_notice_body(),
            icon: default_notice_icon(),
        }
    }
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY.as_millis() as u64
}

fn default_repeat_delay_ms() -> u64 {
    RepeatTiming::default().arm_delay.as_millis() as u64
}

fn default_repeat_interval_ms() -> u64 {
    RepeatTiming::default().interval.as_millis() as u64
}

fn default_notice_title() -> String {
    "Music playing".to_string()
}

fn default_notice_body() -> String {
    "Scheduled audio has started".to_string()
}

fn default_notice_icon() -> String {
    "audio-x-generic".to_string()
}
