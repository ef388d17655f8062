use chrono::NaiveDateTime;
use serde::Serialize;

use crate::schedule::model::{ScheduleConfig, ScheduleMode};
use crate::time_of_day::TimeOfDay;
use crate::wake_lock::WakeLockState;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct MatchState {
    pub has_fired: bool,
}

impl MatchState {
    pub fn reset(&mut self) {
        self.has_fired = false;
    }
}

/// Everything the page kept in component state, owned by the coordinator
/// and lent to each component per call.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SessionState {
    pub mode: ScheduleMode,
    pub default_time: TimeOfDay,
    pub custom_time: TimeOfDay,
    pub match_state: MatchState,
    pub is_playing: bool,
    pub is_visible: bool,
}

impl SessionState {
    pub fn new(default_time: TimeOfDay, custom_time: TimeOfDay, mode: ScheduleMode) -> Self {
        Self {
            mode,
            default_time,
            custom_time,
            match_state: MatchState::default(),
            is_playing: false,
            is_visible: true,
        }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(config.default_time, config.custom_time, config.mode)
    }

    pub fn active_target(&self) -> TimeOfDay {
        match self.mode {
            ScheduleMode::Default => self.default_time,
            ScheduleMode::Custom => self.custom_time,
        }
    }

    /// Returns true when the active target changed.
    pub fn set_mode(&mut self, mode: ScheduleMode) -> bool {
        self.update_target(|session| session.mode = mode)
    }

    /// Returns true when the active target changed.
    pub fn set_custom_time(&mut self, time: TimeOfDay) -> bool {
        self.update_target(|session| session.custom_time = time)
    }

    fn update_target(&mut self, change: impl FnOnce(&mut Self)) -> bool {
        let before = self.active_target();
        change(self);
        let changed = self.active_target() != before;
        if changed {
            self.match_state.reset();
        }
        changed
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub now: String,
    pub target: TimeOfDay,
    pub mode: ScheduleMode,
    pub custom_time: TimeOfDay,
    pub has_fired: bool,
    pub is_playing: bool,
    pub is_visible: bool,
    pub wake_lock: WakeLockState,
    pub seconds_until_trigger: i64,
}

impl SessionSnapshot {
    pub fn capture(session: &SessionState, now: NaiveDateTime, wake_lock: WakeLockState) -> Self {
        let target = session.active_target();
        Self {
            now: now.format("%H:%M:%S").to_string(),
            target,
            mode: session.mode,
            custom_time: session.custom_time,
            has_fired: session.match_state.has_fired,
            is_playing: session.is_playing,
            is_visible: session.is_visible,
            wake_lock,
            seconds_until_trigger: target.seconds_until(now.time()),
        }
    }

    pub fn summary_line(&self) -> String {
        let playing = if self.is_playing { "playing" } else { "stopped" };
        let visibility = if self.is_visible {
            String::new()
        } else {
            " | inactive".to_string()
        };
        format!(
            "{} | target {} ({}) | next in {}s | {} | wake lock {}{}",
            self.now,
            self.target,
            self.mode,
            self.seconds_until_trigger,
            playing,
            self.wake_lock,
            visibility
        )
    }
}
