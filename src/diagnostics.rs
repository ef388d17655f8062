use crate::schedule::model::ScheduleConfig;
use crate::session::SessionState;
use crate::time_provider::SelectedTimeProvider;

/// Startup report for `--diagnostics`. Nothing here touches audio output or
/// takes a wake lock.
pub struct DiagnosticsReport {
    lines: Vec<String>,
}

impl DiagnosticsReport {
    pub fn collect(
        config: &ScheduleConfig,
        clock: &SelectedTimeProvider,
        media_backend: &str,
        wake_lock_available: bool,
    ) -> Self {
        let now = clock.provider.now();
        let target = SessionState::from_config(config).active_target();
        let audio_state = if config.audio.is_file() {
            "found"
        } else {
            "missing"
        };

        let mut lines = vec!["Autoplay diagnostics".to_string()];
        lines.push(format!("Clock source: {}", clock.label));
        if let Some(start) = clock.offset_from {
            lines.push(format!("Rehearsal clock started at: {start}"));
        }
        lines.push(format!("Current time: {}", now.format("%H:%M:%S")));
        lines.push(format!("Mode: {}", config.mode));
        lines.push(format!("Default time: {}", config.default_time));
        lines.push(format!("Custom time: {}", config.custom_time));
        lines.push(format!("Active target: {target}"));
        lines.push(format!(
            "Seconds until trigger: {}",
            target.seconds_until(now.time())
        ));
        lines.push(format!(
            "Audio file: {} ({audio_state})",
            config.audio.display()
        ));
        lines.push(format!("Media backend: {media_backend}"));
        lines.push(format!(
            "Retry delay: {} ms",
            config.retry_delay.as_millis()
        ));
        lines.push(format!(
            "Press-and-hold: {} ms delay, {} ms repeat",
            config.repeat.arm_delay.as_millis(),
            config.repeat.interval.as_millis()
        ));
        lines.push(format!(
            "Wake lock: {}",
            if wake_lock_available {
                "available (systemd-inhibit)"
            } else {
                "unavailable"
            }
        ));
        lines.push(format!(
            "Notification permission: {}",
            config.notification.permission
        ));
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn print(&self) {
        for line in self.lines() {
            println!("{line}");
        }
    }
}
