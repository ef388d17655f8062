use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::repeat::{AdjustAction, RepeatController, RepeatTiming};
use crate::schedule::model::ScheduleMode;
use crate::session::SessionState;
use crate::time_of_day::TimeOfDay;

/// The four press-and-hold controls that edit the custom time. They only
/// accept presses while the custom schedule is active.
pub struct TimeSelector {
    controls: [RepeatController; 4],
}

impl TimeSelector {
    pub fn new(timing: RepeatTiming, mode: ScheduleMode) -> Self {
        let mut selector = Self {
            controls: AdjustAction::ALL.map(|action| RepeatController::new(action, timing)),
        };
        selector.sync_enabled(mode);
        selector
    }

    pub fn press_start(&mut self, action: AdjustAction, now: Instant, session: &mut SessionState) {
        let control = self.control_mut(action);
        let count = control.press_start(now);
        if count == 0 {
            debug!(control = %action, "control disabled, press ignored");
            return;
        }
        apply(action, count, session);
    }

    pub fn press_end(&mut self, action: AdjustAction) {
        let control = self.control_mut(action);
        debug!(control = %action, phase = ?control.phase(), "press released");
        control.press_end();
    }

    pub fn release_all(&mut self) {
        for control in &mut self.controls {
            control.press_end();
        }
    }

    pub fn set_mode(&mut self, mode: ScheduleMode, session: &mut SessionState) {
        if session.set_mode(mode) {
            info!(mode = %mode, target = %session.active_target(), "schedule mode changed");
        }
        self.sync_enabled(mode);
    }

    pub fn toggle_mode(&mut self, session: &mut SessionState) {
        self.set_mode(session.mode.toggled(), session);
    }

    /// Typed entry of the custom time. Only accepted in custom mode, where the
    /// input is shown.
    pub fn set_custom_time(&mut self, time: TimeOfDay, session: &mut SessionState) -> bool {
        if session.mode != ScheduleMode::Custom {
            warn!(time = %time, "custom time can only be edited in custom mode");
            return false;
        }
        if session.set_custom_time(time) {
            info!(target = %time, "custom time changed");
        }
        true
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.controls
            .iter()
            .filter_map(RepeatController::deadline)
            .min()
    }

    /// Runs every repeat due at `now`.
    pub fn advance(&mut self, now: Instant, session: &mut SessionState) {
        for control in &mut self.controls {
            let count = control.advance(now);
            if count > 0 {
                apply(control.action(), count, session);
            }
        }
    }

    fn sync_enabled(&mut self, mode: ScheduleMode) {
        let enabled = mode == ScheduleMode::Custom;
        for control in &mut self.controls {
            control.set_enabled(enabled);
        }
    }

    fn control_mut(&mut self, action: AdjustAction) -> &mut RepeatController {
        let index = AdjustAction::ALL
            .iter()
            .position(|candidate| *candidate == action)
            .unwrap_or_default();
        &mut self.controls[index]
    }
}

fn apply(action: AdjustAction, count: u32, session: &mut SessionState) {
    let mut time = session.custom_time;
    for _ in 0..count {
        time = action.apply(time);
    }
    session.set_custom_time(time);
    debug!(control = %action, count, custom_time = %time, "custom time adjusted");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn custom_session() -> SessionState {
        SessionState::new(
            TimeOfDay::new(10, 0),
            TimeOfDay::new(9, 55),
            ScheduleMode::Custom,
        )
    }

    #[test]
    fn press_applies_immediately_and_repeats_after_arm_delay() {
        let start = Instant::now();
        let mut session = custom_session();
        let mut selector = TimeSelector::new(RepeatTiming::default(), session.mode);

        selector.press_start(AdjustAction::MINUTE_UP, start, &mut session);
        assert_eq!(session.custom_time, TimeOfDay::new(9, 56));
        assert_eq!(
            selector.next_deadline(),
            Some(start + Duration::from_millis(500))
        );

        selector.advance(start + Duration::from_millis(700), &mut session);
        assert_eq!(session.custom_time, TimeOfDay::new(9, 59));

        selector.press_end(AdjustAction::MINUTE_UP);
        assert!(selector.next_deadline().is_none());
    }

    #[test]
    fn held_minute_control_wraps_without_touching_hours() {
        let start = Instant::now();
        let mut session = custom_session();
        session.custom_time = TimeOfDay::new(9, 0);
        let mut selector = TimeSelector::new(RepeatTiming::default(), session.mode);

        selector.press_start(AdjustAction::MINUTE_DOWN, start, &mut session);
        assert_eq!(session.custom_time, TimeOfDay::new(9, 59));
    }

    #[test]
    fn default_mode_disables_controls() {
        let start = Instant::now();
        let mut session = custom_session();
        let mut selector = TimeSelector::new(RepeatTiming::default(), session.mode);
        selector.press_start(AdjustAction::HOUR_UP, start, &mut session);

        selector.set_mode(ScheduleMode::Default, &mut session);
        assert!(selector.next_deadline().is_none());

        selector.press_start(AdjustAction::HOUR_UP, start, &mut session);
        assert_eq!(session.custom_time, TimeOfDay::new(10, 55));
        assert!(!selector.set_custom_time(TimeOfDay::new(7, 0), &mut session));
        assert_eq!(session.custom_time, TimeOfDay::new(10, 55));
    }

    #[test]
    fn toggling_mode_rearms_match_when_target_moves() {
        let mut session = custom_session();
        session.match_state.has_fired = true;
        let mut selector = TimeSelector::new(RepeatTiming::default(), session.mode);

        selector.toggle_mode(&mut session);
        assert_eq!(session.mode, ScheduleMode::Default);
        assert!(!session.match_state.has_fired);

        selector.toggle_mode(&mut session);
        let start = Instant::now();
        selector.press_start(AdjustAction::HOUR_DOWN, start, &mut session);
        assert_eq!(session.custom_time, TimeOfDay::new(8, 55));
    }

    #[test]
    fn next_deadline_is_earliest_held_control() {
        let start = Instant::now();
        let mut session = custom_session();
        let mut selector = TimeSelector::new(RepeatTiming::default(), session.mode);

        selector.press_start(AdjustAction::HOUR_UP, start, &mut session);
        selector.press_start(
            AdjustAction::MINUTE_UP,
            start + Duration::from_millis(200),
            &mut session,
        );
        assert_eq!(
            selector.next_deadline(),
            Some(start + Duration::from_millis(500))
        );

        selector.release_all();
        assert!(selector.next_deadline().is_none());
    }
}
