use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::session::SessionState;
use crate::time_of_day::TimeOfDay;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TriggerPulse {
    pub target: TimeOfDay,
    pub observed_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct TickOutcome {
    pub pulse: Option<TriggerPulse>,
    /// The match flag went back to false on this tick.
    pub rearmed: bool,
}

/// Emits one pulse per contiguous span where the clock equals the target.
#[derive(Debug, Default)]
pub struct ScheduleMatcher {
    observed_target: Option<TimeOfDay>,
}

impl ScheduleMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, now: NaiveDateTime, session: &mut SessionState) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        let target = session.active_target();
        let current = TimeOfDay::from_time(&now);

        if self
            .observed_target
            .replace(target)
            .is_some_and(|previous| previous != target)
            && session.match_state.has_fired
        {
            session.match_state.reset();
            outcome.rearmed = true;
        }

        debug!(
            current = %current,
            target = %target,
            has_fired = session.match_state.has_fired,
            "tick"
        );

        let is_match = current == target;
        if is_match && !session.match_state.has_fired {
            session.match_state.has_fired = true;
            info!(target = %target, at = %now.format("%H:%M:%S"), "trigger pulse");
            outcome.pulse = Some(TriggerPulse {
                target,
                observed_at: now,
            });
        } else if !is_match && session.match_state.has_fired {
            session.match_state.reset();
            outcome.rearmed = true;
        }
        outcome
    }
}
