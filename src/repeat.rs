use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::CommandError;
use crate::time_of_day::TimeOfDay;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct RepeatTiming {
    pub arm_delay: Duration,
    pub interval: Duration,
}

impl Default for RepeatTiming {
    fn default() -> Self {
        Self {
            arm_delay: Duration::from_millis(500),
            interval: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum TimeField {
    Hours,
    Minutes,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Step {
    Increment,
    Decrement,
}

/// One unit of adjustment bound to a pressable control.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct AdjustAction {
    pub field: TimeField,
    pub step: Step,
}

impl AdjustAction {
    pub const HOUR_UP: AdjustAction = AdjustAction {
        field: TimeField::Hours,
        step: Step::Increment,
    };
    pub const HOUR_DOWN: AdjustAction = AdjustAction {
        field: TimeField::Hours,
        step: Step::Decrement,
    };
    pub const MINUTE_UP: AdjustAction = AdjustAction {
        field: TimeField::Minutes,
        step: Step::Increment,
    };
    pub const MINUTE_DOWN: AdjustAction = AdjustAction {
        field: TimeField::Minutes,
        step: Step::Decrement,
    };

    pub const ALL: [AdjustAction; 4] = [
        AdjustAction::HOUR_UP,
        AdjustAction::HOUR_DOWN,
        AdjustAction::MINUTE_UP,
        AdjustAction::MINUTE_DOWN,
    ];

    pub fn apply(self, time: TimeOfDay) -> TimeOfDay {
        match (self.field, self.step) {
            (TimeField::Hours, Step::Increment) => time.increment_hours(),
            (TimeField::Hours, Step::Decrement) => time.decrement_hours(),
            (TimeField::Minutes, Step::Increment) => time.increment_minutes(),
            (TimeField::Minutes, Step::Decrement) => time.decrement_minutes(),
        }
    }
}

impl fmt::Display for AdjustAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = match self.field {
            TimeField::Hours => "hour",
            TimeField::Minutes => "minute",
        };
        let step = match self.step {
            Step::Increment => "up",
            Step::Decrement => "down",
        };
        write!(f, "{field}-{step}")
    }
}

impl FromStr for AdjustAction {
    type Err = CommandError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "hour-up" | "h+" => Ok(AdjustAction::HOUR_UP),
            "hour-down" | "h-" => Ok(AdjustAction::HOUR_DOWN),
            "minute-up" | "m+" => Ok(AdjustAction::MINUTE_UP),
            "minute-down" | "m-" => Ok(AdjustAction::MINUTE_DOWN),
            other => Err(CommandError::UnknownControl(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RepeatPhase {
    Idle,
    ArmedDelay,
    Repeating,
}

/// Turns a press-and-hold gesture on one control into discrete actions.
///
/// The controller never sleeps itself: the owner asks for [`deadline`],
/// waits until then and calls [`advance`] with the current instant. Every
/// timer is dropped on release or disable, so repeats cannot outlive the
/// gesture.
///
/// [`deadline`]: RepeatController::deadline
/// [`advance`]: RepeatController::advance
#[derive(Debug, Clone)]
pub struct RepeatController {
    action: AdjustAction,
    timing: RepeatTiming,
    enabled: bool,
    phase: RepeatPhase,
    next_fire: Option<Instant>,
}

impl RepeatController {
    pub fn new(action: AdjustAction, timing: RepeatTiming) -> Self {
        Self {
            action,
            timing: RepeatTiming {
                arm_delay: timing.arm_delay,
                interval: timing.interval.max(MIN_INTERVAL),
            },
            enabled: true,
            phase: RepeatPhase::Idle,
            next_fire: None,
        }
    }

    pub fn action(&self) -> AdjustAction {
        self.action
    }

    pub fn phase(&self) -> RepeatPhase {
        self.phase
    }

    /// Returns how many actions to run right now: one for a valid press,
    /// zero while disabled.
    pub fn press_start(&mut self, now: Instant) -> u32 {
        if !self.enabled {
            return 0;
        }
        self.phase = RepeatPhase::ArmedDelay;
        self.next_fire = Some(now + self.timing.arm_delay);
        1
    }

    pub fn press_end(&mut self) {
        self.phase = RepeatPhase::Idle;
        self.next_fire = None;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.press_end();
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.next_fire
    }

    /// Counts every repeat due at or before `now`.
    pub fn advance(&mut self, now: Instant) -> u32 {
        let mut fired = 0;
        while let Some(at) = self.next_fire
            && at <= now
        {
            self.phase = RepeatPhase::Repeating;
            self.next_fire = Some(at + self.timing.interval);
            fired += 1;
        }
        fired
    }
}
