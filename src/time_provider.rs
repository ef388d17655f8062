use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta};
use tokio::time::{Instant, Interval, MissedTickBehavior};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

pub trait TimeProvider: Send + Sync {
    fn now(&self) -> NaiveDateTime;
    fn label(&self) -> &'static str;
}

impl<T: TimeProvider + ?Sized> TimeProvider for Box<T> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }

    fn label(&self) -> &'static str {
        (**self).label()
    }
}

pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn label(&self) -> &'static str {
        "SYSTEM_LOCAL"
    }
}

/// Wall-clock time that starts at a chosen instant and advances with the
/// tokio clock, so paused-time tests and rehearsals see the same sequence.
pub struct OffsetTimeProvider {
    start: NaiveDateTime,
    anchor: Instant,
}

impl OffsetTimeProvider {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            start,
            anchor: Instant::now(),
        }
    }

    /// Today's date at `time`.
    pub fn starting_at(time: NaiveTime) -> Self {
        Self::new(Local::now().date_naive().and_time(time))
    }
}

impl TimeProvider for OffsetTimeProvider {
    fn now(&self) -> NaiveDateTime {
        let elapsed = TimeDelta::from_std(self.anchor.elapsed()).unwrap_or(TimeDelta::MAX);
        self.start
            .checked_add_signed(elapsed)
            .unwrap_or(NaiveDateTime::MAX)
    }

    fn label(&self) -> &'static str {
        "OFFSET_REHEARSAL"
    }
}

pub struct SelectedTimeProvider {
    pub provider: Box<dyn TimeProvider>,
    pub label: &'static str,
    pub offset_from: Option<NaiveTime>,
}

pub fn select_provider(start_at: Option<NaiveTime>) -> SelectedTimeProvider {
    let provider: Box<dyn TimeProvider> = match start_at {
        Some(time) => Box::new(OffsetTimeProvider::starting_at(time)),
        None => Box::new(SystemTimeProvider),
    };
    SelectedTimeProvider {
        label: provider.label(),
        provider,
        offset_from: start_at,
    }
}

/// One reading per second, the first one immediately. Ticks delayed past
/// their slot are skipped rather than replayed.
pub struct ClockSource<P> {
    provider: P,
    interval: Interval,
}

impl<P: TimeProvider> ClockSource<P> {
    pub fn new(provider: P) -> Self {
        Self::with_period(provider, TICK_PERIOD)
    }

    pub fn with_period(provider: P, period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { provider, interval }
    }

    pub async fn tick(&mut self) -> NaiveDateTime {
        self.interval.tick().await;
        self.provider.now()
    }

    pub fn now(&self) -> NaiveDateTime {
        self.provider.now()
    }
}
