use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::PlaybackError;
use crate::platform::{
    MediaElement, MediaSignal, Notice, NotificationPermission, Notifier, PlatformFuture,
};
use crate::schedule::matcher::TriggerPulse;
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PlayOrigin {
    Pulse,
    Manual,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PlaybackOutcome {
    Playing {
        origin: PlayOrigin,
        attempts: u32,
    },
    Failed {
        origin: PlayOrigin,
        attempts: u32,
        error: PlaybackError,
    },
    Cancelled {
        origin: PlayOrigin,
    },
}

impl PlaybackOutcome {
    pub fn origin(&self) -> PlayOrigin {
        match self {
            PlaybackOutcome::Playing { origin, .. }
            | PlaybackOutcome::Failed { origin, .. }
            | PlaybackOutcome::Cancelled { origin } => *origin,
        }
    }
}

pub type PlaybackAttempt = PlatformFuture<PlaybackOutcome>;

/// Starts playback on trigger pulses and manual toggles, and keeps the
/// session's playing flag in step with what the media element reports.
pub struct PlaybackTrigger<M: MediaElement, N: Notifier> {
    media: M,
    notifier: N,
    notice: Notice,
    retry_delay: Duration,
    lifetime: CancellationToken,
    manual_in_flight: bool,
}

impl<M: MediaElement, N: Notifier> PlaybackTrigger<M, N> {
    pub fn new(
        media: M,
        notifier: N,
        notice: Notice,
        retry_delay: Duration,
        lifetime: CancellationToken,
    ) -> Self {
        Self {
            media,
            notifier,
            notice,
            retry_delay,
            lifetime,
            manual_in_flight: false,
        }
    }

    pub fn fire(&self, pulse: &TriggerPulse) -> PlaybackAttempt {
        info!(
            target = %pulse.target,
            observed_at = %pulse.observed_at.format("%H:%M:%S"),
            "attempting to play audio"
        );
        self.attempt(PlayOrigin::Pulse)
    }

    /// Pauses when playing, otherwise starts a manual attempt. A second
    /// toggle while that attempt is still pending is ignored.
    pub fn toggle(&mut self, session: &mut SessionState) -> Option<PlaybackAttempt> {
        if session.is_playing {
            self.media.pause();
            session.is_playing = false;
            return None;
        }
        if self.manual_in_flight {
            debug!("manual play already pending");
            return None;
        }
        self.manual_in_flight = true;
        Some(self.attempt(PlayOrigin::Manual))
    }

    /// Asks for notification permission once, if the user has not decided.
    pub fn request_permission(&self) -> Option<PlatformFuture<NotificationPermission>> {
        (self.notifier.permission() == NotificationPermission::Default)
            .then(|| self.notifier.request_permission())
    }

    pub fn on_outcome(&mut self, outcome: PlaybackOutcome, session: &mut SessionState) {
        if outcome.origin() == PlayOrigin::Manual {
            self.manual_in_flight = false;
        }
        match outcome {
            PlaybackOutcome::Playing { origin, attempts } => {
                session.is_playing = true;
                info!(?origin, attempts, "audio playing");
                if attempts == 1 {
                    self.notify();
                }
            }
            PlaybackOutcome::Failed {
                origin,
                attempts,
                error,
            } => {
                warn!(?origin, attempts, error = %error, "playback failed, giving up");
            }
            PlaybackOutcome::Cancelled { origin } => {
                debug!(?origin, "playback attempt cancelled");
            }
        }
    }

    pub fn on_signal(&self, signal: MediaSignal, session: &mut SessionState) {
        session.is_playing = signal == MediaSignal::Play;
    }

    pub fn teardown(&mut self, session: &mut SessionState) {
        self.manual_in_flight = false;
        if session.is_playing {
            self.media.pause();
            session.is_playing = false;
        }
    }

    fn notify(&self) {
        if self.notifier.permission() != NotificationPermission::Granted {
            return;
        }
        if let Err(err) = self.notifier.show(&self.notice) {
            debug!(error = %err, "notification not shown");
        }
    }

    fn attempt(&self, origin: PlayOrigin) -> PlaybackAttempt {
        Box::pin(run_attempt(
            self.media.clone(),
            origin,
            self.retry_delay,
            self.lifetime.clone(),
        ))
    }
}

async fn run_attempt<M: MediaElement>(
    media: M,
    origin: PlayOrigin,
    retry_delay: Duration,
    lifetime: CancellationToken,
) -> PlaybackOutcome {
    if !media.is_ready()
        && let Err(err) = media.load().await
    {
        warn!(error = %err, "audio load failed, trying to play anyway");
    }
    if lifetime.is_cancelled() {
        return PlaybackOutcome::Cancelled { origin };
    }

    let error = match media.play().await {
        Ok(()) => return PlaybackOutcome::Playing { origin, attempts: 1 },
        Err(err) => err,
    };
    if origin == PlayOrigin::Manual {
        return PlaybackOutcome::Failed {
            origin,
            attempts: 1,
            error,
        };
    }

    warn!(
        error = %error,
        delay_ms = retry_delay.as_millis() as u64,
        "play rejected, retrying once"
    );
    tokio::select! {
        _ = lifetime.cancelled() => return PlaybackOutcome::Cancelled { origin },
        _ = tokio::time::sleep(retry_delay) => {}
    }
    if lifetime.is_cancelled() {
        return PlaybackOutcome::Cancelled { origin };
    }

    match media.play().await {
        Ok(()) => PlaybackOutcome::Playing {
            origin,
            attempts: 2,
        },
        Err(error) => PlaybackOutcome::Failed {
            origin,
            attempts: 2,
            error,
        },
    }
}
