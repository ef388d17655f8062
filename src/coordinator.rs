use chrono::NaiveDateTime;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Command, ModeChange};
use crate::error::WakeLockError;
use crate::platform::{
    MediaElement, MediaSignal, NotificationPermission, Notifier, WakeLockProvider,
};
use crate::playback::{PlaybackAttempt, PlaybackOutcome, PlaybackTrigger};
use crate::schedule::matcher::ScheduleMatcher;
use crate::schedule::model::ScheduleConfig;
use crate::schedule::selector::TimeSelector;
use crate::session::{SessionSnapshot, SessionState};
use crate::time_provider::{ClockSource, TimeProvider};
use crate::visibility::VisibilityMonitor;
use crate::wake_lock::{WakeLockCoordinator, WakeLockRequest};

pub struct Platform<P, M, W, N> {
    pub clock: ClockSource<P>,
    pub media: M,
    pub wake_lock: W,
    pub notifier: N,
}

enum Completion<H> {
    Playback(PlaybackOutcome),
    WakeLock(Result<H, WakeLockError>),
    Permission(NotificationPermission),
}

/// Owns the session and runs every component on one task.
///
/// Ticks, commands, visibility changes, media signals, repeat deadlines and
/// finished platform calls are all handled from a single `select!` loop, so
/// components never race on the session state.
pub struct Coordinator<P, M, W, N>
where
    P: TimeProvider,
    M: MediaElement,
    W: WakeLockProvider,
    N: Notifier,
{
    session: SessionState,
    clock: ClockSource<P>,
    matcher: ScheduleMatcher,
    selector: TimeSelector,
    playback: PlaybackTrigger<M, N>,
    wake_lock: WakeLockCoordinator<W>,
    visibility: VisibilityMonitor,
    media_signals: broadcast::Receiver<MediaSignal>,
    commands: mpsc::Receiver<Command>,
    tasks: JoinSet<Completion<W::Handle>>,
    lifetime: CancellationToken,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl<P, M, W, N> Coordinator<P, M, W, N>
where
    P: TimeProvider,
    M: MediaElement,
    W: WakeLockProvider,
    N: Notifier,
{
    pub fn new(
        config: &ScheduleConfig,
        platform: Platform<P, M, W, N>,
        visibility: VisibilityMonitor,
        commands: mpsc::Receiver<Command>,
        lifetime: CancellationToken,
    ) -> Self {
        let mut session = SessionState::from_config(config);
        session.is_visible = visibility.is_visible();
        let media_signals = platform.media.subscribe();
        let playback = PlaybackTrigger::new(
            platform.media,
            platform.notifier,
            config.notification.notice.clone(),
            config.retry_delay,
            lifetime.clone(),
        );
        let mut wake_lock = WakeLockCoordinator::new(platform.wake_lock);
        let snapshot = SessionSnapshot::capture(&session, platform.clock.now(), wake_lock.state());
        let (snapshots, _) = watch::channel(snapshot);

        Self {
            selector: TimeSelector::new(config.repeat, session.mode),
            session,
            clock: platform.clock,
            matcher: ScheduleMatcher::new(),
            playback,
            wake_lock,
            visibility,
            media_signals,
            commands,
            tasks: JoinSet::new(),
            lifetime,
            snapshots,
        }
    }

    pub fn snapshots(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    /// Runs until `quit` or until the lifetime token is cancelled, then tears
    /// everything down and returns the final session.
    pub async fn run(mut self) -> SessionState {
        info!(
            mode = %self.session.mode,
            target = %self.session.active_target(),
            "session started"
        );
        self.activate();
        let mut commands_open = true;

        loop {
            let repeat_deadline = self.selector.next_deadline();
            tokio::select! {
                biased;
                _ = self.lifetime.cancelled() => break,
                command = self.commands.recv(), if commands_open => match command {
                    Some(Command::Quit) => {
                        info!("quit requested");
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("command channel closed");
                        commands_open = false;
                    }
                },
                Some(joined) = self.tasks.join_next() => match joined {
                    Ok(completion) => self.on_completion(completion),
                    Err(err) => warn!(error = %err, "platform task failed"),
                },
                visible = self.visibility.transition() => self.on_visibility(visible),
                Ok(signal) = self.media_signals.recv() => {
                    debug!(?signal, "media signal");
                    self.playback.on_signal(signal, &mut self.session);
                }
                _ = repeat_due(repeat_deadline) => {
                    self.selector.advance(Instant::now(), &mut self.session);
                }
                now = self.clock.tick() => self.on_tick(now),
            }
            self.publish();
        }

        self.teardown().await;
        self.session
    }

    fn activate(&mut self) {
        if let Some(request) = self.wake_lock.acquire() {
            self.spawn_wake_lock(request);
        }
        if let Some(request) = self.playback.request_permission() {
            self.tasks
                .spawn(async move { Completion::Permission(request.await) });
        }
    }

    fn on_tick(&mut self, now: NaiveDateTime) {
        let outcome = self.matcher.tick(now, &mut self.session);
        if outcome.rearmed {
            debug!(target = %self.session.active_target(), "match flag cleared");
        }
        if let Some(pulse) = outcome.pulse {
            let attempt = self.playback.fire(&pulse);
            self.spawn_playback(attempt);
        }
    }

    fn handle_command(&mut self, command: Command) {
        let target_before = self.session.active_target();
        match command {
            Command::TogglePlayback => {
                if let Some(attempt) = self.playback.toggle(&mut self.session) {
                    self.spawn_playback(attempt);
                }
            }
            Command::SetMode(ModeChange::Set(mode)) => {
                self.selector.set_mode(mode, &mut self.session);
            }
            Command::SetMode(ModeChange::Toggle) => {
                self.selector.toggle_mode(&mut self.session);
            }
            Command::SetCustomTime(time) => {
                self.selector.set_custom_time(time, &mut self.session);
            }
            Command::Press(action) => {
                self.selector
                    .press_start(action, Instant::now(), &mut self.session);
            }
            Command::Release(Some(action)) => self.selector.press_end(action),
            Command::Release(None) => self.selector.release_all(),
            Command::Quit => {}
        }
        // A new target is checked right away rather than on the next tick.
        if self.session.active_target() != target_before {
            let now = self.clock.now();
            self.on_tick(now);
        }
    }

    fn on_completion(&mut self, completion: Completion<W::Handle>) {
        match completion {
            Completion::Playback(outcome) => self.playback.on_outcome(outcome, &mut self.session),
            Completion::WakeLock(result) => self.wake_lock.on_acquired(result),
            Completion::Permission(permission) => {
                info!(%permission, "notification permission");
            }
        }
    }

    fn on_visibility(&mut self, visible: bool) {
        self.session.is_visible = visible;
        if let Some(request) = self.wake_lock.on_visibility(visible) {
            self.spawn_wake_lock(request);
        }
    }

    fn spawn_playback(&mut self, attempt: PlaybackAttempt) {
        self.tasks
            .spawn(async move { Completion::Playback(attempt.await) });
    }

    fn spawn_wake_lock(&mut self, request: WakeLockRequest<W>) {
        self.tasks
            .spawn(async move { Completion::WakeLock(request.await) });
    }

    fn publish(&mut self) {
        let snapshot =
            SessionSnapshot::capture(&self.session, self.clock.now(), self.wake_lock.state());
        self.snapshots.send_replace(snapshot);
    }

    async fn teardown(&mut self) {
        self.lifetime.cancel();
        self.selector.release_all();
        self.wake_lock.teardown();
        self.tasks.abort_all();
        // Grants that finished before the abort still hold a lock.
        while let Some(joined) = self.tasks.join_next().await {
            if let Ok(Completion::WakeLock(result)) = joined {
                self.wake_lock.on_acquired(result);
            }
        }
        self.playback.teardown(&mut self.session);
        self.publish();
        info!("session ended");
    }
}

async fn repeat_due(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
