//! Scripted stand-ins for the host, recording every call.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, watch};

use crate::error::{NotificationError, PlaybackError, WakeLockError};
use crate::platform::{
    MediaElement, MediaSignal, Notice, NotificationPermission, Notifier, PlatformFuture,
    Visibility, VisibilitySignal, WakeLockHandle, WakeLockProvider,
};

#[derive(Clone)]
pub struct FakeMedia {
    inner: Arc<MediaInner>,
}

struct MediaInner {
    ready: AtomicBool,
    load_calls: AtomicUsize,
    play_calls: AtomicUsize,
    pause_calls: AtomicUsize,
    play_results: Mutex<VecDeque<Result<(), PlaybackError>>>,
    signals: broadcast::Sender<MediaSignal>,
}

impl FakeMedia {
    /// Every play succeeds unless scripted otherwise.
    pub fn new() -> Self {
        Self::scripted(Vec::new())
    }

    pub fn scripted(play_results: Vec<Result<(), PlaybackError>>) -> Self {
        let (signals, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(MediaInner {
                ready: AtomicBool::new(false),
                load_calls: AtomicUsize::new(0),
                play_calls: AtomicUsize::new(0),
                pause_calls: AtomicUsize::new(0),
                play_results: Mutex::new(play_results.into()),
                signals,
            }),
        }
    }

    pub fn rejecting() -> Self {
        Self::scripted(vec![
            Err(PlaybackError::Rejected("autoplay blocked".to_string())),
            Err(PlaybackError::Rejected("autoplay blocked".to_string())),
        ])
    }

    pub fn play_calls(&self) -> usize {
        self.inner.play_calls.load(Ordering::SeqCst)
    }

    pub fn load_calls(&self) -> usize {
        self.inner.load_calls.load(Ordering::SeqCst)
    }

    pub fn pause_calls(&self) -> usize {
        self.inner.pause_calls.load(Ordering::SeqCst)
    }
}

impl MediaElement for FakeMedia {
    fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    fn load(&self) -> PlatformFuture<Result<(), PlaybackError>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            inner.load_calls.fetch_add(1, Ordering::SeqCst);
            inner.ready.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    fn play(&self) -> PlatformFuture<Result<(), PlaybackError>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            inner.play_calls.fetch_add(1, Ordering::SeqCst);
            let result = inner
                .play_results
                .lock()
                .expect("play script lock")
                .pop_front()
                .unwrap_or(Ok(()));
            if result.is_ok() {
                let _ = inner.signals.send(MediaSignal::Play);
            }
            result
        })
    }

    fn pause(&self) {
        self.inner.pause_calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.inner.signals.send(MediaSignal::Pause);
    }

    fn subscribe(&self) -> broadcast::Receiver<MediaSignal> {
        self.inner.signals.subscribe()
    }
}

#[derive(Clone)]
pub struct FakeWakeLock {
    inner: Arc<WakeLockInner>,
}

struct WakeLockInner {
    supported: bool,
    requests: AtomicUsize,
    handles: Mutex<Vec<Arc<AtomicBool>>>,
}

pub struct FakeHandle {
    released: Arc<AtomicBool>,
}

impl FakeWakeLock {
    pub fn available() -> Self {
        Self::with_support(true)
    }

    pub fn unsupported() -> Self {
        Self::with_support(false)
    }

    fn with_support(supported: bool) -> Self {
        Self {
            inner: Arc::new(WakeLockInner {
                supported,
                requests: AtomicUsize::new(0),
                handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn requests(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    pub fn live_handles(&self) -> usize {
        self.inner
            .handles
            .lock()
            .expect("handle list lock")
            .iter()
            .filter(|released| !released.load(Ordering::SeqCst))
            .count()
    }

    /// Simulates the host dropping every lock, e.g. when the screen turns off.
    pub fn revoke_all(&self) {
        let handles = self.inner.handles.lock().expect("handle list lock");
        for released in handles.iter() {
            released.store(true, Ordering::SeqCst);
        }
    }
}

impl WakeLockProvider for FakeWakeLock {
    type Handle = FakeHandle;

    fn request(&self) -> PlatformFuture<Result<FakeHandle, WakeLockError>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            inner.requests.fetch_add(1, Ordering::SeqCst);
            if !inner.supported {
                return Err(WakeLockError::Unsupported("no wake lock in test".to_string()));
            }
            let released = Arc::new(AtomicBool::new(false));
            inner
                .handles
                .lock()
                .expect("handle list lock")
                .push(Arc::clone(&released));
            Ok(FakeHandle { released })
        })
    }
}

impl WakeLockHandle for FakeHandle {
    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }

    fn is_released(&mut self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct FakeNotifier {
    inner: Arc<NotifierInner>,
}

struct NotifierInner {
    permission: Mutex<NotificationPermission>,
    grant_on_request: bool,
    fail_show: bool,
    permission_requests: AtomicUsize,
    shown: Mutex<Vec<Notice>>,
}

impl FakeNotifier {
    pub fn new(permission: NotificationPermission) -> Self {
        Self::build(permission, true, false)
    }

    /// Starts undecided and refuses when asked.
    pub fn denying() -> Self {
        Self::build(NotificationPermission::Default, false, false)
    }

    pub fn broken() -> Self {
        Self::build(NotificationPermission::Granted, true, true)
    }

    fn build(permission: NotificationPermission, grant_on_request: bool, fail_show: bool) -> Self {
        Self {
            inner: Arc::new(NotifierInner {
                permission: Mutex::new(permission),
                grant_on_request,
                fail_show,
                permission_requests: AtomicUsize::new(0),
                shown: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn shown(&self) -> Vec<Notice> {
        self.inner.shown.lock().expect("shown lock").clone()
    }

    pub fn permission_requests(&self) -> usize {
        self.inner.permission_requests.load(Ordering::SeqCst)
    }
}

impl Notifier for FakeNotifier {
    fn permission(&self) -> NotificationPermission {
        *self.inner.permission.lock().expect("permission lock")
    }

    fn request_permission(&self) -> PlatformFuture<NotificationPermission> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            inner.permission_requests.fetch_add(1, Ordering::SeqCst);
            let mut permission = inner.permission.lock().expect("permission lock");
            if *permission == NotificationPermission::Default {
                *permission = if inner.grant_on_request {
                    NotificationPermission::Granted
                } else {
                    NotificationPermission::Denied
                };
            }
            *permission
        })
    }

    fn show(&self, notice: &Notice) -> Result<(), NotificationError> {
        if self.inner.fail_show {
            return Err(NotificationError::Unavailable("no notification daemon".to_string()));
        }
        self.inner
            .shown
            .lock()
            .expect("shown lock")
            .push(notice.clone());
        Ok(())
    }
}

pub struct FakeVisibility {
    tx: watch::Sender<Visibility>,
}

impl FakeVisibility {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Visibility::Visible);
        Self { tx }
    }

    pub fn set(&self, visibility: Visibility) {
        self.tx.send_replace(visibility);
    }
}

impl VisibilitySignal for FakeVisibility {
    fn is_hidden(&self) -> bool {
        *self.tx.borrow() == Visibility::Hidden
    }

    fn subscribe(&self) -> watch::Receiver<Visibility> {
        self.tx.subscribe()
    }
}

pub fn sample_notice() -> Notice {
    Notice {
        title: "Music playing".to_string(),
        body: "Scheduled audio has started".to_string(),
        icon: "audio-x-generic".to_string(),
    }
}
