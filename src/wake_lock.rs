use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::WakeLockError;
use crate::platform::{PlatformFuture, WakeLockHandle, WakeLockProvider};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WakeLockState {
    Unlocked,
    Acquiring,
    Locked,
}

impl fmt::Display for WakeLockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WakeLockState::Unlocked => "unlocked",
            WakeLockState::Acquiring => "acquiring",
            WakeLockState::Locked => "locked",
        };
        f.write_str(label)
    }
}

pub type WakeLockRequest<W> =
    PlatformFuture<Result<<W as WakeLockProvider>::Handle, WakeLockError>>;

/// Holds at most one wake lock handle for the lifetime of a session.
///
/// Requests are handed back to the caller as futures so they can run next to
/// the clock. Their results come back through [`on_acquired`].
///
/// [`on_acquired`]: WakeLockCoordinator::on_acquired
pub struct WakeLockCoordinator<W: WakeLockProvider> {
    provider: W,
    handle: Option<W::Handle>,
    acquiring: bool,
    torn_down: bool,
}

impl<W: WakeLockProvider> WakeLockCoordinator<W> {
    pub fn new(provider: W) -> Self {
        Self {
            provider,
            handle: None,
            acquiring: false,
            torn_down: false,
        }
    }

    /// Starts a request unless one is pending or a handle is already held.
    pub fn acquire(&mut self) -> Option<WakeLockRequest<W>> {
        if self.torn_down || self.acquiring || self.handle.is_some() {
            return None;
        }
        self.acquiring = true;
        Some(self.provider.request())
    }

    /// Re-acquires only when a previously held handle was released by the
    /// host while we were hidden. A session that never got a lock stays
    /// without one.
    pub fn on_visibility(&mut self, visible: bool) -> Option<WakeLockRequest<W>> {
        if !visible || self.torn_down || self.acquiring {
            return None;
        }
        let released = self
            .handle
            .as_mut()
            .is_some_and(|handle| handle.is_released());
        if !released {
            return None;
        }
        info!("wake lock was released while hidden, re-acquiring");
        self.handle = None;
        self.acquire()
    }

    pub fn on_acquired(&mut self, result: Result<W::Handle, WakeLockError>) {
        self.acquiring = false;
        match result {
            Ok(mut handle) => {
                if self.torn_down {
                    handle.release();
                    return;
                }
                if let Some(mut previous) = self.handle.replace(handle) {
                    previous.release();
                }
                info!("wake lock activated");
            }
            Err(err) => warn!(error = %err, "continuing without wake lock"),
        }
    }

    pub fn teardown(&mut self) {
        self.torn_down = true;
        if let Some(mut handle) = self.handle.take() {
            handle.release();
            info!("wake lock released");
        }
    }

    pub fn state(&mut self) -> WakeLockState {
        if self.acquiring {
            return WakeLockState::Acquiring;
        }
        match self.handle.as_mut().map(|handle| handle.is_released()) {
            Some(false) => WakeLockState::Locked,
            _ => WakeLockState::Unlocked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::FakeWakeLock;

    async fn settle<W: WakeLockProvider>(
        coordinator: &mut WakeLockCoordinator<W>,
        request: Option<WakeLockRequest<W>>,
    ) {
        let request = request.expect("request should start");
        coordinator.on_acquired(request.await);
    }

    #[tokio::test]
    async fn acquires_once_on_activation() {
        let provider = FakeWakeLock::available();
        let mut coordinator = WakeLockCoordinator::new(provider.clone());

        let request = coordinator.acquire();
        assert_eq!(coordinator.state(), WakeLockState::Acquiring);
        assert!(coordinator.acquire().is_none());
        settle(&mut coordinator, request).await;

        assert_eq!(coordinator.state(), WakeLockState::Locked);
        assert_eq!(provider.requests(), 1);
        assert_eq!(provider.live_handles(), 1);
    }

    #[tokio::test]
    async fn unsupported_platform_leaves_session_unlocked() {
        let provider = FakeWakeLock::unsupported();
        let mut coordinator = WakeLockCoordinator::new(provider.clone());

        let request = coordinator.acquire();
        settle(&mut coordinator, request).await;

        assert_eq!(coordinator.state(), WakeLockState::Unlocked);
        assert!(coordinator.on_visibility(true).is_none());
        assert_eq!(provider.requests(), 1);
    }

    #[tokio::test]
    async fn reacquires_after_host_release_when_visible() {
        let provider = FakeWakeLock::available();
        let mut coordinator = WakeLockCoordinator::new(provider.clone());
        let request = coordinator.acquire();
        settle(&mut coordinator, request).await;

        provider.revoke_all();
        assert!(coordinator.on_visibility(false).is_none());
        assert_eq!(coordinator.state(), WakeLockState::Unlocked);

        let request = coordinator.on_visibility(true);
        settle(&mut coordinator, request).await;

        assert_eq!(coordinator.state(), WakeLockState::Locked);
        assert_eq!(provider.requests(), 2);
        assert_eq!(provider.live_handles(), 1);
    }

    #[tokio::test]
    async fn state_reports_host_release_without_visibility_change() {
        let provider = FakeWakeLock::available();
        let mut coordinator = WakeLockCoordinator::new(provider.clone());
        let request = coordinator.acquire();
        settle(&mut coordinator, request).await;
        assert_eq!(coordinator.state(), WakeLockState::Locked);

        provider.revoke_all();
        assert_eq!(coordinator.state(), WakeLockState::Unlocked);
        assert_eq!(provider.requests(), 1);
    }

    #[tokio::test]
    async fn visible_with_live_handle_does_nothing() {
        let provider = FakeWakeLock::available();
        let mut coordinator = WakeLockCoordinator::new(provider.clone());
        let request = coordinator.acquire();
        settle(&mut coordinator, request).await;

        assert!(coordinator.on_visibility(true).is_none());
        assert_eq!(provider.requests(), 1);
    }

    #[tokio::test]
    async fn teardown_releases_and_drops_late_grants() {
        let provider = FakeWakeLock::available();
        let mut coordinator = WakeLockCoordinator::new(provider.clone());

        let request = coordinator.acquire().expect("request should start");
        coordinator.teardown();
        coordinator.on_acquired(request.await);

        assert_eq!(coordinator.state(), WakeLockState::Unlocked);
        assert_eq!(provider.live_handles(), 0);
        assert!(coordinator.acquire().is_none());
    }
}
