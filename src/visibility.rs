use tokio::sync::watch;
use tracing::info;

use crate::platform::{Visibility, VisibilitySignal};

/// Latest known visibility, nothing buffered.
pub struct VisibilityMonitor {
    rx: watch::Receiver<Visibility>,
    visible: bool,
    closed: bool,
}

impl VisibilityMonitor {
    pub fn new(signal: &impl VisibilitySignal) -> Self {
        Self {
            rx: signal.subscribe(),
            visible: !signal.is_hidden(),
            closed: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Resolves with the new state once it actually differs from the last
    /// one. Pends forever after the signal goes away.
    pub async fn transition(&mut self) -> bool {
        loop {
            if self.closed || self.rx.changed().await.is_err() {
                self.closed = true;
                std::future::pending::<()>().await;
            }
            let visible = self.rx.borrow_and_update().is_visible();
            if visible != self.visible {
                self.visible = visible;
                info!(visible, "page visibility changed");
                return visible;
            }
        }
    }
}
