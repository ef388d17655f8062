use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use notify_rust::Notification;

use crate::error::NotificationError;
use crate::platform::{Notice, NotificationPermission, Notifier, PlatformFuture};

const APP_NAME: &str = "autoplay";

/// Desktop notifications over the session bus.
///
/// There is no permission prompt on the desktop, so the permission state is
/// whatever the configuration says, and an undecided state is granted when
/// requested.
#[derive(Clone)]
pub struct DesktopNotifier {
    permission: Arc<Mutex<NotificationPermission>>,
}

impl DesktopNotifier {
    pub fn new(permission: NotificationPermission) -> Self {
        Self {
            permission: Arc::new(Mutex::new(permission)),
        }
    }

    fn state(&self) -> MutexGuard<'_, NotificationPermission> {
        self.permission
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Notifier for DesktopNotifier {
    fn permission(&self) -> NotificationPermission {
        *self.state()
    }

    fn request_permission(&self) -> PlatformFuture<NotificationPermission> {
        let permission = {
            let mut state = self.state();
            if *state == NotificationPermission::Default {
                *state = NotificationPermission::Granted;
            }
            *state
        };
        Box::pin(std::future::ready(permission))
    }

    fn show(&self, notice: &Notice) -> Result<(), NotificationError> {
        if self.permission() != NotificationPermission::Granted {
            return Err(NotificationError::Denied);
        }
        Notification::new()
            .appname(APP_NAME)
            .summary(&notice.title)
            .body(&notice.body)
            .icon(&notice.icon)
            .show()
            .map(|_| ())
            .map_err(|err| NotificationError::Unavailable(err.to_string()))
    }
}
