//! Boundaries to the host: media output, wake locks, notifications and
//! visibility. Each trait has a desktop adapter in this directory.

pub mod command_player;
pub mod console;
#[cfg(test)]
pub mod fake;
pub mod inhibit;
pub mod notify;
#[cfg(feature = "rodio")]
pub mod rodio_player;

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};

use crate::error::{NotificationError, PlaybackError, WakeLockError};

pub type PlatformFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// State changes reported by a media element, whoever caused them.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MediaSignal {
    Play,
    Pause,
    Ended,
}

/// A single playable resource. Clones share the same underlying output.
pub trait MediaElement: Clone + Send + Sync + 'static {
    fn is_ready(&self) -> bool;
    fn load(&self) -> PlatformFuture<Result<(), PlaybackError>>;
    fn play(&self) -> PlatformFuture<Result<(), PlaybackError>>;
    fn pause(&self);
    fn subscribe(&self) -> broadcast::Receiver<MediaSignal>;
}

/// Checks that the audio file exists before a player is asked to open it.
pub async fn probe_audio_file(path: &Path) -> Result<(), PlaybackError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|err| PlaybackError::LoadFailed(format!("{}: {err}", path.display())))?;
    if !metadata.is_file() {
        return Err(PlaybackError::LoadFailed(format!(
            "{} is not a file",
            path.display()
        )));
    }
    Ok(())
}

pub trait WakeLockProvider: Send + Sync + 'static {
    type Handle: WakeLockHandle;

    fn request(&self) -> PlatformFuture<Result<Self::Handle, WakeLockError>>;
}

pub trait WakeLockHandle: Send + 'static {
    fn release(&mut self);
    /// True once the lock is gone, whether we released it or the host did.
    fn is_released(&mut self) -> bool;
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPermission {
    #[default]
    Default,
    Granted,
    Denied,
}

impl fmt::Display for NotificationPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NotificationPermission::Default => "default",
            NotificationPermission::Granted => "granted",
            NotificationPermission::Denied => "denied",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Notice {
    pub title: String,
    pub body: String,
    pub icon: String,
}

pub trait Notifier: Send + Sync + 'static {
    fn permission(&self) -> NotificationPermission;
    fn request_permission(&self) -> PlatformFuture<NotificationPermission>;
    fn show(&self, notice: &Notice) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    pub fn is_visible(self) -> bool {
        self == Visibility::Visible
    }
}

pub trait VisibilitySignal {
    fn is_hidden(&self) -> bool;
    fn subscribe(&self) -> watch::Receiver<Visibility>;
}
