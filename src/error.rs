use thiserror::Error;

#[derive(Debug, Clone, Error, Eq, PartialEq)]
#[error("invalid time '{input}', expected HH:MM")]
pub struct TimeParseError {
    input: String,
}

impl TimeParseError {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
        }
    }
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum PlaybackError {
    /// The platform refused to start playback.
    #[error("playback rejected: {0}")]
    Rejected(String),
    #[error("audio load failed: {0}")]
    LoadFailed(String),
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum WakeLockError {
    #[error("wake lock unsupported: {0}")]
    Unsupported(String),
    #[error("wake lock permission denied: {0}")]
    PermissionDenied(String),
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum NotificationError {
    #[error("notifications unavailable: {0}")]
    Unavailable(String),
    #[error("notification permission denied")]
    Denied,
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum CommandError {
    #[error("unknown command '{0}'; type 'help' for a list")]
    Unknown(String),
    #[error("unknown control '{0}'; expected hour-up, hour-down, minute-up or minute-down")]
    UnknownControl(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}
