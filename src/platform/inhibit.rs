use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::debug;

use crate::error::WakeLockError;
use crate::platform::{PlatformFuture, WakeLockHandle, WakeLockProvider};

const INHIBIT_PROGRAM: &str = "systemd-inhibit";
/// An inhibitor that dies this quickly was refused by logind.
const STARTUP_PROBE: Duration = Duration::from_millis(200);

/// Keeps the machine awake by holding a `systemd-inhibit` child process.
pub struct InhibitWakeLock {
    program: Option<PathBuf>,
}

impl InhibitWakeLock {
    pub fn discover() -> Self {
        Self {
            program: which::which(INHIBIT_PROGRAM).ok(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.program.is_some()
    }
}

impl WakeLockProvider for InhibitWakeLock {
    type Handle = InhibitHandle;

    fn request(&self) -> PlatformFuture<Result<InhibitHandle, WakeLockError>> {
        let program = self.program.clone();
        Box::pin(async move {
            let Some(program) = program else {
                return Err(WakeLockError::Unsupported(format!(
                    "{INHIBIT_PROGRAM} not found on PATH"
                )));
            };
            let mut child = Command::new(&program)
                .args([
                    "--what=idle:sleep",
                    "--who=autoplay",
                    "--why=Waiting to play scheduled audio",
                    "--mode=block",
                    "sleep",
                    "infinity",
                ])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn()
                .map_err(|err| match err.kind() {
                    ErrorKind::PermissionDenied => WakeLockError::PermissionDenied(err.to_string()),
                    _ => WakeLockError::Unsupported(err.to_string()),
                })?;

            if let Ok(status) = tokio::time::timeout(STARTUP_PROBE, child.wait()).await {
                let reason = match status {
                    Ok(status) => format!("{INHIBIT_PROGRAM} exited early with {status}"),
                    Err(err) => err.to_string(),
                };
                return Err(WakeLockError::Unsupported(reason));
            }
            Ok(InhibitHandle { child: Some(child) })
        })
    }
}

pub struct InhibitHandle {
    child: Option<Child>,
}

impl WakeLockHandle for InhibitHandle {
    fn release(&mut self) {
        if let Some(mut child) = self.child.take()
            && let Err(err) = child.start_kill()
        {
            debug!(error = %err, "inhibitor already gone");
        }
    }

    fn is_released(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return true;
        };
        match child.try_wait() {
            Ok(None) => false,
            Ok(Some(status)) => {
                debug!(%status, "inhibitor exited");
                self.child = None;
                true
            }
            Err(err) => {
                debug!(error = %err, "inhibitor state unknown");
                self.child = None;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_unsupported() {
        let provider = InhibitWakeLock { program: None };
        assert!(!provider.is_available());
        let err = provider.request().await.err().expect("no inhibitor");
        assert!(matches!(err, WakeLockError::Unsupported(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn early_exit_is_unsupported() {
        // `false` exits at once, like an inhibitor refused by logind.
        let provider = InhibitWakeLock {
            program: which::which("false").ok(),
        };
        let err = provider.request().await.err().expect("refused");
        assert!(err.to_string().contains("exited early"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn handle_tracks_child_lifetime() {
        let child = Command::new("sleep")
            .arg("30")
            .kill_on_drop(true)
            .spawn()
            .expect("spawn sleep");
        let mut handle = InhibitHandle { child: Some(child) };
        assert!(!handle.is_released());

        handle.release();
        assert!(handle.is_released());
    }
}
