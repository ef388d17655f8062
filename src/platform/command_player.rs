use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::process::{Child, Command};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};

use crate::error::PlaybackError;
use crate::platform::{MediaElement, MediaSignal, PlatformFuture, probe_audio_file};

const PLAYERS: [(&str, &[&str]); 4] = [
    ("ffplay", &["-nodisp", "-autoexit", "-loglevel", "quiet"]),
    ("mpv", &["--no-video", "--really-quiet"]),
    ("paplay", &[]),
    ("aplay", &["-q"]),
];

#[derive(Debug, Clone)]
pub struct PlayerProgram {
    pub name: &'static str,
    pub path: PathBuf,
    args: &'static [&'static str],
}

/// First known command-line player on `PATH`.
pub fn discover_player() -> Option<PlayerProgram> {
    PLAYERS.iter().find_map(|&(name, args)| {
        which::which(name).ok().map(|path| PlayerProgram {
            name,
            path,
            args,
        })
    })
}

pub fn player_names() -> String {
    PLAYERS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Plays the audio file by running an external player. Each play spawns a
/// child process; pausing kills it.
#[derive(Clone)]
pub struct CommandPlayer {
    inner: Arc<PlayerInner>,
}

struct PlayerInner {
    audio: PathBuf,
    program: Option<PlayerProgram>,
    loaded: AtomicBool,
    signals: broadcast::Sender<MediaSignal>,
    current: Mutex<Option<Running>>,
    generation: AtomicU64,
}

struct Running {
    generation: u64,
    stop: oneshot::Sender<()>,
}

impl PlayerInner {
    fn current(&self) -> MutexGuard<'_, Option<Running>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CommandPlayer {
    pub fn new(audio: PathBuf, program: Option<PlayerProgram>) -> Self {
        let (signals, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(PlayerInner {
                audio,
                program,
                loaded: AtomicBool::new(false),
                signals,
                current: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }
}

impl MediaElement for CommandPlayer {
    fn is_ready(&self) -> bool {
        self.inner.loaded.load(Ordering::SeqCst)
    }

    fn load(&self) -> PlatformFuture<Result<(), PlaybackError>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            probe_audio_file(&inner.audio).await?;
            inner.loaded.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    fn play(&self) -> PlatformFuture<Result<(), PlaybackError>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let Some(program) = inner.program.clone() else {
                return Err(PlaybackError::Rejected(format!(
                    "no audio player found on PATH (tried {})",
                    player_names()
                )));
            };
            if inner.current().is_some() {
                return Ok(());
            }

            let child = Command::new(&program.path)
                .args(program.args)
                .arg(&inner.audio)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn()
                .map_err(|err| {
                    PlaybackError::Rejected(format!("failed to start {}: {err}", program.name))
                })?;
            info!(player = program.name, pid = ?child.id(), "player started");

            let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let (stop, stopped) = oneshot::channel();
            *inner.current() = Some(Running { generation, stop });
            let _ = inner.signals.send(MediaSignal::Play);
            tokio::spawn(watch_child(Arc::clone(&inner), child, stopped, generation));
            Ok(())
        })
    }

    fn pause(&self) {
        let running = self.inner.current().take();
        if let Some(running) = running {
            let _ = running.stop.send(());
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<MediaSignal> {
        self.inner.signals.subscribe()
    }
}

async fn watch_child(
    inner: Arc<PlayerInner>,
    mut child: Child,
    stopped: oneshot::Receiver<()>,
    generation: u64,
) {
    let signal = tokio::select! {
        status = child.wait() => {
            match status {
                Ok(status) => debug!(%status, "player exited"),
                Err(err) => warn!(error = %err, "lost track of player process"),
            }
            MediaSignal::Ended
        }
        _ = stopped => {
            if let Err(err) = child.kill().await {
                warn!(error = %err, "failed to stop player");
            }
            MediaSignal::Pause
        }
    };

    {
        let mut current = inner.current();
        if current
            .as_ref()
            .is_some_and(|running| running.generation == generation)
        {
            *current = None;
        }
    }
    // A newer child owns the playing state now.
    if inner.generation.load(Ordering::SeqCst) != generation {
        debug!(?signal, generation, "dropping signal from replaced player");
        return;
    }
    let _ = inner.signals.send(signal);
}
