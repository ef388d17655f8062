use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};

use crate::error::PlaybackError;
use crate::platform::{MediaElement, MediaSignal, PlatformFuture, probe_audio_file};

const END_POLL: Duration = Duration::from_millis(100);

enum AudioCommand {
    Play(oneshot::Sender<Result<(), PlaybackError>>),
    Pause,
}

/// In-process playback. The output stream lives on its own thread because
/// it cannot move between threads on every platform.
#[derive(Clone)]
pub struct RodioPlayer {
    audio: Arc<PathBuf>,
    loaded: Arc<AtomicBool>,
    commands: mpsc::Sender<AudioCommand>,
    signals: broadcast::Sender<MediaSignal>,
}

impl RodioPlayer {
    pub fn spawn(audio: PathBuf) -> std::io::Result<Self> {
        let (commands, rx) = mpsc::channel();
        let (signals, _) = broadcast::channel(16);
        let thread_audio = audio.clone();
        let thread_signals = signals.clone();
        thread::Builder::new()
            .name("autoplay-audio".to_string())
            .spawn(move || audio_thread(thread_audio, rx, thread_signals))?;
        Ok(Self {
            audio: Arc::new(audio),
            loaded: Arc::new(AtomicBool::new(false)),
            commands,
            signals,
        })
    }
}

impl MediaElement for RodioPlayer {
    fn is_ready(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    fn load(&self) -> PlatformFuture<Result<(), PlaybackError>> {
        let audio = Arc::clone(&self.audio);
        let loaded = Arc::clone(&self.loaded);
        Box::pin(async move {
            probe_audio_file(&audio).await?;
            loaded.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    fn play(&self) -> PlatformFuture<Result<(), PlaybackError>> {
        let (reply, response) = oneshot::channel();
        let sent = self.commands.send(AudioCommand::Play(reply)).is_ok();
        Box::pin(async move {
            if !sent {
                return Err(thread_stopped());
            }
            response.await.unwrap_or_else(|_| Err(thread_stopped()))
        })
    }

    fn pause(&self) {
        let _ = self.commands.send(AudioCommand::Pause);
    }

    fn subscribe(&self) -> broadcast::Receiver<MediaSignal> {
        self.signals.subscribe()
    }
}

fn thread_stopped() -> PlaybackError {
    PlaybackError::Rejected("audio thread stopped".to_string())
}

fn audio_thread(
    audio: PathBuf,
    commands: mpsc::Receiver<AudioCommand>,
    signals: broadcast::Sender<MediaSignal>,
) {
    let mut stream: Option<OutputStream> = None;
    let mut sink: Option<Sink> = None;

    loop {
        match commands.recv_timeout(END_POLL) {
            Ok(AudioCommand::Play(reply)) => {
                if sink.as_ref().is_some_and(|sink| !sink.empty()) {
                    let _ = reply.send(Ok(()));
                    continue;
                }
                let result = start(&audio, &mut stream).map(|started| {
                    sink = Some(started);
                    let _ = signals.send(MediaSignal::Play);
                });
                let _ = reply.send(result);
            }
            Ok(AudioCommand::Pause) => {
                if let Some(sink) = sink.take() {
                    sink.stop();
                    let _ = signals.send(MediaSignal::Pause);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if sink.as_ref().is_some_and(Sink::empty) {
                    sink = None;
                    debug!("track finished");
                    let _ = signals.send(MediaSignal::Ended);
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn start(audio: &Path, stream: &mut Option<OutputStream>) -> Result<Sink, PlaybackError> {
    if stream.is_none() {
        let opened = OutputStreamBuilder::open_default_stream()
            .map_err(|err| PlaybackError::Rejected(format!("no audio output: {err}")))?;
        info!("audio output opened");
        *stream = Some(opened);
    }
    let Some(output) = stream.as_ref() else {
        return Err(PlaybackError::Rejected("no audio output".to_string()));
    };

    let file = File::open(audio)
        .map_err(|err| PlaybackError::LoadFailed(format!("{}: {err}", audio.display())))?;
    let decoder = Decoder::new(file).map_err(|err| {
        warn!(error = %err, "unsupported audio format");
        PlaybackError::Rejected(format!("cannot decode {}: {err}", audio.display()))
    })?;
    let sink = Sink::connect_new(output.mixer());
    sink.append(decoder);
    sink.play();
    Ok(sink)
}
