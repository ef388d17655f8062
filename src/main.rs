mod command;
mod coordinator;
mod diagnostics;
mod error;
mod platform;
mod playback;
mod repeat;
mod schedule;
mod session;
mod time_of_day;
mod time_provider;
mod visibility;
mod wake_lock;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::NaiveTime;
use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::coordinator::{Coordinator, Platform};
use crate::diagnostics::DiagnosticsReport;
use crate::platform::MediaElement;
use crate::platform::command_player::{
    CommandPlayer, PlayerProgram, discover_player, player_names,
};
use crate::platform::console::{ConsoleVisibility, run_console};
use crate::platform::inhibit::InhibitWakeLock;
use crate::platform::notify::DesktopNotifier;
#[cfg(feature = "rodio")]
use crate::platform::rodio_player::RodioPlayer;
use crate::schedule::model::{ScheduleConfig, ScheduleMode, load_schedule_config};
use crate::time_of_day::TimeOfDay;
use crate::time_provider::{ClockSource, SelectedTimeProvider, select_provider};
use crate::visibility::VisibilityMonitor;

const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliMode {
    Default,
    Custom,
}

impl From<CliMode> for ScheduleMode {
    fn from(value: CliMode) -> Self {
        match value {
            CliMode::Default => ScheduleMode::Default,
            CliMode::Custom => ScheduleMode::Custom,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliPlayer {
    Auto,
    Command,
    Rodio,
}

#[derive(Parser, Debug)]
#[command(
    name = "autoplay",
    version,
    about = "Plays an audio file once when the clock reaches a chosen time"
)]
struct Cli {
    /// JSON schedule file; built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    audio: Option<PathBuf>,

    #[arg(long, value_enum)]
    mode: Option<CliMode>,

    /// Custom play time.
    #[arg(long, value_name = "HH:MM")]
    time: Option<TimeOfDay>,

    #[arg(long, value_name = "HH:MM")]
    default_time: Option<TimeOfDay>,

    #[arg(long, value_enum, default_value_t = CliPlayer::Auto)]
    player: CliPlayer,

    /// Run the clock from this wall-clock time instead of now.
    #[arg(long, value_name = "HH:MM:SS", value_parser = parse_start_at)]
    start_at: Option<NaiveTime>,

    #[arg(long)]
    diagnostics: bool,

    /// Do not read commands from stdin.
    #[arg(long)]
    no_console: bool,
}

enum MediaBackend {
    Command(Option<PlayerProgram>),
    #[cfg(feature = "rodio")]
    Rodio,
}

impl MediaBackend {
    fn choose(choice: CliPlayer) -> Result<Self> {
        match choice {
            #[cfg(feature = "rodio")]
            CliPlayer::Auto | CliPlayer::Rodio => Ok(MediaBackend::Rodio),
            #[cfg(not(feature = "rodio"))]
            CliPlayer::Rodio => {
                bail!("--player rodio needs a build with the `rodio` feature; use --player command")
            }
            #[cfg(not(feature = "rodio"))]
            CliPlayer::Auto => Ok(MediaBackend::Command(discover_player())),
            CliPlayer::Command => match discover_player() {
                Some(program) => Ok(MediaBackend::Command(Some(program))),
                None => bail!("no audio player found on PATH (tried {})", player_names()),
            },
        }
    }

    fn describe(&self) -> String {
        match self {
            MediaBackend::Command(Some(program)) => {
                format!("{} ({})", program.name, program.path.display())
            }
            MediaBackend::Command(None) => format!("none found (tried {})", player_names()),
            #[cfg(feature = "rodio")]
            MediaBackend::Rodio => "rodio (in-process)".to_string(),
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = resolve_config(&cli)?;
    let backend = MediaBackend::choose(cli.player)?;
    let clock = select_provider(cli.start_at);

    if cli.diagnostics {
        let wake_lock = InhibitWakeLock::discover();
        let report = DiagnosticsReport::collect(
            &config,
            &clock,
            &backend.describe(),
            wake_lock.is_available(),
        );
        report.print();
        return Ok(());
    }
    if let MediaBackend::Command(None) = backend {
        warn!(tried = %player_names(), "no audio player found, playback will be rejected");
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let result = runtime.block_on(run_session(config, clock, backend, !cli.no_console));
    // stdin reads can hold a blocking thread open indefinitely.
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("autoplay=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<ScheduleConfig> {
    let mut config = match &cli.config {
        Some(path) => load_schedule_config(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ScheduleConfig::default(),
    };
    if let Some(audio) = &cli.audio {
        config.audio = audio.clone();
    }
    if let Some(mode) = cli.mode {
        config.mode = mode.into();
    }
    if let Some(time) = cli.time {
        config.custom_time = time;
    }
    if let Some(time) = cli.default_time {
        config.default_time = time;
    }
    Ok(config)
}

fn parse_start_at(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .map_err(|_| format!("invalid start time '{value}', expected HH:MM:SS"))
}

async fn run_session(
    config: ScheduleConfig,
    clock: SelectedTimeProvider,
    backend: MediaBackend,
    console: bool,
) -> Result<()> {
    match backend {
        MediaBackend::Command(program) => {
            let media = CommandPlayer::new(config.audio.clone(), program);
            drive(config, clock, media, console).await
        }
        #[cfg(feature = "rodio")]
        MediaBackend::Rodio => {
            let media = RodioPlayer::spawn(config.audio.clone())
                .context("failed to start audio thread")?;
            drive(config, clock, media, console).await
        }
    }
}

async fn drive<M: MediaElement>(
    config: ScheduleConfig,
    clock: SelectedTimeProvider,
    media: M,
    console: bool,
) -> Result<()> {
    let lifetime = CancellationToken::new();
    let (commands, command_rx) = mpsc::channel(32);
    let visibility = ConsoleVisibility::new();

    info!(clock = clock.label, audio = %config.audio.display(), "starting session");
    let coordinator = Coordinator::new(
        &config,
        Platform {
            clock: ClockSource::new(clock.provider),
            media,
            wake_lock: InhibitWakeLock::discover(),
            notifier: DesktopNotifier::new(config.notification.permission),
        },
        VisibilityMonitor::new(&visibility),
        command_rx,
        lifetime.clone(),
    );
    let snapshots = coordinator.snapshots();

    let interrupt = lifetime.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = interrupt.cancelled() => {}
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    info!("interrupted");
                    interrupt.cancel();
                }
                Err(err) => warn!(error = %err, "cannot listen for Ctrl-C"),
            },
        }
    });

    let console_task = console.then(|| {
        tokio::spawn(run_console(
            commands,
            visibility,
            snapshots,
            lifetime.clone(),
        ))
    });

    let session = coordinator.run().await;
    if let Some(task) = console_task {
        task.abort();
    }
    info!(
        mode = %session.mode,
        target = %session.active_target(),
        "session finished"
    );
    Ok(())
}
