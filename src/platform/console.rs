use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::command::{Command, ConsoleInput, HELP, parse_console_line};
use crate::platform::{Visibility, VisibilitySignal};
use crate::session::SessionSnapshot;

/// Visibility driven by the `hide` and `show` console commands.
pub struct ConsoleVisibility {
    tx: watch::Sender<Visibility>,
}

impl ConsoleVisibility {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Visibility::Visible);
        Self { tx }
    }

    pub fn set(&self, visibility: Visibility) {
        self.tx.send_replace(visibility);
    }
}

impl Default for ConsoleVisibility {
    fn default() -> Self {
        Self::new()
    }
}

impl VisibilitySignal for ConsoleVisibility {
    fn is_hidden(&self) -> bool {
        *self.tx.borrow() == Visibility::Hidden
    }

    fn subscribe(&self) -> watch::Receiver<Visibility> {
        self.tx.subscribe()
    }
}

pub fn render_status(snapshot: &SessionSnapshot, json: bool) -> String {
    if !json {
        return snapshot.summary_line();
    }
    serde_json::to_string_pretty(snapshot).unwrap_or_else(|err| {
        warn!(error = %err, "failed to encode status");
        snapshot.summary_line()
    })
}

/// Reads commands from stdin until EOF, `quit`, or the session ends.
pub async fn run_console(
    commands: mpsc::Sender<Command>,
    visibility: ConsoleVisibility,
    snapshots: watch::Receiver<SessionSnapshot>,
    lifetime: CancellationToken,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("type 'help' for commands");

    loop {
        let line = tokio::select! {
            _ = lifetime.cancelled() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("console input closed");
                break;
            }
            Err(err) => {
                warn!(error = %err, "console read failed");
                break;
            }
        };

        match parse_console_line(&line) {
            Ok(None) => {}
            Ok(Some(ConsoleInput::Session(command))) => {
                if commands.send(command).await.is_err() {
                    break;
                }
            }
            Ok(Some(ConsoleInput::Visibility(state))) => visibility.set(state),
            Ok(Some(ConsoleInput::Status { json })) => {
                let snapshot = snapshots.borrow().clone();
                println!("{}", render_status(&snapshot, json));
            }
            Ok(Some(ConsoleInput::Help)) => println!("{HELP}"),
            Err(err) => println!("{err}"),
        }
    }
}
