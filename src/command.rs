use crate::error::CommandError;
use crate::platform::Visibility;
use crate::repeat::AdjustAction;
use crate::schedule::model::ScheduleMode;
use crate::time_of_day::TimeOfDay;

/// Operations the coordinator performs on behalf of the user.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Command {
    TogglePlayback,
    SetMode(ModeChange),
    SetCustomTime(TimeOfDay),
    Press(AdjustAction),
    /// `None` releases every control.
    Release(Option<AdjustAction>),
    Quit,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ModeChange {
    Set(ScheduleMode),
    Toggle,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ConsoleInput {
    Session(Command),
    Visibility(Visibility),
    Status { json: bool },
    Help,
}

pub const HELP: &str = "\
commands:
  toggle                      play or pause now
  mode default|custom|toggle  choose which time triggers playback
  set HH:MM                   set the custom time
  press <control>             hold hour-up, hour-down, minute-up or minute-down
  release [control]           let go of one control, or all of them
  hide | show                 mark the session hidden or visible
  status [--json]             print the current state
  quit                        end the session";

/// Blank lines yield `Ok(None)`.
pub fn parse_console_line(line: &str) -> Result<Option<ConsoleInput>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    let input = match head.to_ascii_lowercase().as_str() {
        "toggle" | "play" | "pause" => ConsoleInput::Session(Command::TogglePlayback),
        "mode" => {
            let change = match arg.map(str::to_ascii_lowercase).as_deref() {
                Some("default") => ModeChange::Set(ScheduleMode::Default),
                Some("custom") => ModeChange::Set(ScheduleMode::Custom),
                Some("toggle") | None => ModeChange::Toggle,
                Some(_) => return Err(CommandError::Usage("mode default|custom|toggle")),
            };
            ConsoleInput::Session(Command::SetMode(change))
        }
        "set" => {
            let text = arg.ok_or(CommandError::Usage("set HH:MM"))?;
            ConsoleInput::Session(Command::SetCustomTime(TimeOfDay::parse_lenient(text)))
        }
        "press" => {
            let control = arg.ok_or(CommandError::Usage("press <control>"))?;
            ConsoleInput::Session(Command::Press(control.parse()?))
        }
        "release" => {
            let control = arg.map(str::parse::<AdjustAction>).transpose()?;
            ConsoleInput::Session(Command::Release(control))
        }
        "hide" => ConsoleInput::Visibility(Visibility::Hidden),
        "show" => ConsoleInput::Visibility(Visibility::Visible),
        "status" => ConsoleInput::Status {
            json: arg == Some("--json"),
        },
        "help" | "?" => ConsoleInput::Help,
        "quit" | "exit" => ConsoleInput::Session(Command::Quit),
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(input))
}
