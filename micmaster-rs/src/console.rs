//! Line-oriented console front end.
//!
//! A reader thread turns stdin lines into [`Command`]s on the event queue;
//! [`ConsolePresenter`] prints what the control thread reports.

use crate::app::Presenter;
use crate::audio::NotificationMode;
use crate::events::{AppEvent, Command, EventSender};
use crate::settings::Theme;
use std::io::{self, BufRead, Write};
use std::thread::{self, JoinHandle};
use tracing::{info, trace, warn};

pub const HELP: &str = "\
Commands:
  toggle | mute | unmute          change the microphone mute state
  volume <0-100>                  set the microphone volume
  record                          record a new hotkey (press it next)
  stop                            cancel or finish a recording
  profiles                        list profiles
  switch <index>                  activate a profile
  create <name>                   add a profile
  rename <old> <new>              rename a profile
  delete <name>                   remove a profile
  watch <exe> | unwatch <exe>     edit the auto-mute list
  automute on|off                 enable or disable auto-mute
  notify desktop|sound|off        choose mute notifications
  theme dark|light                choose the theme
  tray on|off                     show or hide the tray icon
  logging on|off                  write the log file
  startup on|off                  launch at login
  reset                           reset the active profile
  processes                       list running applications
  update | install                check for and install updates
  status                          show the microphone state
  quit                            exit";

/// Parse one console line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "toggle" => Command::ToggleMute,
        "mute" => Command::SetMute(true),
        "unmute" => Command::SetMute(false),
        "volume" => Command::SetVolume(
            rest.parse()
                .map_err(|_| format!("'{rest}' is not a volume between 0 and 100"))?,
        ),
        "record" => Command::StartRecording,
        "stop" => Command::StopRecording,
        "profiles" => Command::ListProfiles,
        "switch" => Command::SwitchProfile(
            rest.parse()
                .map_err(|_| format!("'{rest}' is not a profile index"))?,
        ),
        "create" => Command::CreateProfile(required(rest, "create <name>")?),
        "rename" => {
            let (from, to) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| "usage: rename <old> <new>".to_string())?;
            Command::RenameProfile {
                from: from.to_string(),
                to: to.trim().to_string(),
            }
        }
        "delete" => Command::DeleteProfile(required(rest, "delete <name>")?),
        "watch" => Command::WatchApp(required(rest, "watch <exe>")?),
        "unwatch" => Command::UnwatchApp(required(rest, "unwatch <exe>")?),
        "automute" => Command::SetAutoMute(on_off(rest)?),
        "notify" => Command::SetNotifications(match rest.to_ascii_lowercase().as_str() {
            "desktop" => NotificationMode::Desktop,
            "sound" => NotificationMode::Sound,
            "off" => NotificationMode::Off,
            _ => return Err("usage: notify desktop|sound|off".to_string()),
        }),
        "theme" => Command::SetTheme(rest.parse::<Theme>()?),
        "tray" => Command::SetTray(on_off(rest)?),
        "logging" => Command::SetLogging(on_off(rest)?),
        "startup" => Command::SetStartup(on_off(rest)?),
        "reset" => Command::ResetProfile,
        "processes" => Command::ListProcesses,
        "update" => Command::CheckForUpdate,
        "install" => Command::InstallUpdate,
        "status" => Command::Status,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command '{other}'. Type 'help'.")),
    };
    Ok(Some(command))
}

fn required(rest: &str, usage: &str) -> Result<String, String> {
    if rest.is_empty() {
        Err(format!("usage: {usage}"))
    } else {
        Ok(rest.to_string())
    }
}

fn on_off(rest: &str) -> Result<bool, String> {
    match rest.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err(format!("expected 'on' or 'off', got '{rest}'")),
    }
}

/// Read commands from stdin until EOF, then ask the app to quit.
///
/// The thread blocks in `read_line` and is not joined on shutdown.
pub fn spawn_reader(sink: EventSender) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "Failed to read console input");
                        break;
                    }
                };
                if line.trim().eq_ignore_ascii_case("help") {
                    println!("{HELP}");
                    continue;
                }
                match parse_command(&line) {
                    Ok(Some(command)) => {
                        if sink.send(AppEvent::Command(command)).is_err() {
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(message) => eprintln!("{message}"),
                }
            }
            info!("Console input closed");
            let _ = sink.send(AppEvent::Command(Command::Quit));
        })
}

/// Prints status and errors to the terminal.
#[derive(Default)]
pub struct ConsolePresenter {
    theme: Option<Theme>,
}

impl ConsolePresenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn line(&self, text: &str) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }
}

impl Presenter for ConsolePresenter {
    fn status(&mut self, text: &str) {
        self.line(text);
    }

    fn error(&mut self, title: &str, message: &str) {
        eprintln!("[{title}] {message}");
    }

    fn hotkey_label(&mut self, text: &str) {
        self.line(text);
    }

    fn audio_level(&mut self, level: u8) {
        trace!(level, "Input level");
    }

    fn list(&mut self, title: &str, items: &[String]) {
        self.line(&format!("{title}:"));
        if items.is_empty() {
            self.line("  (none)");
        }
        for item in items {
            self.line(&format!("  {item}"));
        }
    }

    fn presentation(&mut self, theme: Theme, tray_enabled: bool) {
        if self.theme != Some(theme) {
            self.theme = Some(theme);
            info!(%theme, tray_enabled, "Presentation settings applied");
        }
    }
}
