//! Line commands read from stdin

use anyhow::{anyhow, bail, Context, Result};
use lia_core::InteractionMode;
use std::path::PathBuf;

pub const HELP: &str = "\
Commands:
  <text>                      send a chat turn in the active scope
  :mode <mode> [conversation] switch scope (chat, multimodal, live)
  :live                       start or stop the live session
  :rec / :stop                record, then transcribe into the input
  :send                       send the current input
  :attach <path> [message]    send a file for analysis
  :where <lat> <lon>          share a location
  :memories                   list memories
  :remember <text>            save a memory
  :forget <id>                delete a memory
  :session                    show backend session info
  :delete <conversation>      drop a conversation in every mode
  :clear                      clear visual history
  :reset                      reset the backend session
  :help                       show this help
  :quit                       exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Say(String),
    Mode {
        mode: InteractionMode,
        conversation: Option<String>,
    },
    Live,
    Record,
    Stop,
    Send,
    Attach {
        path: PathBuf,
        message: Option<String>,
    },
    Where {
        latitude: f64,
        longitude: f64,
    },
    Memories,
    Remember(String),
    Forget(String),
    Session,
    Delete(String),
    Clear,
    Reset,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line; `None` for a blank line
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(body) = line.strip_prefix(':') else {
            return Ok(Some(Command::Say(line.to_string())));
        };

        let (name, rest) = match body.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (body, ""),
        };

        let command = match name {
            "mode" => {
                let mut parts = rest.split_whitespace();
                let mode = parts
                    .next()
                    .ok_or_else(|| anyhow!("usage: :mode <chat|multimodal|live> [conversation]"))?
                    .parse::<InteractionMode>()?;
                Command::Mode {
                    mode,
                    conversation: parts.next().map(str::to_string),
                }
            },
            "live" => Command::Live,
            "rec" | "record" => Command::Record,
            "stop" => Command::Stop,
            "send" => Command::Send,
            "attach" => {
                let (path, message) = match rest.split_once(char::is_whitespace) {
                    Some((path, message)) => (path, Some(message.trim().to_string())),
                    None => (rest, None),
                };
                if path.is_empty() {
                    bail!("usage: :attach <path> [message]");
                }
                Command::Attach {
                    path: PathBuf::from(path),
                    message: message.filter(|m| !m.is_empty()),
                }
            },
            "where" => {
                let mut parts = rest.split_whitespace();
                let mut coordinate = |label: &str| -> Result<f64> {
                    parts
                        .next()
                        .ok_or_else(|| anyhow!("usage: :where <lat> <lon>"))?
                        .parse::<f64>()
                        .with_context(|| format!("invalid {}", label))
                };
                let latitude = coordinate("latitude")?;
                let longitude = coordinate("longitude")?;
                Command::Where {
                    latitude,
                    longitude,
                }
            },
            "memories" => Command::Memories,
            "remember" => Command::Remember(required(rest, ":remember <text>")?),
            "forget" => Command::Forget(required(rest, ":forget <id>")?),
            "session" => Command::Session,
            "delete" => Command::Delete(required(rest, ":delete <conversation>")?),
            "clear" => Command::Clear,
            "reset" => Command::Reset,
            "help" | "h" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            other => bail!("unknown command ':{}', try :help", other),
        };
        Ok(Some(command))
    }
}

fn required(rest: &str, usage: &str) -> Result<String> {
    if rest.is_empty() {
        bail!("usage: {}", usage);
    }
    Ok(rest.to_string())
}

/// MIME type from a file extension, for attachments
pub fn guess_mime(path: &std::path::Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "webm" => "audio/webm",
        _ => "application/octet-stream",
    }
}
