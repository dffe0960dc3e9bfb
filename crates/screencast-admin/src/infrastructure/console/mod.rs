//! Line-oriented operator console.
//!
//! Commands:
//!
//! | Command            | Effect                                             |
//! |--------------------|----------------------------------------------------|
//! | `list`             | Known senders in discovery order, 1-based          |
//! | `start <n \| ip>`  | Start streaming from sender `n` or address `ip`    |
//! | `stop`             | Stop the active stream                             |
//! | `status`           | Show the session state                             |
//! | `help`             | Show this table                                    |
//! | `quit`             | Leave the console                                  |
//!
//! Newly discovered senders are announced between commands.
//!
//! Stdin is read on a dedicated OS thread ([`spawn_stdin_reader`]) because a
//! blocking stdin read on a runtime thread would keep the runtime from shutting
//! down.  [`Console::run`] consumes the lines from a channel, which also makes
//! the console drivable from tests.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::application::manage_senders::{RegistryEvent, SenderRecord, SenderRegistry};
use crate::application::stream_session::{
    SessionState, StartOutcome, StopOutcome, StreamSessionManager,
};

const HELP: &str = "\
commands:
  list              show known senders
  start <n | ip>    stream from sender n (see list) or by address
  stop              stop the active stream
  status            show the session state
  help              show this help
  quit              exit";

/// How the operator picked a sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// 1-based position in `list` output.
    Index(usize),
    Address(IpAddr),
}

/// A parsed console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    List,
    Start(Selector),
    Stop,
    Status,
    Help,
    Quit,
}

/// Error type for console input that is not a command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    #[error("`start` needs a sender number or address")]
    MissingSelector,
    #[error("`{0}` is neither a sender number nor an IP address")]
    InvalidSelector(String),
}

impl ConsoleCommand {
    /// Parses one input line.  Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "list" | "ls" => ConsoleCommand::List,
            "start" => {
                let arg = words.next().ok_or(CommandError::MissingSelector)?;
                ConsoleCommand::Start(parse_selector(arg)?)
            }
            "stop" => ConsoleCommand::Stop,
            "status" => ConsoleCommand::Status,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            _ => return Err(CommandError::Unknown(verb.to_string())),
        };
        Ok(Some(command))
    }
}

fn parse_selector(arg: &str) -> Result<Selector, CommandError> {
    if let Ok(index) = arg.parse::<usize>() {
        if index >= 1 {
            return Ok(Selector::Index(index));
        }
    }
    arg.parse::<IpAddr>()
        .map(Selector::Address)
        .map_err(|_| CommandError::InvalidSelector(arg.to_string()))
}

/// Whether the console should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Executes operator commands against the registry and the session manager.
pub struct Console<W> {
    registry: Arc<SenderRegistry>,
    session: Arc<StreamSessionManager>,
    out: W,
}

impl<W: AsyncWrite + Unpin> Console<W> {
    pub fn new(registry: Arc<SenderRegistry>, session: Arc<StreamSessionManager>, out: W) -> Self {
        Self {
            registry,
            session,
            out,
        }
    }

    /// Reads lines until `quit` or until the input channel closes.
    ///
    /// Registry events are announced as they arrive.
    ///
    /// # Errors
    ///
    /// Returns an error only if writing to the output fails.
    pub async fn run(
        &mut self,
        mut lines: mpsc::Receiver<String>,
        mut events: broadcast::Receiver<RegistryEvent>,
    ) -> std::io::Result<()> {
        self.say(HELP).await?;
        let mut events_open = true;

        loop {
            tokio::select! {
                line = lines.recv() => {
                    let Some(line) = line else {
                        debug!("console input closed");
                        return Ok(());
                    };
                    if self.handle_line(&line).await? == Flow::Quit {
                        return Ok(());
                    }
                }
                event = events.recv(), if events_open => match event {
                    Ok(event) => self.announce(event).await?,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "console missed registry events");
                    }
                    Err(broadcast::error::RecvError::Closed) => events_open = false,
                },
            }
        }
    }

    /// Parses and executes one line.
    pub async fn handle_line(&mut self, line: &str) -> std::io::Result<Flow> {
        match ConsoleCommand::parse(line) {
            Ok(Some(command)) => self.execute(command).await,
            Ok(None) => Ok(Flow::Continue),
            Err(e) => {
                self.say(&e.to_string()).await?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Executes one command.
    pub async fn execute(&mut self, command: ConsoleCommand) -> std::io::Result<Flow> {
        match command {
            ConsoleCommand::List => self.list().await?,
            ConsoleCommand::Start(selector) => self.start(selector).await?,
            ConsoleCommand::Stop => self.stop().await?,
            ConsoleCommand::Status => self.status().await?,
            ConsoleCommand::Help => self.say(HELP).await?,
            ConsoleCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    async fn list(&mut self) -> std::io::Result<()> {
        let senders = self.registry.snapshot();
        if senders.is_empty() {
            return self.say("no senders discovered yet").await;
        }
        let active = self.session.state().await.active_peer();
        let now = Instant::now();
        let mut text = String::new();
        for (i, sender) in senders.iter().enumerate() {
            let marker = if Some(sender.address) == active { '*' } else { ' ' };
            let age = now.saturating_duration_since(sender.last_seen_at).as_secs();
            text.push_str(&format!(
                "{marker} {:>3}  {:<39}  seen {age}s ago\n",
                i + 1,
                sender.address
            ));
        }
        self.say(text.trim_end()).await
    }

    async fn start(&mut self, selector: Selector) -> std::io::Result<()> {
        let Some(sender) = self.resolve(selector) else {
            let text = match selector {
                Selector::Index(n) => format!("no sender #{n} (see `list`)"),
                Selector::Address(ip) => format!("{ip} has not announced itself"),
            };
            return self.say(&text).await;
        };

        let text = match self.session.request_start(&sender).await {
            Ok(StartOutcome::Started { session_id }) => {
                format!("streaming from {} (session {session_id})", sender.address)
            }
            Ok(StartOutcome::AlreadyActive { current }) => {
                format!("already streaming from {current}; `stop` it first")
            }
            Err(e) => format!("start failed: {e}"),
        };
        self.say(&text).await
    }

    async fn stop(&mut self) -> std::io::Result<()> {
        let text = match self.session.request_stop().await {
            StopOutcome::NothingToStop => "nothing to stop".to_string(),
            StopOutcome::Stopped(report) => match report.notify_result {
                Ok(()) => format!("stopped {}", report.peer),
                Err(e) => format!("stopped {} locally; sender not notified: {e}", report.peer),
            },
        };
        self.say(&text).await
    }

    async fn status(&mut self) -> std::io::Result<()> {
        let text = match self.session.state().await {
            SessionState::Idle => "idle".to_string(),
            SessionState::Active { peer, session_id } => {
                format!("streaming from {} (session {session_id})", peer.address)
            }
        };
        self.say(&text).await
    }

    async fn announce(&mut self, event: RegistryEvent) -> std::io::Result<()> {
        let text = match event {
            RegistryEvent::SenderDiscovered(record) => {
                format!("+ sender {} discovered", record.address)
            }
            RegistryEvent::SenderExpired(address) => format!("- sender {address} expired"),
        };
        self.say(&text).await
    }

    fn resolve(&self, selector: Selector) -> Option<SenderRecord> {
        match selector {
            Selector::Index(n) => self.registry.get(n - 1),
            Selector::Address(ip) => self.registry.find(ip),
        }
    }

    async fn say(&mut self, text: &str) -> std::io::Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await
    }
}

/// Spawns a thread that forwards stdin lines to the returned channel.
///
/// The channel closes at end of input.
pub fn spawn_stdin_reader() -> std::io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::Builder::new()
        .name("screencast-console".to_string())
        .spawn(move || {
            use std::io::BufRead;
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
