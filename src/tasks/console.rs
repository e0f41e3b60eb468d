//! # Interactive console: line producer and mailbox consumer.
//!
//! [`ConsoleSender`] turns input lines into envelopes; [`ConsoleReceiver`]
//! drains the mailbox, logs what arrives and reacts to the shutdown signal.
//!
//! ## Grammar
//! ```text
//! msg <text>              -> Text(<text>)
//! signal <integer>        -> Signal{code}
//! event <name> <payload>  -> Custom{name, payload}
//! quit                    -> Signal{0}, input loop ends
//! <anything else>         -> Error{-1, "Unknown command: <line>"}
//! ```
//!
//! ## Restarts
//! Both halves can be started again after `stop()`. The sender hands its
//! reader back when the loop ends, and the receiver ignores a self-addressed
//! wake-up left over from an earlier stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::core::ShutdownFlag;
use crate::error::TaskError;
use crate::mailbox::{Envelope, Mailbox, Message, TaskIdentity};

use super::task::Task;
use super::worker::Worker;

/// Error code carried by console parse failures.
pub const COMMAND_ERROR: i32 = -1;

/// A parsed console line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Deliver this message and keep reading.
    Send(Message),
    /// Deliver the shutdown signal and stop reading.
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Command {
        if line.trim() == "quit" {
            return Command::Quit;
        }
        if let Some(text) = line.strip_prefix("msg ") {
            return Command::Send(Message::Text(text.to_string()));
        }
        if let Some(raw) = line.strip_prefix("signal ") {
            let raw = raw.trim();
            return Command::Send(match raw.parse::<i32>() {
                Ok(code) => Message::Signal { code },
                Err(_) => Message::error(COMMAND_ERROR, format!("Invalid signal: {raw}")),
            });
        }
        if let Some((name, payload)) = line
            .strip_prefix("event ")
            .and_then(|rest| rest.split_once(' '))
            .filter(|(name, _)| !name.is_empty())
        {
            return Command::Send(Message::custom(name, payload));
        }
        Command::Send(Message::error(
            COMMAND_ERROR,
            format!("Unknown command: {line}"),
        ))
    }

    /// The message this command delivers.
    pub fn into_message(self) -> Message {
        match self {
            Command::Send(message) => message,
            Command::Quit => Message::shutdown(),
        }
    }
}

type LineSource = Box<dyn AsyncBufRead + Send + Unpin>;

/// Reads commands line by line and sends them to a fixed receiver.
pub struct ConsoleSender {
    identity: TaskIdentity,
    target: TaskIdentity,
    mailbox: Arc<Mailbox>,
    input: Arc<Mutex<Option<LineSource>>>,
    worker: Worker,
}

impl ConsoleSender {
    /// Sender with the well-known `Sender` identity addressing `Receiver`.
    pub fn new(mailbox: Arc<Mailbox>, input: impl AsyncBufRead + Send + Unpin + 'static) -> Self {
        let input: LineSource = Box::new(input);
        Self {
            identity: TaskIdentity::SENDER,
            target: TaskIdentity::RECEIVER,
            mailbox,
            input: Arc::new(Mutex::new(Some(input))),
            worker: Worker::new(TaskIdentity::SENDER.name()),
        }
    }

    /// Sender reading the process's standard input.
    pub fn stdin(mailbox: Arc<Mailbox>) -> Self {
        Self::new(mailbox, tokio::io::BufReader::new(tokio::io::stdin()))
    }

    /// Addresses envelopes to `target` instead of `Receiver`.
    pub fn with_target(mut self, target: TaskIdentity) -> Self {
        self.target = target;
        self
    }

    fn input(&self) -> MutexGuard<'_, Option<LineSource>> {
        self.input.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Returns the reader to its slot when the input loop ends, however it ends.
struct ReturnInput {
    slot: Arc<Mutex<Option<LineSource>>>,
    lines: Option<tokio::io::Lines<LineSource>>,
}

impl Drop for ReturnInput {
    fn drop(&mut self) {
        if let Some(lines) = self.lines.take() {
            *self.slot.lock().unwrap_or_else(|p| p.into_inner()) = Some(lines.into_inner());
        }
    }
}

#[async_trait]
impl Task for ConsoleSender {
    fn identity(&self) -> &TaskIdentity {
        &self.identity
    }

    fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    async fn start(&self) -> Result<(), TaskError> {
        if self.worker.is_running() {
            return Ok(());
        }
        let input = self
            .input()
            .take()
            .ok_or_else(|| TaskError::start("console input unavailable"))?;

        let mailbox = Arc::clone(&self.mailbox);
        let sender = self.identity.clone();
        let target = self.target.clone();
        let reader = ReturnInput {
            slot: Arc::clone(&self.input),
            lines: Some(input.lines()),
        };
        self.worker.spawn(move |token| async move {
            let mut reader = reader;
            let Some(lines) = reader.lines.as_mut() else {
                return;
            };
            loop {
                // next_line() is cancel safe, so no partial line is lost on stop.
                let line = tokio::select! {
                    _ = token.cancelled() => break,
                    line = lines.next_line() => line,
                };
                match line {
                    Ok(Some(line)) => {
                        let command = Command::parse(&line);
                        let quit = command == Command::Quit;
                        let message = command.into_message();
                        debug!(%sender, %target, kind = message.as_label(), "console command");
                        mailbox.send(Envelope::new(sender.clone(), target.clone(), message));
                        if quit {
                            info!("console quit requested");
                            break;
                        }
                    }
                    Ok(None) => {
                        info!("console input closed");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "console read failed");
                        break;
                    }
                }
            }
        });
        info!(task = %self.identity, "task started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), TaskError> {
        self.worker.shutdown().await
    }
}

/// Consumes envelopes from the mailbox until the shutdown signal arrives.
pub struct ConsoleReceiver {
    identity: TaskIdentity,
    mailbox: Arc<Mailbox>,
    shutdown: ShutdownFlag,
    stopping: Arc<AtomicBool>,
    worker: Worker,
}

impl ConsoleReceiver {
    pub fn new(mailbox: Arc<Mailbox>, shutdown: ShutdownFlag) -> Self {
        Self {
            identity: TaskIdentity::RECEIVER,
            mailbox,
            shutdown,
            stopping: Arc::new(AtomicBool::new(false)),
            worker: Worker::new(TaskIdentity::RECEIVER.name()),
        }
    }
}

#[async_trait]
impl Task for ConsoleReceiver {
    fn identity(&self) -> &TaskIdentity {
        &self.identity
    }

    fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    async fn start(&self) -> Result<(), TaskError> {
        if self.worker.is_running() {
            return Ok(());
        }
        self.stopping.store(false, Ordering::Release);

        let mailbox = Arc::clone(&self.mailbox);
        let shutdown = self.shutdown.clone();
        let stopping = Arc::clone(&self.stopping);
        let identity = self.identity.clone();
        // The loop blocks on receive() only; it is woken by a Signal(0) envelope.
        let spawned = self.worker.spawn(move |_token| async move {
            loop {
                let envelope = mailbox.receive().await;
                if envelope.payload().is_shutdown() && envelope.sender() == &identity {
                    if stopping.load(Ordering::Acquire) {
                        debug!("stop wake-up received");
                        break;
                    }
                    debug!("discarding stale stop wake-up");
                    continue;
                }
                info!(
                    from = %envelope.sender(),
                    to = %envelope.receiver(),
                    message = %envelope.payload(),
                    "envelope received"
                );
                if envelope.payload().is_shutdown() {
                    shutdown.trigger();
                    info!("shutdown signal received");
                    break;
                }
            }
        });
        if spawned {
            info!(task = %self.identity, "task started");
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), TaskError> {
        self.stopping.store(true, Ordering::Release);
        if self.worker.is_running() {
            self.mailbox.send(Envelope::new(
                self.identity.clone(),
                self.identity.clone(),
                Message::shutdown(),
            ));
        }
        self.worker.shutdown().await
    }
}
