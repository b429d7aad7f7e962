//! # IPC Worker
//!
//! The parent web process talks to the proxy over stdin/stdout, one JSON object
//! per line in each direction. Every instruction runs as its own task, so a
//! slow poll never delays a command. Output lines are written by a single task
//! and never interleave.
//!
//! Inbound:
//! - `{"type":"poll","networks":[...]}`
//! - `{"type":"scan_poll","networks":[...]}`
//! - `{"type":"<command>","id":..,"network":{..},"minion":"",..params}`

use std::io;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::command;
use crate::dispatcher::Dispatcher;
use crate::endpoint::ManagedNetwork;
use crate::error::ProxyError;
use crate::poller::PollUpdate;
use crate::poller::Poller;
use crate::registry::Response;

/// Result line for one command instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResult {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Echoed from the instruction.
    pub id: Value,
    pub command: String,
    pub success: bool,
    pub response_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Response>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub error: String,
}

/// Anything written to stdout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    Poll(PollUpdate),
    Command(CommandResult),
    Error(ErrorReport),
}

impl From<PollUpdate> for Outbound {
    fn from(update: PollUpdate) -> Self {
        Outbound::Poll(update)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Instruction {
    Poll(Vec<ManagedNetwork>),
    ScanPoll(Vec<ManagedNetwork>),
    Command {
        id: Value,
        name: String,
        network: ManagedNetwork,
        minion: String,
        params: Value,
    },
    /// A command name nobody handles. Answered without looking at the rest.
    Unknown { id: Value, name: String },
}

#[derive(Deserialize)]
struct NetworkList {
    networks: Vec<ManagedNetwork>,
}

#[derive(Deserialize)]
struct CommandHeader {
    #[serde(default)]
    id: Value,
    network: ManagedNetwork,
    #[serde(default)]
    minion: String,
}

fn parse_instruction(line: &str) -> Result<Instruction, String> {
    let value: Value = serde_json::from_str(line).map_err(|e| format!("invalid JSON: {}", e))?;
    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        return Err("instruction has no \"type\"".to_string());
    };

    match kind {
        "poll" | "scan_poll" => {
            let list: NetworkList =
                serde_json::from_value(value.clone()).map_err(|e| format!("invalid {}: {}", kind, e))?;
            if kind == "poll" {
                Ok(Instruction::Poll(list.networks))
            } else {
                Ok(Instruction::ScanPoll(list.networks))
            }
        }
        name if command::lookup(name).is_none() => Ok(Instruction::Unknown {
            id: value.get("id").cloned().unwrap_or(Value::Null),
            name: name.to_string(),
        }),
        name => {
            let name = name.to_string();
            let header: CommandHeader =
                serde_json::from_value(value.clone()).map_err(|e| format!("invalid {}: {}", name, e))?;

            // what is left are the command's own parameters
            let mut params = value;
            if let Some(object) = params.as_object_mut() {
                for key in ["type", "id", "network", "minion"] {
                    object.remove(key);
                }
            }
            Ok(Instruction::Command {
                id: header.id,
                name,
                network: header.network,
                minion: header.minion,
                params,
            })
        }
    }
}

fn emit(out: &mpsc::UnboundedSender<Outbound>, message: Outbound) {
    if out.send(message).is_err() {
        debug!("output closed, dropping result");
    }
}

fn reap(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "instruction task failed");
    }
}

pub struct Worker {
    dispatcher: Arc<Dispatcher>,
    poller: Poller,
    in_flight: AtomicUsize,
}

impl Worker {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        let poller = Poller::new(dispatcher.clone());
        Self { dispatcher, poller, in_flight: AtomicUsize::new(0) }
    }

    /// Instruction tasks spawned by [`Worker::run`] and not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Serves instructions until `input` ends, then waits for every
    /// outstanding instruction and flushes its output.
    ///
    /// Finished instruction tasks are reaped while input is still being read.
    pub async fn run<R, W>(self: Arc<Self>, input: R, output: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

        let writer = tokio::spawn(async move {
            let mut output = output;
            while let Some(message) = rx.recv().await {
                let mut line = serde_json::to_vec(&message)?;
                line.push(b'\n');
                output.write_all(&line).await?;
                output.flush().await?;
            }
            Ok::<_, io::Error>(())
        });

        let mut tasks = JoinSet::new();
        let mut lines = input.lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let worker = self.clone();
                    let out = tx.clone();
                    tasks.spawn(async move { worker.handle_line(&line, &out).await });
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => reap(joined),
            }
            self.in_flight.store(tasks.len(), Ordering::Relaxed);
        }

        while let Some(joined) = tasks.join_next().await {
            reap(joined);
            self.in_flight.store(tasks.len(), Ordering::Relaxed);
        }

        drop(tx);
        writer.await.map_err(io::Error::other)?
    }

    /// Handles one instruction line, writing its results to `out`.
    pub async fn handle_line(&self, line: &str, out: &mpsc::UnboundedSender<Outbound>) {
        let instruction = match parse_instruction(line) {
            Ok(instruction) => instruction,
            Err(reason) => {
                warn!(reason = %reason, "malformed instruction");
                emit(out, Outbound::Error(ErrorReport { kind: "error", error: reason }));
                return;
            }
        };

        match instruction {
            Instruction::Poll(networks) => self.poller.poll(&networks, out).await,
            Instruction::ScanPoll(networks) => self.poller.scan_poll(&networks, out).await,
            Instruction::Unknown { id, name } => {
                let error = ProxyError::UnknownCommand(name.clone()).to_string();
                warn!(command = %name, "unknown command");
                emit(
                    out,
                    Outbound::Command(CommandResult {
                        kind: "command_result",
                        id,
                        command: name,
                        success: false,
                        response_time: 0,
                        result: None,
                        error: Some(error),
                    }),
                );
            }
            Instruction::Command { id, name, network, minion, params } => {
                let start = Instant::now();
                let outcome = self.dispatcher.send_named(&network, &name, params, &minion).await;
                let response_time = start.elapsed().as_millis() as u64;

                let (success, result, error) = match outcome {
                    Ok(response) => (true, Some(response), None),
                    Err(e) => {
                        warn!(network = %network.name, command = %name, error = %e, "command failed");
                        (false, None, Some(e.to_string()))
                    }
                };
                emit(
                    out,
                    Outbound::Command(CommandResult {
                        kind: "command_result",
                        id,
                        command: name,
                        success,
                        response_time,
                        result,
                        error,
                    }),
                );
            }
        }
    }
}
