//! Engine subprocess plumbing (async I/O)
//!
//! The process is driven by two tasks: a writer draining a command channel
//! into stdin, and a reader forwarding stdout lines to the main loop.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command as ProcessCommand};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::DuelError;
use crate::protocol::Command;
use crate::session::EngineTransport;

/// How long to wait for the engine to exit after `quit` before killing it.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Sends commands to the writer task. Never blocks.
#[derive(Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl EngineTransport for ChannelTransport {
    fn send(&mut self, command: &Command) -> Result<(), DuelError> {
        self.tx
            .send(command.to_string())
            .map_err(|_| DuelError::EngineClosed)
    }
}

/// Handle to the running engine process and its I/O tasks.
pub struct EngineProcess {
    child: Child,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl EngineProcess {
    /// Wait briefly for a clean exit, then kill.
    pub async fn shutdown(mut self) {
        match tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "Engine exited"),
            Ok(Err(e)) => warn!(error = %e, "Failed to wait for engine"),
            Err(_) => {
                warn!("Engine did not exit, killing");
                if let Err(e) = self.child.kill().await {
                    warn!(error = %e, "Failed to kill engine");
                }
            }
        }
        self.writer.abort();
        self.reader.abort();
    }
}

/// Spawn the engine at `path`.
///
/// Returns the outbound transport, the stream of stdout lines (closed when the
/// engine exits), and the process handle.
pub fn spawn_engine(
    path: &str,
) -> Result<(ChannelTransport, mpsc::UnboundedReceiver<String>, EngineProcess), DuelError> {
    let mut child = ProcessCommand::new(path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| DuelError::EngineSpawn(format!("{path}: {e}")))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| DuelError::EngineSpawn("stdin not captured".to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| DuelError::EngineSpawn("stdout not captured".to_string()))?;

    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<String>();
    let (line_tx, line_rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            debug!(cmd = cmd.as_str(), "SF <");
            let written = async {
                stdin.write_all(cmd.as_bytes()).await?;
                stdin.write_all(b"\n").await?;
                stdin.flush().await
            };
            if let Err(e) = written.await {
                warn!(error = %e, "Failed to write to engine");
                break;
            }
        }
    });

    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim().to_string();
                    debug!(line = line.as_str(), "SF >");
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read from engine");
                    break;
                }
            }
        }
    });

    Ok((
        ChannelTransport::new(cmd_tx),
        line_rx,
        EngineProcess {
            child,
            writer,
            reader,
        },
    ))
}
