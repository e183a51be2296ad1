//! Child process transport
//!
//! Spawns the endpoint and exchanges newline-delimited JSON over its stdin/stdout.

use super::Transport;
use crate::sink::MessageSink;
use async_trait::async_trait;
use inspector_core::{InspectorError, Result};
use std::process::Stdio;
use super::tcp::MAX_FRAME_LEN;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Child process configuration
#[derive(Debug, Clone)]
pub struct ChildProcessConfig {
    /// Program to spawn
    pub program: String,
    /// Program arguments
    pub args: Vec<String>,
    /// Pass the child's stderr through to ours
    pub inherit_stderr: bool,
}

impl ChildProcessConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for ChildProcessConfig {
    fn default() -> Self {
        Self {
            program: String::new(),
            args: Vec::new(),
            inherit_stderr: true,
        }
    }
}

/// Transport to an endpoint running as a child process
pub struct ChildProcessTransport {
    config: ChildProcessConfig,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    reader_handle: Option<JoinHandle<()>>,
}

impl ChildProcessTransport {
    pub fn new(config: ChildProcessConfig) -> Self {
        Self {
            config,
            child: None,
            stdin: None,
            reader_handle: None,
        }
    }
}

/// Read newline-delimited messages until EOF, then fail whatever is still waiting.
/// A line longer than `max_len` bytes ends the session.
pub(crate) async fn line_reader_task<R: AsyncRead + Unpin>(
    reader: R,
    sink: MessageSink,
    max_len: usize,
) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        // Never buffer more than one byte past the limit
        let limit = max_len as u64 + 1;
        match (&mut reader).take(limit).read_until(b'\n', &mut buf).await {
            Ok(0) => {
                info!("Endpoint closed its output (EOF)");
                sink.fail_all("Connection closed");
                break;
            }
            Ok(_) => {
                if buf.last() != Some(&b'\n') && buf.len() > max_len {
                    error!("Message too large: more than {} bytes", max_len);
                    sink.fail_all(&format!("Message too large: more than {} bytes", max_len));
                    break;
                }
                let line = match std::str::from_utf8(&buf) {
                    Ok(line) => line,
                    Err(e) => {
                        error!("Endpoint sent invalid UTF-8: {}", e);
                        sink.fail_all(&format!("Invalid UTF-8 from endpoint: {}", e));
                        break;
                    }
                };
                // Skip blank lines
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    sink.deliver(trimmed);
                }
            }
            Err(e) => {
                error!("Reader task failed: {}", e);
                sink.fail_all(&format!("Connection lost: {}", e));
                break;
            }
        }
    }
}

#[async_trait]
impl Transport for ChildProcessTransport {
    async fn connect(&mut self, sink: MessageSink) -> Result<()> {
        if self.child.is_some() {
            debug!("Child process already running");
            return Ok(());
        }

        info!(
            "Spawning endpoint: {} {}",
            self.config.program,
            self.config.args.join(" ")
        );
        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(if self.config.inherit_stderr {
                Stdio::inherit()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| InspectorError::TransportFault(format!("Failed to spawn process: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| InspectorError::TransportFault("No stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| InspectorError::TransportFault("No stdout".into()))?;

        // Spawn reader task for responses and notifications
        self.reader_handle = Some(tokio::spawn(line_reader_task(stdout, sink, MAX_FRAME_LEN)));
        self.stdin = Some(stdin);
        self.child = Some(child);
        Ok(())
    }

    async fn send(&mut self, message: &str) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| InspectorError::TransportFault("Not connected".into()))?;

        // Write message followed by newline
        stdin
            .write_all(message.as_bytes())
            .await
            .map_err(|e| InspectorError::TransportFault(format!("Write failed: {}", e)))?;
        stdin
            .write_all(b"\n")
            .await
            .map_err(|e| InspectorError::TransportFault(format!("Write newline failed: {}", e)))?;
        // Flush to ensure the endpoint sees it
        stdin
            .flush()
            .await
            .map_err(|e| InspectorError::TransportFault(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<bool> {
        let Some(mut child) = self.child.take() else {
            return Ok(false);
        };

        // Closing stdin signals EOF to the endpoint
        drop(self.stdin.take());
        if let Err(e) = child.kill().await {
            debug!("Child already exited: {}", e);
        }
        if let Some(handle) = self.reader_handle.take() {
            handle.abort();
        }
        info!("Endpoint process stopped");
        Ok(true)
    }
}
