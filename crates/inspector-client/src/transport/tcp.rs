//! TCP transport
//!
//! Each message is framed as a 4-byte little-endian length prefix followed by
//! the JSON payload.

use super::Transport;
use crate::sink::MessageSink;
use async_trait::async_trait;
use inspector_core::{InspectorError, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Largest accepted frame (64MB)
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Read one length-prefixed frame
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>> {
    // Read 4-byte length prefix (little-endian)
    let mut len_bytes = [0u8; 4];
    reader
        .read_exact(&mut len_bytes)
        .await
        .map_err(|e| InspectorError::TransportFault(format!("TCP read length failed: {}", e)))?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    // Sanity check on message size (max 64MB)
    if len > MAX_FRAME_LEN {
        return Err(InspectorError::TransportFault(format!(
            "Message too large: {} bytes",
            len
        )));
    }

    // Read message body
    let mut data = vec![0u8; len];
    reader
        .read_exact(&mut data)
        .await
        .map_err(|e| InspectorError::TransportFault(format!("TCP read data failed: {}", e)))?;
    Ok(data)
}

/// Write one length-prefixed frame
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> Result<()> {
    if data.len() > MAX_FRAME_LEN {
        return Err(InspectorError::TransportFault(format!(
            "Message too large: {} bytes",
            data.len()
        )));
    }

    // Write 4-byte length prefix
    let len = (data.len() as u32).to_le_bytes();
    writer
        .write_all(&len)
        .await
        .map_err(|e| InspectorError::TransportFault(format!("TCP write length failed: {}", e)))?;
    // Write message body
    writer
        .write_all(data)
        .await
        .map_err(|e| InspectorError::TransportFault(format!("TCP write data failed: {}", e)))?;
    // Flush to ensure data is sent
    writer
        .flush()
        .await
        .map_err(|e| InspectorError::TransportFault(format!("TCP flush failed: {}", e)))?;
    Ok(())
}

/// Deliver frames to the sink until the connection drops
async fn frame_reader_task<R: AsyncRead + Unpin>(mut reader: R, sink: MessageSink) {
    loop {
        match read_frame(&mut reader).await {
            Ok(data) => match std::str::from_utf8(&data) {
                Ok(text) => sink.deliver(text),
                Err(e) => {
                    error!("Frame is not UTF-8: {}", e);
                    sink.fail_all("Received a frame that is not UTF-8");
                }
            },
            Err(e) => {
                error!("Reader task failed: {}", e);
                sink.fail_all("Connection lost");
                break;
            }
        }
    }
}

/// Transport to an endpoint listening on TCP
pub struct TcpTransport {
    address: String,
    writer: Option<OwnedWriteHalf>,
    reader_handle: Option<JoinHandle<()>>,
}

impl TcpTransport {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            writer: None,
            reader_handle: None,
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self, sink: MessageSink) -> Result<()> {
        if self.writer.is_some() {
            return Ok(());
        }

        info!("Connecting to endpoint at {}", self.address);
        let stream = TcpStream::connect(&self.address)
            .await
            .map_err(|e| InspectorError::TransportFault(format!("Failed to connect: {}", e)))?;
        let (read_half, write_half) = stream.into_split();

        // Spawn reader task for incoming frames
        self.reader_handle = Some(tokio::spawn(frame_reader_task(read_half, sink)));
        self.writer = Some(write_half);
        Ok(())
    }

    async fn send(&mut self, message: &str) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| InspectorError::TransportFault("Not connected".into()))?;
        write_frame(writer, message.as_bytes()).await
    }

    async fn disconnect(&mut self) -> Result<bool> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(false);
        };
        // Best effort; the peer may already be gone
        let _ = writer.shutdown().await;
        if let Some(handle) = self.reader_handle.take() {
            handle.abort();
        }
        info!("Disconnected from {}", self.address);
        Ok(true)
    }
}
