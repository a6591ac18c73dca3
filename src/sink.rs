//! Command sinks: where emitted guidance commands go.
//!
//! Sends are fire-and-forget. A failed send drops the connection; the next
//! send reconnects. No acknowledgement is awaited and nothing is retried.

use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MargaError, Result};
use crate::guidance::GuidanceCommand;

/// Destination for guidance commands.
pub trait CommandSink: Send {
    /// Deliver one command.
    fn send(&mut self, command: GuidanceCommand) -> Result<()>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// Frame format on the actuator link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkFormat {
    /// Single ASCII digit per command
    #[default]
    Digit,
    /// Big-endian u32 length prefix + JSON payload
    Json,
}

#[derive(Serialize)]
struct CommandFrame {
    code: u8,
    command: GuidanceCommand,
}

/// Encode a command into its frame bytes.
pub fn encode_command(command: GuidanceCommand, format: SinkFormat) -> Result<Vec<u8>> {
    match format {
        SinkFormat::Digit => Ok(vec![b'0' + command.code()]),
        SinkFormat::Json => {
            let payload = serde_json::to_vec(&CommandFrame {
                code: command.code(),
                command,
            })?;
            let len = u32::try_from(payload.len())
                .map_err(|_| MargaError::Protocol("Command frame too large".into()))?;

            let mut frame = Vec::with_capacity(4 + payload.len());
            frame.extend_from_slice(&len.to_be_bytes());
            frame.extend_from_slice(&payload);
            Ok(frame)
        }
    }
}

/// TCP sink with lazy connect.
pub struct TcpCommandSink {
    addr: SocketAddr,
    format: SinkFormat,
    timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpCommandSink {
    /// Create a sink for `addr`. No connection is made until the first send.
    pub fn new(addr: &str, format: SinkFormat, timeout: Duration) -> Result<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| MargaError::Config(format!("Invalid sink address '{}': {}", addr, e)))?;

        Ok(Self {
            addr,
            format,
            timeout,
            stream: None,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn connect(&mut self) -> Result<&mut TcpStream> {
        if self.stream.is_none() {
            let stream = TcpStream::connect_timeout(&self.addr, self.timeout).map_err(|e| {
                MargaError::SinkUnavailable(format!("connect to {} failed: {}", self.addr, e))
            })?;
            stream.set_write_timeout(Some(self.timeout))?;
            stream.set_nodelay(true)?;
            tracing::info!("Connected to command sink at {}", self.addr);
            self.stream = Some(stream);
        }

        self.stream
            .as_mut()
            .ok_or_else(|| MargaError::SinkUnavailable(format!("no connection to {}", self.addr)))
    }
}

impl CommandSink for TcpCommandSink {
    fn send(&mut self, command: GuidanceCommand) -> Result<()> {
        let frame = encode_command(command, self.format)?;
        let addr = self.addr;
        let stream = self.connect()?;

        if let Err(e) = stream.write_all(&frame).and_then(|_| stream.flush()) {
            self.stream = None;
            return Err(MargaError::SinkUnavailable(format!(
                "write to {} failed: {}",
                addr, e
            )));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("tcp://{} ({:?})", self.addr, self.format)
    }
}

/// Dry-run sink that only logs commands.
#[derive(Debug, Default)]
pub struct LogSink {
    sent: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl CommandSink for LogSink {
    fn send(&mut self, command: GuidanceCommand) -> Result<()> {
        self.sent += 1;
        tracing::info!("Command {} ({})", command.code(), command);
        Ok(())
    }

    fn describe(&self) -> String {
        "log (dry run)".to_string()
    }
}
