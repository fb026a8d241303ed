//! Byte links to the valve actuator: direct serial or a TCP serial server.

use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use fc_core::{FcError, FcResult};
use tracing::{debug, warn};

use crate::protocol::TERMINATOR;

/// Line-oriented request/response channel.
pub trait Link {
    /// Send one command; the terminator is appended here.
    fn send(&mut self, command: &str) -> FcResult<()>;

    /// Read one reply line, trimmed. An empty string means no reply arrived.
    fn receive(&mut self) -> FcResult<String>;
}

impl<L: Link + ?Sized> Link for &mut L {
    fn send(&mut self, command: &str) -> FcResult<()> {
        (**self).send(command)
    }

    fn receive(&mut self) -> FcResult<String> {
        (**self).receive()
    }
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn send(&mut self, command: &str) -> FcResult<()> {
        (**self).send(command)
    }

    fn receive(&mut self) -> FcResult<String> {
        (**self).receive()
    }
}

const TCP_WRITE_TIMEOUT: Duration = Duration::from_secs(10);
const TCP_READ_TIMEOUT: Duration = Duration::from_secs(1);
const TCP_READ_BUF: usize = 4096;

/// TCP link to a serial device server.
///
/// Connects lazily on the first send and reconnects after a failed write.
#[derive(Debug)]
pub struct TcpLink {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
}

impl TcpLink {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            stream: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn connected(&mut self) -> FcResult<&mut TcpStream> {
        if self.stream.is_none() {
            debug!(host = %self.host, port = self.port, "connecting valve link");
            let stream = TcpStream::connect((self.host.as_str(), self.port)).map_err(|e| {
                FcError::Transport {
                    what: format!("connect {}:{}: {e}", self.host, self.port),
                }
            })?;
            stream.set_write_timeout(Some(TCP_WRITE_TIMEOUT))?;
            stream.set_read_timeout(Some(TCP_READ_TIMEOUT))?;
            self.stream = Some(stream);
        }
        self.stream.as_mut().ok_or_else(|| FcError::Transport {
            what: "valve link not connected".to_string(),
        })
    }
}

impl Link for TcpLink {
    fn send(&mut self, command: &str) -> FcResult<()> {
        let line = format!("{command}{TERMINATOR}");
        let result = self.connected()?.write_all(line.as_bytes());
        if let Err(e) = result {
            warn!(command, error = %e, "valve link write failed, dropping connection");
            self.stream = None;
            return Err(FcError::Transport {
                what: format!("send {command:?}: {e}"),
            });
        }
        debug!(command, "sent");
        Ok(())
    }

    fn receive(&mut self) -> FcResult<String> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(String::new());
        };
        let mut buf = [0u8; TCP_READ_BUF];
        match stream.read(&mut buf) {
            Ok(n) => {
                let reply = String::from_utf8_lossy(&buf[..n]).trim().to_string();
                debug!(reply, "received");
                Ok(reply)
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Ok(String::new())
            }
            Err(e) => {
                self.stream = None;
                Err(FcError::Transport {
                    what: format!("receive: {e}"),
                })
            }
        }
    }
}

pub const SERIAL_BAUD: u32 = 9600;
const SERIAL_TIMEOUT: Duration = Duration::from_millis(100);

/// Direct serial link (9600 8N1).
pub struct SerialLink {
    path: String,
    port: Box<dyn serialport::SerialPort>,
}

impl SerialLink {
    pub fn open(path: &str) -> FcResult<Self> {
        let port = serialport::new(path, SERIAL_BAUD)
            .timeout(SERIAL_TIMEOUT)
            .open()
            .map_err(|e| FcError::Transport {
                what: format!("open {path}: {e}"),
            })?;
        debug!(path, baud = SERIAL_BAUD, "opened valve serial port");
        Ok(Self {
            path: path.to_string(),
            port,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink").field("path", &self.path).finish()
    }
}

impl Link for SerialLink {
    fn send(&mut self, command: &str) -> FcResult<()> {
        let line = format!("{command}{TERMINATOR}");
        self.port.write_all(line.as_bytes()).map_err(|e| FcError::Transport {
            what: format!("send {command:?} on {}: {e}", self.path),
        })?;
        debug!(command, "sent");
        Ok(())
    }

    /// Reads until newline or timeout, like a serial `readline`.
    fn receive(&mut self) -> FcResult<String> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) => {
                    return Err(FcError::Transport {
                        what: format!("receive on {}: {e}", self.path),
                    });
                }
            }
        }
        let reply = String::from_utf8_lossy(&line).trim().to_string();
        debug!(reply, "received");
        Ok(reply)
    }
}
