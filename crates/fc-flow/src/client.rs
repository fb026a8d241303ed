//! Propar masters over a TCP serial server and a direct serial line.

use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use tracing::debug;

use crate::error::{FlowError, FlowResult};
use crate::propar::{Parameter, Reply, Request, Value, decode_reply, from_ascii, to_ascii};

/// A propar master able to run one request/reply exchange.
pub trait ProparClient {
    fn transact(&mut self, request: &Request) -> FlowResult<Reply>;

    fn read_parameter(&mut self, node: u8, parameter: Parameter) -> FlowResult<Value> {
        match self.transact(&Request::Read { node, parameter })? {
            Reply::Value(value) => Ok(value),
            Reply::Accepted => Err(FlowError::frame("read answered with a status")),
        }
    }

    fn write_parameters(&mut self, node: u8, values: Vec<(Parameter, Value)>) -> FlowResult<()> {
        self.transact(&Request::Write { node, values }).map(|_| ())
    }
}

impl<C: ProparClient + ?Sized> ProparClient for Box<C> {
    fn transact(&mut self, request: &Request) -> FlowResult<Reply> {
        (**self).transact(request)
    }
}

fn exchange<S: Read + Write>(stream: &mut S, request: &Request) -> FlowResult<Reply> {
    let line = to_ascii(&request.encode()?);
    stream.write_all(line.as_bytes())?;
    let mut reply = String::new();
    BufReader::new(stream).read_line(&mut reply).map_err(|e| match e.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => FlowError::Transport {
            what: format!("no reply from node {}", request.node()),
        },
        _ => FlowError::Io(e),
    })?;
    if reply.is_empty() {
        return Err(FlowError::Transport {
            what: format!("node {} closed without reply", request.node()),
        });
    }
    debug!(request = line.trim(), reply = reply.trim(), "propar exchange");
    decode_reply(request, &from_ascii(&reply)?)
}

const TCP_TIMEOUT: Duration = Duration::from_secs(1);

/// Propar over a TCP serial server, one connection per exchange.
#[derive(Debug, Clone)]
pub struct ProparTcpClient {
    host: String,
    port: u16,
}

impl ProparTcpClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl ProparClient for ProparTcpClient {
    fn transact(&mut self, request: &Request) -> FlowResult<Reply> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port)).map_err(|e| {
            FlowError::Transport {
                what: format!("connect {}:{}: {e}", self.host, self.port),
            }
        })?;
        stream.set_read_timeout(Some(TCP_TIMEOUT))?;
        stream.set_write_timeout(Some(TCP_TIMEOUT))?;
        exchange(&mut stream, request)
    }
}

pub const SERIAL_BAUD: u32 = 38_400;
const SERIAL_TIMEOUT: Duration = Duration::from_millis(500);

/// Propar on a direct serial line (38400 8N1).
pub struct ProparSerialClient {
    path: String,
    port: Box<dyn serialport::SerialPort>,
}

impl ProparSerialClient {
    pub fn open(path: &str) -> FlowResult<Self> {
        let port = serialport::new(path, SERIAL_BAUD)
            .timeout(SERIAL_TIMEOUT)
            .open()
            .map_err(|e| FlowError::Transport {
                what: format!("open {path}: {e}"),
            })?;
        debug!(path, baud = SERIAL_BAUD, "opened flow-controller serial port");
        Ok(Self {
            path: path.to_string(),
            port,
        })
    }
}

impl std::fmt::Debug for ProparSerialClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProparSerialClient")
            .field("path", &self.path)
            .finish()
    }
}

impl ProparClient for ProparSerialClient {
    fn transact(&mut self, request: &Request) -> FlowResult<Reply> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|e| FlowError::Transport {
                what: format!("clear {}: {e}", self.path),
            })?;
        exchange(&mut self.port, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propar::ParamType;
    use std::net::TcpListener;
    use std::thread;

    fn one_shot_server(reply: &'static str) -> (u16, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            reader.get_mut().write_all(reply.as_bytes()).unwrap();
            line
        });
        (port, handle)
    }

    #[test]
    fn tcp_reads_a_parameter() {
        let (port, server) = one_shot_server(":06030201213E80\r\n");
        let mut client = ProparTcpClient::new("127.0.0.1", port);
        let value = client
            .read_parameter(3, Parameter::new(1, 1, ParamType::Int16))
            .unwrap();
        assert_eq!(value, Value::Int16(16000));
        assert_eq!(server.join().unwrap(), ":06030401210121\r\n");
    }

    #[test]
    fn tcp_write_surfaces_instrument_status() {
        let (port, server) = one_shot_server(":0403000305\r\n");
        let mut client = ProparTcpClient::new("127.0.0.1", port);
        let err = client
            .write_parameters(
                3,
                vec![(Parameter::new(1, 1, ParamType::Int16), Value::Int16(100))],
            )
            .unwrap_err();
        assert!(matches!(err, FlowError::Status { node: 3, code: 3, .. }));
        assert_eq!(server.join().unwrap(), ":06030101210064\r\n");
    }

    #[test]
    fn tcp_connect_failure_is_transport() {
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let mut client = ProparTcpClient::new("127.0.0.1", port);
        assert!(matches!(
            client.read_parameter(3, Parameter::new(1, 1, ParamType::Int16)),
            Err(FlowError::Transport { .. })
        ));
    }
}
