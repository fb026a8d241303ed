//! Modbus masters over TCP and serial RTU.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use tracing::debug;

use crate::error::{ThermalError, ThermalResult};
use crate::frame::{self, MBAP_HEADER_LEN, MbapHeader};
use crate::pdu::{Request, Response, decode_response};

/// A Modbus master able to run one request/response transaction.
pub trait ModbusClient {
    fn transact(&mut self, request: &Request) -> ThermalResult<Response>;

    fn read_holding_registers(&mut self, address: u16, count: u16) -> ThermalResult<Vec<u16>> {
        match self.transact(&Request::ReadHoldingRegisters { address, count })? {
            Response::Registers(regs) => Ok(regs),
            other => Err(ThermalError::frame(format!("unexpected response {other:?}"))),
        }
    }

    fn read_holding_register(&mut self, address: u16) -> ThermalResult<u16> {
        self.read_holding_registers(address, 1)?
            .first()
            .copied()
            .ok_or_else(|| ThermalError::frame("empty register read"))
    }

    fn write_single_register(&mut self, address: u16, value: u16) -> ThermalResult<()> {
        self.transact(&Request::WriteSingleRegister { address, value })
            .map(|_| ())
    }

    fn write_multiple_registers(&mut self, address: u16, values: &[u16]) -> ThermalResult<()> {
        self.transact(&Request::WriteMultipleRegisters {
            address,
            values: values.to_vec(),
        })
        .map(|_| ())
    }
}

impl<C: ModbusClient + ?Sized> ModbusClient for Box<C> {
    fn transact(&mut self, request: &Request) -> ThermalResult<Response> {
        (**self).transact(request)
    }
}

pub const DEFAULT_TCP_PORT: u16 = 502;
pub const DEFAULT_UNIT_ID: u8 = 1;
const TCP_TIMEOUT: Duration = Duration::from_secs(30);

/// Modbus TCP master that opens a fresh connection for every transaction.
#[derive(Debug, Clone)]
pub struct ModbusTcpClient {
    host: String,
    port: u16,
    unit_id: u8,
    timeout: Duration,
    next_transaction: u16,
}

impl ModbusTcpClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            unit_id: DEFAULT_UNIT_ID,
            timeout: TCP_TIMEOUT,
            next_transaction: 1,
        }
    }

    fn connect(&self) -> ThermalResult<TcpStream> {
        let stream = TcpStream::connect((self.host.as_str(), self.port)).map_err(|e| {
            ThermalError::Transport {
                what: format!("connect {}:{}: {e}", self.host, self.port),
            }
        })?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        Ok(stream)
    }
}

impl ModbusClient for ModbusTcpClient {
    fn transact(&mut self, request: &Request) -> ThermalResult<Response> {
        let transaction_id = self.next_transaction;
        self.next_transaction = self.next_transaction.wrapping_add(1);

        let pdu = request.encode()?;
        let out = frame::encode_tcp(transaction_id, self.unit_id, &pdu)?;
        let mut stream = self.connect()?;
        stream.write_all(&out)?;

        let mut head = [0u8; MBAP_HEADER_LEN];
        stream.read_exact(&mut head)?;
        let header = MbapHeader::decode(&head)?;
        if header.transaction_id != transaction_id {
            return Err(ThermalError::frame(format!(
                "transaction {} answered as {}",
                transaction_id, header.transaction_id
            )));
        }
        let mut body = vec![0u8; header.pdu_len()];
        stream.read_exact(&mut body)?;
        debug!(transaction_id, ?request, "modbus tcp transaction");
        decode_response(request, &body)
    }
}

pub const RTU_BAUD: u32 = 19_200;
const RTU_TIMEOUT: Duration = Duration::from_millis(50);

/// Modbus RTU master on a serial line (19200 8N1).
pub struct ModbusRtuClient {
    path: String,
    slave: u8,
    port: Box<dyn serialport::SerialPort>,
}

impl ModbusRtuClient {
    pub fn open(path: &str, slave: u8) -> ThermalResult<Self> {
        let port = serialport::new(path, RTU_BAUD)
            .timeout(RTU_TIMEOUT)
            .open()
            .map_err(|e| ThermalError::Transport {
                what: format!("open {path}: {e}"),
            })?;
        debug!(path, slave, baud = RTU_BAUD, "opened modbus rtu port");
        Ok(Self {
            path: path.to_string(),
            slave,
            port,
        })
    }
}

impl std::fmt::Debug for ModbusRtuClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModbusRtuClient")
            .field("path", &self.path)
            .field("slave", &self.slave)
            .finish()
    }
}

impl ModbusClient for ModbusRtuClient {
    fn transact(&mut self, request: &Request) -> ThermalResult<Response> {
        let out = frame::encode_rtu(self.slave, &request.encode()?);
        self.port.clear(serialport::ClearBuffer::Input).map_err(|e| {
            ThermalError::Transport {
                what: format!("clear {}: {e}", self.path),
            }
        })?;
        self.port.write_all(&out)?;

        let mut head = [0u8; 3];
        self.port.read_exact(&mut head)?;
        let mut rest = vec![0u8; frame::rtu_remaining_len(head)];
        self.port.read_exact(&mut rest)?;
        let mut reply = head.to_vec();
        reply.extend_from_slice(&rest);

        let (slave, pdu) = frame::decode_rtu(&reply)?;
        if slave != self.slave {
            return Err(ThermalError::frame(format!(
                "reply from slave {slave}, expected {}",
                self.slave
            )));
        }
        debug!(slave, ?request, "modbus rtu transaction");
        decode_response(request, pdu)
    }
}
