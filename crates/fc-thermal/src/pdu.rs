//! Modbus protocol data units for the functions the controller needs.

use crate::error::{ThermalError, ThermalResult};

pub const READ_HOLDING_REGISTERS: u8 = 0x03;
pub const WRITE_SINGLE_REGISTER: u8 = 0x06;
pub const WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Bit set in the function code of an exception response.
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Upper bound on registers per read request.
pub const MAX_READ_REGISTERS: u16 = 125;
/// Upper bound on registers per multiple-write request.
pub const MAX_WRITE_REGISTERS: usize = 123;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ReadHoldingRegisters { address: u16, count: u16 },
    WriteSingleRegister { address: u16, value: u16 },
    WriteMultipleRegisters { address: u16, values: Vec<u16> },
}

impl Request {
    pub fn function(&self) -> u8 {
        match self {
            Request::ReadHoldingRegisters { .. } => READ_HOLDING_REGISTERS,
            Request::WriteSingleRegister { .. } => WRITE_SINGLE_REGISTER,
            Request::WriteMultipleRegisters { .. } => WRITE_MULTIPLE_REGISTERS,
        }
    }

    pub fn encode(&self) -> ThermalResult<Vec<u8>> {
        let (a, b) = match *self {
            Request::ReadHoldingRegisters { address, count } => {
                if count == 0 || count > MAX_READ_REGISTERS {
                    return Err(ThermalError::OutOfRange {
                        what: format!("register count {count}"),
                    });
                }
                (address, count)
            }
            Request::WriteSingleRegister { address, value } => (address, value),
            Request::WriteMultipleRegisters {
                address,
                ref values,
            } => {
                if values.is_empty() || values.len() > MAX_WRITE_REGISTERS {
                    return Err(ThermalError::OutOfRange {
                        what: format!("register count {}", values.len()),
                    });
                }
                (address, values.len() as u16)
            }
        };
        let mut pdu = Vec::with_capacity(6);
        pdu.push(self.function());
        pdu.extend_from_slice(&a.to_be_bytes());
        pdu.extend_from_slice(&b.to_be_bytes());
        if let Request::WriteMultipleRegisters { values, .. } = self {
            pdu.push((values.len() * 2) as u8);
            for v in values {
                pdu.extend_from_slice(&v.to_be_bytes());
            }
        }
        Ok(pdu)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Registers(Vec<u16>),
    Written { address: u16, value: u16 },
    WrittenMany { address: u16, count: u16 },
}

/// Decode a response PDU against the request that produced it.
pub fn decode_response(request: &Request, pdu: &[u8]) -> ThermalResult<Response> {
    let (&function, body) = pdu
        .split_first()
        .ok_or_else(|| ThermalError::frame("empty response PDU"))?;

    if function == request.function() | EXCEPTION_FLAG {
        let code = body
            .first()
            .copied()
            .ok_or_else(|| ThermalError::frame("exception response without code"))?;
        return Err(ThermalError::Exception {
            function: request.function(),
            code,
        });
    }
    if function != request.function() {
        return Err(ThermalError::frame(format!(
            "function {function:#04x} does not answer {:#04x}",
            request.function()
        )));
    }

    match request {
        &Request::ReadHoldingRegisters { count, .. } => {
            let (&byte_count, data) = body
                .split_first()
                .ok_or_else(|| ThermalError::frame("read response without byte count"))?;
            if byte_count as usize != 2 * count as usize || data.len() != byte_count as usize {
                return Err(ThermalError::frame(format!(
                    "expected {} data bytes, header says {byte_count}, got {}",
                    2 * count,
                    data.len()
                )));
            }
            let regs = data
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            Ok(Response::Registers(regs))
        }
        &Request::WriteSingleRegister { address, value } => {
            let (echoed_addr, echoed_value) = echo_pair(body)?;
            if echoed_addr != address || echoed_value != value {
                return Err(ThermalError::frame(format!(
                    "write echo {echoed_addr}={echoed_value} does not match {address}={value}"
                )));
            }
            Ok(Response::Written { address, value })
        }
        Request::WriteMultipleRegisters { address, values } => {
            let (echoed_addr, count) = echo_pair(body)?;
            if echoed_addr != *address || count as usize != values.len() {
                return Err(ThermalError::frame(format!(
                    "write echo {echoed_addr}x{count} does not match {address}x{}",
                    values.len()
                )));
            }
            Ok(Response::WrittenMany {
                address: *address,
                count,
            })
        }
    }
}

fn echo_pair(body: &[u8]) -> ThermalResult<(u16, u16)> {
    if body.len() != 4 {
        return Err(ThermalError::frame(format!(
            "write echo has {} bytes",
            body.len()
        )));
    }
    Ok((
        u16::from_be_bytes([body[0], body[1]]),
        u16::from_be_bytes([body[2], body[3]]),
    ))
}
