//! Application-layer framing: MBAP for Modbus TCP, address + CRC for RTU.

use crate::error::{ThermalError, ThermalResult};

pub const MBAP_HEADER_LEN: usize = 7;
const MODBUS_PROTOCOL_ID: u16 = 0;

/// Modbus TCP application header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    pub transaction_id: u16,
    pub protocol_id: u16,
    /// Byte count of everything after this field: unit id plus PDU.
    pub length: u16,
    pub unit_id: u8,
}

impl MbapHeader {
    pub fn for_pdu(transaction_id: u16, unit_id: u8, pdu_len: usize) -> ThermalResult<Self> {
        let length = u16::try_from(pdu_len + 1)
            .map_err(|_| ThermalError::frame(format!("PDU of {pdu_len} bytes is too long")))?;
        Ok(Self {
            transaction_id,
            protocol_id: MODBUS_PROTOCOL_ID,
            length,
            unit_id,
        })
    }

    pub fn encode(&self) -> [u8; MBAP_HEADER_LEN] {
        let t = self.transaction_id.to_be_bytes();
        let p = self.protocol_id.to_be_bytes();
        let l = self.length.to_be_bytes();
        [t[0], t[1], p[0], p[1], l[0], l[1], self.unit_id]
    }

    pub fn decode(bytes: &[u8]) -> ThermalResult<Self> {
        if bytes.len() < MBAP_HEADER_LEN {
            return Err(ThermalError::frame(format!(
                "MBAP header needs {MBAP_HEADER_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let header = Self {
            transaction_id: u16::from_be_bytes([bytes[0], bytes[1]]),
            protocol_id: u16::from_be_bytes([bytes[2], bytes[3]]),
            length: u16::from_be_bytes([bytes[4], bytes[5]]),
            unit_id: bytes[6],
        };
        if header.protocol_id != MODBUS_PROTOCOL_ID {
            return Err(ThermalError::frame(format!(
                "unexpected protocol id {}",
                header.protocol_id
            )));
        }
        if header.length < 2 {
            return Err(ThermalError::frame(format!(
                "MBAP length {} leaves no PDU",
                header.length
            )));
        }
        Ok(header)
    }

    /// Bytes still to read after the header.
    pub fn pdu_len(&self) -> usize {
        self.length as usize - 1
    }
}

/// Full Modbus TCP frame: header followed by PDU.
pub fn encode_tcp(transaction_id: u16, unit_id: u8, pdu: &[u8]) -> ThermalResult<Vec<u8>> {
    let header = MbapHeader::for_pdu(transaction_id, unit_id, pdu.len())?;
    let mut frame = Vec::with_capacity(MBAP_HEADER_LEN + pdu.len());
    frame.extend_from_slice(&header.encode());
    frame.extend_from_slice(pdu);
    Ok(frame)
}

/// CRC-16/MODBUS (reflected poly 0xA001, init 0xFFFF).
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// RTU frame: slave address, PDU, CRC low byte first.
pub fn encode_rtu(slave: u8, pdu: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(pdu.len() + 3);
    frame.push(slave);
    frame.extend_from_slice(pdu);
    frame.extend_from_slice(&crc16(&frame).to_le_bytes());
    frame
}

/// Verify the CRC and split an RTU frame into slave address and PDU.
pub fn decode_rtu(frame: &[u8]) -> ThermalResult<(u8, &[u8])> {
    if frame.len() < 4 {
        return Err(ThermalError::frame(format!(
            "RTU frame of {} bytes is too short",
            frame.len()
        )));
    }
    let (body, crc_bytes) = frame.split_at(frame.len() - 2);
    let received = u16::from_le_bytes([crc_bytes[0], crc_bytes[1]]);
    let computed = crc16(body);
    if computed != received {
        return Err(ThermalError::Crc { computed, received });
    }
    Ok((body[0], &body[1..]))
}

/// Length of the remainder of an RTU response, given its first three bytes
/// (slave, function, first body byte). Includes the CRC.
pub fn rtu_remaining_len(head: [u8; 3]) -> usize {
    let function = head[1];
    if function & crate::pdu::EXCEPTION_FLAG != 0 {
        2
    } else if function == crate::pdu::READ_HOLDING_REGISTERS {
        head[2] as usize + 2
    } else {
        // 0x06 and 0x10 echo: address(2) + value or count(2), one byte already read.
        3 + 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn crc_matches_reference_frame() {
        // 01 03 0000 0001 is answered on the wire with CRC bytes 84 0A.
        let frame = encode_rtu(1, &[0x03, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(frame[6..], [0x84, 0x0A]);
    }

    #[test]
    fn corrupted_rtu_frame_fails_crc() {
        let mut frame = encode_rtu(3, &[0x03, 0x02, 0x0F, 0xA0]);
        frame[3] ^= 0x01;
        assert!(matches!(decode_rtu(&frame), Err(ThermalError::Crc { .. })));
    }

    #[test]
    fn mbap_header_layout() {
        let frame = encode_tcp(0x0102, 1, &[0x03, 0x00, 0x02, 0x00, 0x01]).unwrap();
        assert_eq!(frame[..7], [0x01, 0x02, 0x00, 0x00, 0x00, 0x06, 0x01]);
        let header = MbapHeader::decode(&frame).unwrap();
        assert_eq!(header.transaction_id, 0x0102);
        assert_eq!(header.pdu_len(), 5);
    }

    #[test]
    fn foreign_protocol_id_rejected() {
        let bytes = [0, 1, 0, 7, 0, 3, 1];
        assert!(MbapHeader::decode(&bytes).is_err());
    }

    #[test]
    fn remaining_len_by_function() {
        assert_eq!(rtu_remaining_len([1, 0x03, 2]), 4);
        assert_eq!(rtu_remaining_len([1, 0x83, 2]), 2);
        assert_eq!(rtu_remaining_len([1, 0x06, 0]), 5);
    }

    proptest! {
        #[test]
        fn rtu_frames_verify(slave in any::<u8>(), pdu in prop::collection::vec(any::<u8>(), 1..64)) {
            let frame = encode_rtu(slave, &pdu);
            let (addr, body) = decode_rtu(&frame).unwrap();
            prop_assert_eq!(addr, slave);
            prop_assert_eq!(body, &pdu[..]);
        }
    }
}
