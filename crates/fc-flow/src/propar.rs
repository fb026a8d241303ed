//! Propar messages in the instruments' ASCII framing.
//!
//! A message is `:` followed by hex pairs and `\r\n`. The first pair is the
//! number of bytes that follow it, then the node address and the command.

use crate::error::{FlowError, FlowResult};

pub const STATUS: u8 = 0x00;
pub const SEND_WITH_STATUS: u8 = 0x01;
pub const SEND_PARAMETER: u8 = 0x02;
pub const REQUEST_PARAMETER: u8 = 0x04;

/// Set on a process or parameter byte when another one follows it.
const CHAIN: u8 = 0x80;
const NUMBER_MASK: u8 = 0x1F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Int8,
    Int16,
    Int32,
    Float,
}

impl ParamType {
    fn bits(self) -> u8 {
        match self {
            ParamType::Int8 => 0x00,
            ParamType::Int16 => 0x20,
            ParamType::Int32 | ParamType::Float => 0x40,
        }
    }

    fn width(self) -> usize {
        match self {
            ParamType::Int8 => 1,
            ParamType::Int16 => 2,
            ParamType::Int32 | ParamType::Float => 4,
        }
    }
}

/// One instrument parameter, addressed by process and parameter number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    pub process: u8,
    pub number: u8,
    pub kind: ParamType,
}

impl Parameter {
    pub const fn new(process: u8, number: u8, kind: ParamType) -> Self {
        Self {
            process,
            number,
            kind,
        }
    }

    fn check(&self) -> FlowResult<()> {
        if self.process & CHAIN != 0 || self.number > NUMBER_MASK {
            return Err(FlowError::frame(format!(
                "parameter {}/{} cannot be addressed",
                self.process, self.number
            )));
        }
        Ok(())
    }

    fn index_byte(&self) -> u8 {
        self.kind.bits() | self.number
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int8(u8),
    Int16(u16),
    Int32(u32),
    Float(f32),
}

impl Value {
    pub fn kind(&self) -> ParamType {
        match self {
            Value::Int8(_) => ParamType::Int8,
            Value::Int16(_) => ParamType::Int16,
            Value::Int32(_) => ParamType::Int32,
            Value::Float(_) => ParamType::Float,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::Int8(v) => v as f64,
            Value::Int16(v) => v as f64,
            Value::Int32(v) => v as f64,
            Value::Float(v) => v as f64,
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match *self {
            Value::Int8(v) => out.push(v),
            Value::Int16(v) => out.extend_from_slice(&v.to_be_bytes()),
            Value::Int32(v) => out.extend_from_slice(&v.to_be_bytes()),
            Value::Float(v) => out.extend_from_slice(&v.to_be_bytes()),
        }
    }

    fn decode(kind: ParamType, data: &[u8]) -> FlowResult<Self> {
        if data.len() != kind.width() {
            return Err(FlowError::frame(format!(
                "{kind:?} value with {} bytes",
                data.len()
            )));
        }
        Ok(match kind {
            ParamType::Int8 => Value::Int8(data[0]),
            ParamType::Int16 => Value::Int16(u16::from_be_bytes([data[0], data[1]])),
            ParamType::Int32 => {
                Value::Int32(u32::from_be_bytes([data[0], data[1], data[2], data[3]]))
            }
            ParamType::Float => {
                Value::Float(f32::from_be_bytes([data[0], data[1], data[2], data[3]]))
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Read { node: u8, parameter: Parameter },
    /// Chained write; consecutive values on the same process share it.
    Write {
        node: u8,
        values: Vec<(Parameter, Value)>,
    },
}

impl Request {
    pub fn node(&self) -> u8 {
        match self {
            Request::Read { node, .. } | Request::Write { node, .. } => *node,
        }
    }

    /// Message bytes, length prefix included.
    pub fn encode(&self) -> FlowResult<Vec<u8>> {
        let mut body = vec![self.node()];
        match self {
            Request::Read { parameter, .. } => {
                parameter.check()?;
                body.push(REQUEST_PARAMETER);
                for _ in 0..2 {
                    body.push(parameter.process);
                    body.push(parameter.index_byte());
                }
            }
            Request::Write { values, .. } => {
                if values.is_empty() {
                    return Err(FlowError::frame("write without values"));
                }
                body.push(SEND_WITH_STATUS);
                encode_chain(values, &mut body)?;
            }
        }
        let len = u8::try_from(body.len())
            .map_err(|_| FlowError::frame(format!("{} byte message", body.len())))?;
        let mut msg = Vec::with_capacity(body.len() + 1);
        msg.push(len);
        msg.extend_from_slice(&body);
        Ok(msg)
    }
}

fn encode_chain(values: &[(Parameter, Value)], out: &mut Vec<u8>) -> FlowResult<()> {
    let mut rest = values;
    while let Some((first, _)) = rest.first() {
        let process = first.process;
        let group = rest
            .iter()
            .take_while(|(p, _)| p.process == process)
            .count();
        let (head, tail) = rest.split_at(group);
        out.push(if tail.is_empty() { process } else { process | CHAIN });
        for (i, (parameter, value)) in head.iter().enumerate() {
            parameter.check()?;
            if value.kind() != parameter.kind {
                return Err(FlowError::frame(format!(
                    "{:?} value for {:?} parameter {}/{}",
                    value.kind(),
                    parameter.kind,
                    parameter.process,
                    parameter.number
                )));
            }
            let last = i + 1 == head.len();
            out.push(if last {
                parameter.index_byte()
            } else {
                parameter.index_byte() | CHAIN
            });
            value.encode(out);
        }
        rest = tail;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reply {
    Value(Value),
    Accepted,
}

/// Decode a reply message against the request that produced it.
pub fn decode_reply(request: &Request, msg: &[u8]) -> FlowResult<Reply> {
    let (&len, body) = msg
        .split_first()
        .ok_or_else(|| FlowError::frame("empty reply"))?;
    if len as usize != body.len() {
        return Err(FlowError::frame(format!(
            "length byte {len} with {} bytes following",
            body.len()
        )));
    }
    let [node, command, data @ ..] = body else {
        return Err(FlowError::frame("reply without node and command"));
    };
    if *node != request.node() {
        return Err(FlowError::frame(format!(
            "reply from node {node}, expected {}",
            request.node()
        )));
    }

    match (*command, request) {
        (STATUS, _) => {
            let [code, index, ..] = *data else {
                return Err(FlowError::frame("status without code"));
            };
            if code != 0 {
                return Err(FlowError::Status {
                    node: *node,
                    code,
                    index,
                });
            }
            match request {
                Request::Write { .. } => Ok(Reply::Accepted),
                Request::Read { .. } => Err(FlowError::frame("status reply to a read")),
            }
        }
        (SEND_PARAMETER, Request::Read { parameter, .. }) => {
            let [process, index, value @ ..] = data else {
                return Err(FlowError::frame("parameter reply without address"));
            };
            if *process != parameter.process || index & NUMBER_MASK != parameter.number {
                return Err(FlowError::frame(format!(
                    "reply for {process}/{}, expected {}/{}",
                    index & NUMBER_MASK,
                    parameter.process,
                    parameter.number
                )));
            }
            Ok(Reply::Value(Value::decode(parameter.kind, value)?))
        }
        (other, _) => Err(FlowError::frame(format!(
            "command {other:#04x} does not answer this request"
        ))),
    }
}

/// `:`, upper-case hex pairs, `\r\n`.
pub fn to_ascii(msg: &[u8]) -> String {
    let mut line = String::with_capacity(msg.len() * 2 + 3);
    line.push(':');
    for b in msg {
        line.push_str(&format!("{b:02X}"));
    }
    line.push_str("\r\n");
    line
}

pub fn from_ascii(line: &str) -> FlowResult<Vec<u8>> {
    let hex = line
        .trim()
        .strip_prefix(':')
        .ok_or_else(|| FlowError::frame(format!("{line:?} does not start with ':'")))?;
    if hex.len() % 2 != 0 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(FlowError::frame(format!("{hex:?} is not hex pairs")));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| FlowError::frame(format!("{:?}: {e}", &hex[i..i + 2])))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SETPOINT: Parameter = Parameter::new(1, 1, ParamType::Int16);
    const FLUID: Parameter = Parameter::new(1, 16, ParamType::Int8);
    const MEASURE: Parameter = Parameter::new(33, 0, ParamType::Float);

    #[test]
    fn read_request_names_the_parameter_twice() {
        let req = Request::Read {
            node: 3,
            parameter: SETPOINT,
        };
        assert_eq!(to_ascii(&req.encode().unwrap()), ":06030401210121\r\n");
    }

    #[test]
    fn chained_write_shares_the_process() {
        let req = Request::Write {
            node: 3,
            values: vec![(FLUID, Value::Int8(2)), (SETPOINT, Value::Int16(16000))],
        };
        assert_eq!(
            req.encode().unwrap(),
            vec![0x08, 0x03, 0x01, 0x01, 0x90, 0x02, 0x21, 0x3E, 0x80]
        );
    }

    #[test]
    fn write_across_processes_chains_the_process_byte() {
        let req = Request::Write {
            node: 5,
            values: vec![(SETPOINT, Value::Int16(1)), (MEASURE, Value::Float(0.0))],
        };
        let msg = req.encode().unwrap();
        assert_eq!(&msg[3..6], &[0x81, 0x21, 0x00]);
        assert_eq!(&msg[7..9], &[33, 0x40]);
    }

    #[test]
    fn mismatched_value_type_is_rejected() {
        let req = Request::Write {
            node: 3,
            values: vec![(SETPOINT, Value::Float(1.0))],
        };
        assert!(matches!(req.encode(), Err(FlowError::Frame { .. })));
    }

    #[test]
    fn float_reply_decodes() {
        let req = Request::Read {
            node: 14,
            parameter: MEASURE,
        };
        let mut msg = vec![0x08, 14, SEND_PARAMETER, 33, 0x40];
        msg.extend_from_slice(&14.7f32.to_be_bytes());
        assert_eq!(
            decode_reply(&req, &msg).unwrap(),
            Reply::Value(Value::Float(14.7))
        );
    }

    #[test]
    fn status_replies() {
        let write = Request::Write {
            node: 3,
            values: vec![(SETPOINT, Value::Int16(0))],
        };
        assert_eq!(
            decode_reply(&write, &[0x04, 0x03, STATUS, 0x00, 0x05]).unwrap(),
            Reply::Accepted
        );
        assert!(matches!(
            decode_reply(&write, &[0x04, 0x03, STATUS, 0x03, 0x04]),
            Err(FlowError::Status {
                node: 3,
                code: 3,
                index: 4
            })
        ));
        assert!(decode_reply(&write, &[0x04, 0x07, STATUS, 0x00, 0x05]).is_err());
    }

    #[test]
    fn ascii_framing_is_checked() {
        assert_eq!(from_ascii(":0403000005\r\n").unwrap(), vec![4, 3, 0, 0, 5]);
        assert!(from_ascii("0403000005").is_err());
        assert!(from_ascii(":04030").is_err());
        assert!(from_ascii(":04ZZ").is_err());
    }

    proptest! {
        #[test]
        fn length_byte_counts_what_follows(node in 1u8..=125, raw in any::<u16>(), cal in any::<u8>()) {
            let req = Request::Write {
                node,
                values: vec![(FLUID, Value::Int8(cal)), (SETPOINT, Value::Int16(raw))],
            };
            let msg = req.encode().unwrap();
            prop_assert_eq!(msg[0] as usize, msg.len() - 1);
            prop_assert_eq!(from_ascii(&to_ascii(&msg)).unwrap(), msg);
        }
    }
}
